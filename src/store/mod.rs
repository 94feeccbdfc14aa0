//! Persistence of expense rows.
//!
//! A request opens one [`ExpenseSession`] through [`ExpenseStore::session`],
//! runs all of its reads and writes on it and drops it when done. Dropping
//! the session releases whatever the backend holds for it.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{CategoryTotal, Expense, ExpenseFilter, NewExpense},
};

#[async_trait]
pub trait ExpenseStore: Send + Sync {
    async fn session(&self) -> Result<Box<dyn ExpenseSession>, StoreError>;
}

#[async_trait]
pub trait ExpenseSession: Send {
    async fn find_by_key(&mut self, idempotency_key: &str) -> Result<Option<Expense>, StoreError>;

    /// Inserts a row. A row with the same idempotency key already in the
    /// store yields [`StoreError::Duplicate`].
    async fn insert(&mut self, expense: &NewExpense) -> Result<Expense, StoreError>;

    async fn list(&mut self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError>;

    /// Sum of amounts per distinct category, ordered by category.
    async fn totals_by_category(&mut self) -> Result<Vec<CategoryTotal>, StoreError>;
}
