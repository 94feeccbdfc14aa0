use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use sqlx::types::BigDecimal;

use super::{ExpenseSession, ExpenseStore};
use crate::{
    error::StoreError,
    models::{amount_to_f64, CategoryTotal, Expense, ExpenseFilter, NewExpense, SortOrder},
};

/// Store keeping rows in process memory, with the same uniqueness rule on
/// the idempotency key as the `expense` table.
#[derive(Clone, Default)]
pub struct MemoryExpenseStore {
    rows: Arc<Mutex<Vec<Expense>>>,
}

impl MemoryExpenseStore {
    pub fn rows(&self) -> Vec<Expense> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExpenseStore for MemoryExpenseStore {
    async fn session(&self) -> Result<Box<dyn ExpenseSession>, StoreError> {
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl ExpenseSession for MemoryExpenseStore {
    async fn find_by_key(&mut self, idempotency_key: &str) -> Result<Option<Expense>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|e| e.idempotency_key == idempotency_key)
            .cloned())
    }

    async fn insert(&mut self, expense: &NewExpense) -> Result<Expense, StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|e| e.idempotency_key == expense.idempotency_key)
        {
            return Err(StoreError::Duplicate(expense.idempotency_key.clone()));
        }

        let stored = Expense {
            id: rows.len() as i64 + 1,
            amount: expense.amount.clone(),
            category: expense.category.clone(),
            description: expense.description.clone(),
            date: expense.date,
            idempotency_key: expense.idempotency_key.clone(),
            created_at: expense.created_at,
        };
        rows.push(stored.clone());
        Ok(stored)
    }

    async fn list(&mut self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut expenses: Vec<Expense> = rows
            .iter()
            .filter(|e| filter.category.as_ref().map_or(true, |c| &e.category == c))
            .cloned()
            .collect();

        if filter.sort == SortOrder::DateDesc {
            expenses.sort_by(|a, b| b.date.cmp(&a.date));
        }
        Ok(expenses)
    }

    async fn totals_by_category(&mut self) -> Result<Vec<CategoryTotal>, StoreError> {
        let rows = self.rows.lock().unwrap();
        let mut sums: BTreeMap<String, BigDecimal> = BTreeMap::new();
        for e in rows.iter() {
            *sums.entry(e.category.clone()).or_default() += e.amount.clone();
        }

        sums.into_iter()
            .map(|(category, total)| {
                Ok::<_, StoreError>(CategoryTotal {
                    total: amount_to_f64(&total)?,
                    category,
                })
            })
            .collect()
    }
}
