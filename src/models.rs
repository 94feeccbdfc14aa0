use bigdecimal::ToPrimitive;
use serde::Serialize;
use sqlx::types::{
    chrono::{DateTime, NaiveDate, Utc},
    BigDecimal,
};

use crate::error::StoreError;

/// A persisted expense row.
#[derive(sqlx::FromRow, Debug, Clone, PartialEq)]
pub struct Expense {
    pub id: i64,
    pub amount: BigDecimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

/// A validated expense that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub amount: BigDecimal,
    pub category: String,
    pub description: String,
    pub date: NaiveDate,
    pub idempotency_key: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    /// Primary key order.
    #[default]
    Natural,
    DateDesc,
}

impl SortOrder {
    /// Only `date_desc` is recognized, anything else keeps the natural order.
    pub fn from_param(sort: Option<&str>) -> Self {
        match sort {
            Some("date_desc") => SortOrder::DateDesc,
            _ => SortOrder::Natural,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub category: Option<String>,
    pub sort: SortOrder,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub total: f64,
}

/// Float form of a stored amount or total, as sent on the wire.
pub fn amount_to_f64(amount: &BigDecimal) -> Result<f64, StoreError> {
    amount
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StoreError::AmountNotRepresentable(amount.to_string()))
}
