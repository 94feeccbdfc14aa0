//! Expense business rules: validation, idempotent creation, listing and
//! per-category totals.

use std::str::FromStr;

use bigdecimal::RoundingMode;
use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use sqlx::types::BigDecimal;

use crate::{
    error::{StoreError, ValidationError},
    models::{CategoryTotal, Expense, ExpenseFilter, NewExpense},
    store::ExpenseSession,
};

const MAX_AMOUNT: f64 = 99_999_999.99;

/// Creation request as received from a client, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseInput {
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: String,
}

/// Checks `input` and builds the row to store, including its idempotency key.
pub fn validate_new_expense(input: &ExpenseInput) -> Result<NewExpense, ValidationError> {
    let amount = validate_amount(input.amount)?;

    if input.category.trim().is_empty() {
        return Err(ValidationError::EmptyField("category"));
    }
    if input.description.trim().is_empty() {
        return Err(ValidationError::EmptyField("description"));
    }

    let date = parse_date(&input.date)?;

    Ok(NewExpense {
        idempotency_key: idempotency_key(input.amount, &input.category, &input.description, date),
        amount,
        category: input.category.clone(),
        description: input.description.clone(),
        date,
        created_at: Utc::now(),
    })
}

/// Strict `YYYY-MM-DD`: no padding, no sign, two-digit month and day.
fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    let well_formed = s.len() == 10
        && s.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !well_formed {
        return Err(ValidationError::InvalidDate(s.to_string()));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate(s.to_string()))
}

fn validate_amount(amount: f64) -> Result<BigDecimal, ValidationError> {
    if !amount.is_finite() {
        return Err(ValidationError::AmountNotFinite(amount));
    }
    if amount <= 0.0 {
        return Err(ValidationError::AmountNotPositive(amount));
    }
    if amount > MAX_AMOUNT {
        return Err(ValidationError::AmountTooLarge(amount));
    }

    // f64 display is the shortest round-trip decimal and never uses an exponent.
    let exact = BigDecimal::from_str(&amount.to_string())
        .map_err(|_| ValidationError::AmountNotFinite(amount))?;
    let rounded = exact.with_scale_round(2, RoundingMode::HalfUp);
    if rounded == BigDecimal::from(0) {
        return Err(ValidationError::AmountTooSmall(amount));
    }
    Ok(rounded)
}

/// Literal form of an amount inside the idempotency key: the shortest
/// round-trip decimal, with `.0` appended to integral values (`12.5`, `10.0`).
pub fn amount_literal(amount: f64) -> String {
    let s = amount.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Hex SHA-256 of amount, category, description and date concatenated
/// without separators. Stored keys depend on this exact layout.
pub fn idempotency_key(amount: f64, category: &str, description: &str, date: NaiveDate) -> String {
    let raw = format!(
        "{}{}{}{}",
        amount_literal(amount),
        category,
        description,
        date.format("%Y-%m-%d")
    );
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Stores `expense` unless a row with the same idempotency key exists, in
/// which case that row is returned unchanged.
pub async fn create_expense(
    session: &mut dyn ExpenseSession,
    expense: NewExpense,
) -> Result<Expense, StoreError> {
    if let Some(existing) = session.find_by_key(&expense.idempotency_key).await? {
        log::debug!("expense {} already stored for key {}", existing.id, existing.idempotency_key);
        return Ok(existing);
    }

    match session.insert(&expense).await {
        Ok(stored) => {
            log::info!("created expense {} ({})", stored.id, stored.category);
            Ok(stored)
        }
        Err(StoreError::Duplicate(key)) => {
            log::warn!("concurrent insert for key {key}, reading the stored row");
            session
                .find_by_key(&key)
                .await?
                .ok_or(StoreError::ConflictUnresolved(key))
        }
        Err(err) => Err(err),
    }
}

pub async fn list_expenses(
    session: &mut dyn ExpenseSession,
    filter: &ExpenseFilter,
) -> Result<Vec<Expense>, StoreError> {
    session.list(filter).await
}

pub async fn summarize_by_category(
    session: &mut dyn ExpenseSession,
) -> Result<Vec<CategoryTotal>, StoreError> {
    session.totals_by_category().await
}
