use axum::{
    extract::{rejection::JsonRejection, Query, State},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::{message::AppMessage, AppState};
use crate::{
    error::{StoreError, ValidationError},
    models::{amount_to_f64, CategoryTotal, Expense, ExpenseFilter, SortOrder},
    service::{self, ExpenseInput},
};

pub fn new_router() -> Router<AppState> {
    Router::new()
        .route("/expenses", axum::routing::get(list).post(create))
        .route("/expenses/summary", axum::routing::get(summary))
}

#[derive(Deserialize, Debug)]
pub struct CreateExpenseBody {
    amount: f64,
    category: String,
    description: String,
    date: String,
}

/// Wire form of an expense. The idempotency key stays internal.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct ExpenseOut {
    pub id: i64,
    pub amount: f64,
    pub category: String,
    pub description: String,
    pub date: String,
}

impl TryFrom<Expense> for ExpenseOut {
    type Error = StoreError;

    fn try_from(e: Expense) -> Result<Self, Self::Error> {
        Ok(Self {
            id: e.id,
            amount: amount_to_f64(&e.amount)?,
            category: e.category,
            description: e.description,
            date: e.date.format("%Y-%m-%d").to_string(),
        })
    }
}

#[derive(Deserialize, Debug)]
pub struct ListQuery {
    category: Option<String>,
    sort: Option<String>,
}

impl ListQuery {
    fn filter(self) -> ExpenseFilter {
        ExpenseFilter {
            sort: SortOrder::from_param(self.sort.as_deref()),
            category: self.category.filter(|c| !c.is_empty()),
        }
    }
}

#[axum::debug_handler]
async fn create(
    State(s): State<AppState>,
    body: Result<Json<CreateExpenseBody>, JsonRejection>,
) -> Result<Json<ExpenseOut>, AppMessage> {
    let Json(body) = body.map_err(|err| ValidationError::MalformedBody(err.body_text()))?;
    log::info!("POST /expenses {body:?}");

    let new = service::validate_new_expense(&ExpenseInput {
        amount: body.amount,
        category: body.category,
        description: body.description,
        date: body.date,
    })?;

    let mut session = s.store.session().await?;
    let expense = service::create_expense(session.as_mut(), new).await?;
    Ok(Json(ExpenseOut::try_from(expense)?))
}

#[axum::debug_handler]
async fn list(
    State(s): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<ExpenseOut>>, AppMessage> {
    log::info!("GET /expenses {q:?}");

    let mut session = s.store.session().await?;
    let expenses = service::list_expenses(session.as_mut(), &q.filter()).await?;
    let expenses = expenses
        .into_iter()
        .map(ExpenseOut::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(expenses))
}

#[axum::debug_handler]
async fn summary(State(s): State<AppState>) -> Result<Json<Vec<CategoryTotal>>, AppMessage> {
    log::info!("GET /expenses/summary");

    let mut session = s.store.session().await?;
    let totals = service::summarize_by_category(session.as_mut()).await?;
    Ok(Json(totals))
}
