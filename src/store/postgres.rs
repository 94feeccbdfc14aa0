use async_trait::async_trait;
use sqlx::{pool::PoolConnection, types::BigDecimal, Pool, Postgres, QueryBuilder};

use super::{ExpenseSession, ExpenseStore};
use crate::{
    error::{MigrationError, StoreError},
    migration::Schema,
    models::{amount_to_f64, CategoryTotal, Expense, ExpenseFilter, NewExpense, SortOrder},
};

const EXPENSE_COLUMNS: &str = "id, amount, category, description, date, idempotency_key, created_at";

#[derive(Clone)]
pub struct PgExpenseStore {
    p: Pool<Postgres>,
}

impl PgExpenseStore {
    /// Applies `schema` to the database behind `p` and wraps the pool.
    pub async fn new(p: Pool<Postgres>, schema: &Schema) -> Result<Self, MigrationError> {
        schema.apply(&p).await?;
        Ok(Self { p })
    }
}

#[async_trait]
impl ExpenseStore for PgExpenseStore {
    async fn session(&self) -> Result<Box<dyn ExpenseSession>, StoreError> {
        let conn = self.p.acquire().await?;
        Ok(Box::new(PgExpenseSession { conn }))
    }
}

/// Holds one pooled connection, returned to the pool on drop.
pub struct PgExpenseSession {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl ExpenseSession for PgExpenseSession {
    async fn find_by_key(&mut self, idempotency_key: &str) -> Result<Option<Expense>, StoreError> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense WHERE idempotency_key = $1"
        ))
        .bind(idempotency_key)
        .fetch_optional(&mut *self.conn)
        .await?;
        Ok(expense)
    }

    async fn insert(&mut self, expense: &NewExpense) -> Result<Expense, StoreError> {
        let res = sqlx::query_as::<_, Expense>(&format!(
            r#"
            INSERT INTO expense (amount, category, description, date, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXPENSE_COLUMNS}
            "#
        ))
        .bind(&expense.amount)
        .bind(&expense.category)
        .bind(&expense.description)
        .bind(expense.date)
        .bind(&expense.idempotency_key)
        .bind(expense.created_at)
        .fetch_one(&mut *self.conn)
        .await;

        match res {
            Ok(stored) => Ok(stored),
            Err(err) => {
                if let Some(db_err) = err.as_database_error() {
                    if db_err.is_unique_violation() {
                        return Err(StoreError::Duplicate(expense.idempotency_key.clone()));
                    }
                }
                Err(StoreError::Database(err))
            }
        }
    }

    async fn list(&mut self, filter: &ExpenseFilter) -> Result<Vec<Expense>, StoreError> {
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {EXPENSE_COLUMNS} FROM expense"));

        if let Some(category) = &filter.category {
            query.push(" WHERE category = ").push_bind(category.clone());
        }

        match filter.sort {
            SortOrder::DateDesc => query.push(" ORDER BY date DESC, id ASC"),
            SortOrder::Natural => query.push(" ORDER BY id ASC"),
        };

        let expenses = query
            .build_query_as::<Expense>()
            .fetch_all(&mut *self.conn)
            .await?;
        Ok(expenses)
    }

    async fn totals_by_category(&mut self) -> Result<Vec<CategoryTotal>, StoreError> {
        #[derive(sqlx::FromRow)]
        struct Record {
            category: String,
            total: BigDecimal,
        }

        let records = sqlx::query_as::<_, Record>(
            r#"
            SELECT
                category,
                SUM(amount) AS total
            FROM
                expense
            GROUP BY
                category
            ORDER BY
                category ASC
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await?;

        records
            .into_iter()
            .map(|r| {
                Ok::<_, StoreError>(CategoryTotal {
                    total: amount_to_f64(&r.total)?,
                    category: r.category,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use sqlx::postgres::PgPoolOptions;
    use tokio::sync::OnceCell;

    use super::*;

    static MIGRATED: OnceCell<()> = OnceCell::const_new();

    // Run with `cargo test -- --ignored` and DATABASE_URL set.
    async fn connect() -> PgExpenseStore {
        let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let p = PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();

        // Concurrent CREATE TABLE IF NOT EXISTS can still collide, apply once.
        MIGRATED
            .get_or_init(|| async {
                let schema = Schema::load(concat!(env!("CARGO_MANIFEST_DIR"), "/migrations")).unwrap();
                PgExpenseStore::new(p.clone(), &schema).await.unwrap();
            })
            .await;
        PgExpenseStore { p }
    }

    /// Category unique to one test run, so runs against a shared database
    /// do not see each other's rows.
    fn category(name: &str) -> String {
        format!("{name}-{}", Utc::now().timestamp_nanos_opt().unwrap_or_default())
    }

    fn new_expense(amount: &str, category: &str, description: &str, date: (i32, u32, u32)) -> NewExpense {
        NewExpense {
            amount: amount.parse().unwrap(),
            category: category.to_string(),
            description: description.to_string(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            idempotency_key: format!("{category}|{description}|{amount}"),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn second_insert_of_a_key_is_a_duplicate() {
        let store = connect().await;
        let mut session = store.session().await.unwrap();
        let expense = new_expense("12.50", &category("Food"), "Lunch", (2024, 1, 1));

        let stored = session.insert(&expense).await.unwrap();
        assert_eq!(stored.amount, expense.amount);
        assert_eq!(stored.date, expense.date);

        let err = session.insert(&expense).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref key) if *key == expense.idempotency_key));

        let found = session.find_by_key(&expense.idempotency_key).await.unwrap();
        assert_eq!(found.map(|e| e.id), Some(stored.id));
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn lists_one_category_newest_first() {
        let store = connect().await;
        let mut session = store.session().await.unwrap();
        let food = category("Food");
        let other = category("Transport");
        for (desc, cat, date) in [
            ("a", &food, (2024, 1, 10)),
            ("b", &other, (2024, 1, 20)),
            ("c", &food, (2024, 1, 30)),
            ("d", &food, (2024, 1, 30)),
        ] {
            session.insert(&new_expense("1.00", cat, desc, date)).await.unwrap();
        }

        let natural = session
            .list(&ExpenseFilter {
                category: Some(food.clone()),
                sort: SortOrder::Natural,
            })
            .await
            .unwrap();
        let descriptions: Vec<&str> = natural.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["a", "c", "d"]);

        let newest = session
            .list(&ExpenseFilter {
                category: Some(food),
                sort: SortOrder::DateDesc,
            })
            .await
            .unwrap();
        let descriptions: Vec<&str> = newest.iter().map(|e| e.description.as_str()).collect();
        assert_eq!(descriptions, vec!["c", "d", "a"]);
    }

    #[tokio::test]
    #[ignore = "needs a PostgreSQL database in DATABASE_URL"]
    async fn totals_group_by_category() {
        let store = connect().await;
        let mut session = store.session().await.unwrap();
        let food = category("Food");
        let other = category("Transport");
        session.insert(&new_expense("10.00", &food, "Groceries", (2024, 3, 5))).await.unwrap();
        session.insert(&new_expense("2.50", &food, "Coffee", (2024, 3, 6))).await.unwrap();
        session.insert(&new_expense("5.00", &other, "Taxi", (2024, 3, 7))).await.unwrap();

        let totals = session.totals_by_category().await.unwrap();
        let total_of = |c: &str| totals.iter().find(|t| t.category == c).map(|t| t.total);
        assert_eq!(total_of(&food), Some(12.5));
        assert_eq!(total_of(&other), Some(5.0));
    }
}
