mod config;
mod error;
mod front;
mod migration;
pub mod models;
mod service;
mod store;

use std::sync::Arc;

use env_logger::Env;
use sqlx::postgres::PgPoolOptions;

use crate::{config::Config, migration::Schema, store::postgres::PgExpenseStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::try_init_from_env(Env::default().default_filter_or("expense_tracker=debug"))?;

    let config = Config::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    let schema = Schema::load(&config.migrations_dir)?;
    let store = PgExpenseStore::new(pool, &schema).await?;

    let app = front::new_router(Arc::new(store), &config.index_html);
    front::start_web_server(app, config.bind_addr).await
}
