pub mod expenses;
pub mod message;

use std::{net::SocketAddr, path::Path, sync::Arc};

use axum::Router;
use tokio::signal;
use tower_http::services::ServeFile;

use crate::store::ExpenseStore;

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn ExpenseStore>,
}

pub fn new_router(store: Arc<dyn ExpenseStore>, index_html: impl AsRef<Path>) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(index_html.as_ref()))
        .merge(expenses::new_router())
        .with_state(AppState { store })
}

pub async fn start_web_server(app: Router, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("open website at http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    log::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("cannot listen for ctrl-c: {err}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(err) => {
                log::error!("cannot listen for SIGTERM: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("shutting down");
}
