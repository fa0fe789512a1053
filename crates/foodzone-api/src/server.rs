//! Server lifecycle: open the store, bind, serve until a shutdown signal.

use foodzone_core::{Error, Result};
use foodzone_db::Database;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::routes::create_router;
use crate::state::AppState;

/// Open the database, apply the schema and build the router.
pub async fn build_app(config: &ServerConfig) -> Result<(axum::Router, Database)> {
    let db = Database::connect(&config.database).await?;
    db.migrate().await?;

    if !config.admin.is_configured() {
        warn!("Admin credentials not configured; admin endpoints will refuse all requests");
    }

    let state = AppState::new(Arc::new(db.license_store()), config.admin.clone());
    Ok((create_router(Arc::new(state)), db))
}

/// Run the server until `shutdown` resolves, then close the database.
pub async fn serve(
    config: &ServerConfig,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let (app, db) = build_app(config).await?;
    let addr = config.bind_addr()?;
    let listener = TcpListener::bind(addr).await?;

    info!(%addr, "Food Zone license server listening");

    let result = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Shutdown signal received, draining connections");
        })
        .await
        .map_err(Error::from);

    db.close().await;
    info!("Server stopped");
    result
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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
}
