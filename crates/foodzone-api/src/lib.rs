//! HTTP API server for the Food Zone license service.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use routes::create_router;
pub use server::{build_app, serve, shutdown_signal};
pub use state::AppState;
