//! API route definitions.

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers::{admin, health, license};
use crate::middleware::{admin_auth, cors_layer, request_id};
use crate::state::AppState;

/// Create the main API router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api/license", license_routes())
        .nest("/api/admin", admin_routes(state.clone()))
        .route("/health", get(health::health))
        .route("/", get(health::index))
        .layer(TraceLayer::new_for_http())
        .layer(axum_middleware::from_fn(request_id))
        .layer(cors_layer())
        .with_state(state)
}

fn license_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/activate", post(license::activate))
        .route("/verify", post(license::verify))
        .route("/check", post(license::check))
}

fn admin_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/licenses", get(admin::list_licenses))
        .route("/licenses/generate", post(admin::generate_licenses))
        .route("/licenses/deactivate", post(admin::deactivate_license))
        .route("/attempts", get(admin::list_attempts))
        .route("/suspicious", get(admin::list_suspicious))
        .route("/stats", get(admin::stats))
        .route_layer(axum_middleware::from_fn_with_state(state, admin_auth))
}
