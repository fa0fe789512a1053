//! Health check and service index handlers.

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    /// Seconds since the server started.
    pub uptime: f64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now(),
        uptime: state.started_at.elapsed().as_secs_f64(),
    })
}

#[derive(Serialize)]
pub struct Endpoints {
    pub public: Vec<&'static str>,
    pub admin: Vec<&'static str>,
}

#[derive(Serialize)]
pub struct IndexResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub status: &'static str,
    pub endpoints: Endpoints,
}

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        name: "Food Zone ERP License Server",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: Endpoints {
            public: vec![
                "POST /api/license/activate",
                "POST /api/license/verify",
                "POST /api/license/check",
            ],
            admin: vec![
                "POST /api/admin/licenses/generate",
                "GET /api/admin/licenses",
                "GET /api/admin/attempts",
                "GET /api/admin/suspicious",
                "POST /api/admin/licenses/deactivate",
                "GET /api/admin/stats",
            ],
        },
    })
}
