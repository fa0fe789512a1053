//! Operator handlers. Mounted behind the admin auth middleware.

use axum::{Json, extract::State};
use axum_extra::extract::WithRejection;
use foodzone_core::api::{
    AttemptsResponse, DeactivateRequest, DeactivateResponse, GenerateRequest, GenerateResponse,
    LicenseListResponse, StatsResponse, SuspiciousResponse,
};
use std::sync::Arc;

use crate::error::ApiError;
use crate::state::AppState;

pub async fn generate_licenses(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<GenerateRequest>, ApiError>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let licenses = state
        .admin
        .generate(body.count, body.subscription_months)
        .await?;

    Ok(Json(GenerateResponse {
        success: true,
        count: licenses.len(),
        licenses,
    }))
}

pub async fn list_licenses(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LicenseListResponse>, ApiError> {
    let licenses = state.admin.list_licenses().await?;
    Ok(Json(LicenseListResponse {
        success: true,
        count: licenses.len(),
        licenses,
    }))
}

pub async fn list_attempts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AttemptsResponse>, ApiError> {
    let attempts = state.admin.recent_attempts(None).await?;
    Ok(Json(AttemptsResponse {
        success: true,
        attempts,
    }))
}

pub async fn list_suspicious(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuspiciousResponse>, ApiError> {
    let suspicious = state.admin.suspicious_activity().await?;
    Ok(Json(SuspiciousResponse {
        success: true,
        suspicious,
    }))
}

pub async fn deactivate_license(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<DeactivateRequest>, ApiError>,
) -> Result<Json<DeactivateResponse>, ApiError> {
    state
        .admin
        .deactivate(body.license_key.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(DeactivateResponse { success: true }))
}

pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let stats = state.admin.stats().await?;
    Ok(Json(StatsResponse {
        success: true,
        stats,
    }))
}
