//! Public license handlers used by devices.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use foodzone_core::api::{
    ActivateRequest, ActivateResponse, CheckRequest, CheckResponse, VerifyRequest, VerifyResponse,
};
use foodzone_core::license::ActivationRequest;
use std::sync::Arc;

use crate::error::{ApiError, Envelope};
use crate::middleware::client_ip;
use crate::state::AppState;

pub async fn activate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    payload: Result<Json<ActivateRequest>, JsonRejection>,
) -> Result<Json<ActivateResponse>, ApiError> {
    let Json(body) = payload?;

    let activation = state
        .licenses
        .activate(ActivationRequest {
            license_key: body.license_key,
            device_id: body.device_id,
            device_info: body.device_info.unwrap_or_default(),
            business_name: body.business_name,
            ip_address: client_ip(&headers),
        })
        .await?;

    Ok(Json(ActivateResponse {
        success: true,
        message: activation.message,
        expires_at: activation.expires_at,
    }))
}

/// Refusals are reported in the body with status 200; only malformed
/// requests and store failures are HTTP errors.
pub async fn verify(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ApiError> {
    let Json(body) = payload.map_err(|r| ApiError::from(r).envelope(Envelope::Valid))?;

    let verification = state
        .licenses
        .verify(
            body.license_key.as_deref().unwrap_or_default(),
            body.device_id.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| ApiError::from(e).envelope(Envelope::Valid))?;

    Ok(Json(VerifyResponse::from(verification)))
}

pub async fn check(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CheckRequest>, JsonRejection>,
) -> Result<Json<CheckResponse>, ApiError> {
    let Json(body) = payload.map_err(|r| ApiError::from(r).envelope(Envelope::Exists))?;

    let summary = state
        .licenses
        .check(body.license_key.as_deref().unwrap_or_default())
        .await
        .map_err(|e| ApiError::from(e).envelope(Envelope::Exists))?;

    Ok(Json(CheckResponse::from(summary)))
}
