//! HTTP middleware for the API server.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderValue, Method, Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

const REQUEST_ID: &str = "x-request-id";

/// Create CORS middleware layer.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("username"),
            header::HeaderName::from_static("password"),
        ])
        .allow_origin(Any)
}

/// Inject request ID into each request.
pub async fn request_id(mut request: Request<Body>, next: Next) -> Response {
    let request_id = HeaderValue::from_str(&Uuid::new_v4().to_string()).ok();
    if let Some(id) = &request_id {
        request.headers_mut().insert(REQUEST_ID, id.clone());
    }

    let mut response = next.run(request).await;
    if let Some(id) = request_id {
        response.headers_mut().insert(REQUEST_ID, id);
    }

    response
}

/// Gate admin routes on the `username` / `password` headers.
pub async fn admin_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let headers = request.headers();
    let username = header_str(headers, "username");
    let password = header_str(headers, "password");

    if state.admin_credentials.authorizes(username, password) {
        return next.run(request).await;
    }

    if !state.admin_credentials.is_configured() {
        warn!(path = %request.uri().path(), "Admin request refused: no credentials configured");
    } else {
        warn!(
            path = %request.uri().path(),
            username = username.unwrap_or("-"),
            "Admin request refused: bad credentials"
        );
    }
    ApiError::unauthorized().into_response()
}

/// Best-effort caller address from proxy headers.
pub fn client_ip(headers: &HeaderMap) -> Option<String> {
    header_str(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header_str(headers, "x-real-ip"))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
