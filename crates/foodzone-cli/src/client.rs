//! Admin API client.

use crate::config::CliConfig;
use foodzone_core::api::{
    AttemptsResponse, DeactivateRequest, DeactivateResponse, ErrorResponse, GenerateRequest,
    GenerateResponse, LicenseListResponse, StatsResponse, SuspiciousResponse,
};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{0}")]
    Rejected(String),
    #[error("Unauthorized: check admin_username / admin_password")]
    Unauthorized,
    #[error("Server error: {0}")]
    Server(String),
}

pub struct AdminClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl AdminClient {
    pub fn new(config: &CliConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: Client::builder().timeout(config.verify_timeout()).build()?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            username: config.admin_username.clone(),
            password: config.admin_password.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}/api/admin{}", self.base_url, path);
        let mut req = self.client.request(method, &url);
        if let Some(username) = &self.username {
            req = req.header("username", username);
        }
        if let Some(password) = &self.password {
            req = req.header("password", password);
        }
        req
    }

    async fn handle<T: DeserializeOwned>(res: Response) -> Result<T, ApiError> {
        match res.status() {
            StatusCode::OK => Ok(res.json().await?),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status if status.is_client_error() => {
                let body: ErrorResponse = res.json().await.unwrap_or_default();
                Err(ApiError::Rejected(body.error))
            }
            status => Err(ApiError::Server(status.to_string())),
        }
    }

    pub async fn generate(
        &self,
        count: u32,
        months: Option<u32>,
    ) -> Result<GenerateResponse, ApiError> {
        let body = GenerateRequest {
            count: Some(count),
            subscription_months: months,
        };
        let res = self
            .request(Method::POST, "/licenses/generate")
            .json(&body)
            .send()
            .await?;
        Self::handle(res).await
    }

    pub async fn list_licenses(&self) -> Result<LicenseListResponse, ApiError> {
        let res = self.request(Method::GET, "/licenses").send().await?;
        Self::handle(res).await
    }

    pub async fn attempts(&self) -> Result<AttemptsResponse, ApiError> {
        let res = self.request(Method::GET, "/attempts").send().await?;
        Self::handle(res).await
    }

    pub async fn suspicious(&self) -> Result<SuspiciousResponse, ApiError> {
        let res = self.request(Method::GET, "/suspicious").send().await?;
        Self::handle(res).await
    }

    pub async fn deactivate(&self, license_key: &str) -> Result<DeactivateResponse, ApiError> {
        let body = DeactivateRequest {
            license_key: Some(license_key.to_string()),
        };
        let res = self
            .request(Method::POST, "/licenses/deactivate")
            .json(&body)
            .send()
            .await?;
        Self::handle(res).await
    }

    pub async fn stats(&self) -> Result<StatsResponse, ApiError> {
        let res = self.request(Method::GET, "/stats").send().await?;
        Self::handle(res).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> CliConfig {
        CliConfig {
            api_url: server.uri(),
            admin_username: Some("ops".into()),
            admin_password: Some("pw".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sends_admin_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/admin/stats"))
            .and(header("username", "ops"))
            .and(header("password", "pw"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "stats": {"total": 2, "active": 1, "pending": 1, "expired": 0},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = AdminClient::new(&config(&server)).unwrap();
        let stats = client.stats().await.unwrap().stats;
        assert_eq!(stats.total, 2);
        assert_eq!(stats.active, 1);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "Unauthorized"})))
            .mount(&server)
            .await;

        let client = AdminClient::new(&config(&server)).unwrap();
        assert!(matches!(client.list_licenses().await, Err(ApiError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_rejection_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/admin/licenses/generate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "count must be between 1 and 1000",
            })))
            .mount(&server)
            .await;

        let client = AdminClient::new(&config(&server)).unwrap();
        let err = client.generate(5000, None).await.unwrap_err();
        assert_eq!(err.to_string(), "count must be between 1 and 1000");
    }
}
