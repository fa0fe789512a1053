//! Test helper functions and utilities.

use foodzone_api::config::AdminConfig;
use foodzone_api::{AppState, create_router};
use reqwest::Client;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::context::{ADMIN_PASSWORD, ADMIN_USERNAME, TestContext};

/// Start an API server over the context's database and return its address.
pub async fn start_test_server(
    ctx: &TestContext,
    admin_credentials: AdminConfig,
) -> anyhow::Result<(SocketAddr, tokio::task::JoinHandle<()>)> {
    let state = Arc::new(AppState::new(ctx.store(), admin_credentials));

    let app = create_router(state);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Test server stopped");
        }
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    Ok((addr, handle))
}

/// An address nothing listens on.
pub async fn closed_addr() -> anyhow::Result<SocketAddr> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Create an HTTP client for testing.
pub fn test_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create test client")
}

/// API test client with base URL.
pub struct ApiTestClient {
    client: Client,
    base_url: String,
}

impl ApiTestClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            client: test_client(),
            base_url: format!("http://{}", addr),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client.get(self.url(path)).send().await
    }

    pub async fn post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client.post(self.url(path)).json(body).send().await
    }

    /// POST a raw body with a JSON content type.
    pub async fn post_raw(&self, path: &str, body: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
    }

    pub async fn admin_get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(self.url(path))
            .header("username", ADMIN_USERNAME)
            .header("password", ADMIN_PASSWORD)
            .send()
            .await
    }

    pub async fn admin_post<T: serde::Serialize>(
        &self,
        path: &str,
        body: &T,
    ) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .header("username", ADMIN_USERNAME)
            .header("password", ADMIN_PASSWORD)
            .json(body)
            .send()
            .await
    }

    /// Check health endpoint.
    pub async fn health(&self) -> anyhow::Result<bool> {
        let resp = self.get("/health").await?;
        Ok(resp.status().is_success())
    }
}

/// Assert that a future completes within a timeout.
pub async fn assert_completes_within<F, T>(future: F, timeout: Duration) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(timeout, future)
        .await
        .expect("Operation timed out")
}
