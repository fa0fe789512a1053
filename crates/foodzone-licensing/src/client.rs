//! License service API client.

use async_trait::async_trait;
use foodzone_core::api::{
    ActivateRequest, ActivateResponse, CheckRequest, CheckResponse, ErrorResponse, VerifyRequest,
    VerifyResponse,
};
use foodzone_core::license::{InvalidReason, Verification};
use foodzone_core::{Error, Result};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The public license operations as seen from a device.
///
/// Transport failures, timeouts and server faults surface as
/// [`Error::Network`]; a refusal by the service is never a network error.
#[async_trait]
pub trait LicenseApi: Send + Sync {
    /// Rejections carry the service's message, and its hint when given.
    async fn activate(&self, request: &ActivateRequest) -> Result<ActivateResponse>;

    async fn verify(&self, license_key: &str, device_id: &str) -> Result<Verification>;

    async fn check(&self, license_key: &str) -> Result<CheckResponse>;
}

/// HTTP client for the license service.
pub struct HttpLicenseApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpLicenseApi {
    /// `base_url` is the server root, e.g. `http://192.168.0.121:3000`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, action: &str) -> String {
        format!("{}/api/license/{}", self.base_url, action)
    }

    async fn post<B: serde::Serialize + Sync>(&self, action: &str, body: &B) -> Result<Response> {
        self.client
            .post(self.url(action))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    response
        .json()
        .await
        .map_err(|e| Error::Network(format!("Undecodable response: {}", e)))
}

/// Map a non-success status to an error. 4xx bodies carry the service's
/// own message; anything else is treated as the service being unavailable.
async fn rejection(response: Response) -> Error {
    let status = response.status();
    if !status.is_client_error() {
        warn!(status = %status, "License service error");
        return Error::Network(format!("License service returned {}", status));
    }

    match response.json::<ErrorResponse>().await {
        Ok(body) if body.hint.is_some() => Error::Conflict {
            message: body.error,
            hint: body.hint,
        },
        Ok(body) => Error::Validation(body.error),
        Err(_) => Error::Validation(format!("Request rejected with {}", status)),
    }
}

#[async_trait]
impl LicenseApi for HttpLicenseApi {
    async fn activate(&self, request: &ActivateRequest) -> Result<ActivateResponse> {
        debug!(license_key = ?request.license_key, "Activating license");
        let response = self.post("activate", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let body: ActivateResponse = decode(response).await?;
        info!(message = %body.message, "License activation accepted");
        Ok(body)
    }

    async fn verify(&self, license_key: &str, device_id: &str) -> Result<Verification> {
        let request = VerifyRequest {
            license_key: Some(license_key.to_string()),
            device_id: Some(device_id.to_string()),
        };
        let response = self.post("verify", &request).await?;
        let status = response.status();
        if status != StatusCode::OK && !status.is_client_error() {
            return Err(rejection(response).await);
        }

        // Any `valid:false` body is a refusal, whatever the status.
        let body: VerifyResponse = if status == StatusCode::OK {
            decode(response).await?
        } else {
            match response.json::<VerifyResponse>().await {
                Ok(body) if !body.valid => body,
                _ => {
                    return Err(Error::Validation(format!(
                        "Request rejected with {}",
                        status
                    )));
                }
            }
        };

        if body.valid {
            return Ok(Verification::Valid {
                business_name: body.business_name,
                expires_at: body.expires_at,
            });
        }

        let message = body.error.unwrap_or_default();
        let reason = InvalidReason::from_message(&message).unwrap_or_else(|| {
            warn!(status = %status, message = %message, "Unrecognized refusal from license service");
            InvalidReason::Other
        });
        Ok(Verification::Invalid(reason))
    }

    async fn check(&self, license_key: &str) -> Result<CheckResponse> {
        let request = CheckRequest {
            license_key: Some(license_key.to_string()),
        };
        let response = self.post("check", &request).await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn api(server: &MockServer) -> HttpLicenseApi {
        HttpLicenseApi::new(&server.uri(), Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn test_activate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/activate"))
            .and(body_partial_json(json!({"licenseKey": "FOOD-AAAA-BBBB-CCCC", "deviceId": "dev1"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "success": true,
                "message": "License activated successfully",
                "expiresAt": null,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ActivateRequest {
            license_key: Some("FOOD-AAAA-BBBB-CCCC".into()),
            device_id: Some("dev1".into()),
            business_name: Some("Cafe X".into()),
            device_info: None,
        };
        let response = api(&server).await.activate(&request).await.unwrap();
        assert!(response.success);
        assert_eq!(response.expires_at, None);
    }

    #[tokio::test]
    async fn test_activate_rejection_keeps_hint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/activate"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "error": "License already activated on another device",
                "hint": "Contact support to transfer license",
            })))
            .mount(&server)
            .await;

        let err = api(&server)
            .await
            .activate(&ActivateRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "License already activated on another device");
        assert_eq!(err.hint(), Some("Contact support to transfer license"));
    }

    #[tokio::test]
    async fn test_verify_invalid_is_a_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"valid": false, "error": "Device mismatch"})),
            )
            .mount(&server)
            .await;

        let verdict = api(&server).await.verify("FOOD-AAAA-BBBB-CCCC", "dev2").await.unwrap();
        assert_eq!(verdict, Verification::Invalid(InvalidReason::DeviceMismatch));
    }

    #[tokio::test]
    async fn test_verify_unknown_refusal_is_still_a_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"valid": false, "error": "License suspended"})),
            )
            .mount(&server)
            .await;

        let verdict = api(&server).await.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap();
        assert_eq!(verdict, Verification::Invalid(InvalidReason::Other));
    }

    #[tokio::test]
    async fn test_verify_bad_request_refusal_is_a_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "valid": false,
                "error": "Missing required fields: licenseKey, deviceId",
            })))
            .mount(&server)
            .await;

        let verdict = api(&server).await.verify("", "dev1").await.unwrap();
        assert_eq!(verdict, Verification::Invalid(InvalidReason::Other));
    }

    #[tokio::test]
    async fn test_verify_unrelated_client_error_is_not_a_verdict() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(ResponseTemplate::new(404).set_body_string("no route"))
            .mount(&server)
            .await;

        let err = api(&server).await.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_verify_valid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "valid": true,
                "businessName": "Cafe X",
                "expiresAt": "2030-01-01T00:00:00Z",
            })))
            .mount(&server)
            .await;

        let verdict = api(&server).await.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap();
        match verdict {
            Verification::Valid {
                business_name,
                expires_at,
            } => {
                assert_eq!(business_name.as_deref(), Some("Cafe X"));
                assert!(expires_at.is_some());
            }
            other => panic!("expected valid, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_fault_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/verify"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "valid": false,
                "error": "Internal server error",
            })))
            .mount(&server)
            .await;

        let err = api(&server).await.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let api = HttpLicenseApi::new(&server.uri(), Duration::from_millis(100)).unwrap();
        let err = api.verify("FOOD-AAAA-BBBB-CCCC", "dev1").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
    }

    #[tokio::test]
    async fn test_check_unknown_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/license/check"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"exists": false, "message": "License not found"})),
            )
            .mount(&server)
            .await;

        let response = api(&server).await.check("FOOD-AAAA-BBBB-CCCC").await.unwrap();
        assert!(!response.exists);
        assert_eq!(response.message.as_deref(), Some("License not found"));
    }
}
