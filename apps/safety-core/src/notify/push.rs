//! HTTP push transport.
//!
//! Form-encoded POST to a push endpoint (Pushover-compatible):
//! token/user/title/message/priority, plus `expire`/`retry` for emergency
//! priority. Any non-2xx response or transport error is a delivery
//! failure.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::{MAX_EMERGENCY_EXPIRE_SECS, MIN_EMERGENCY_RETRY_SECS, NotificationConfig};

use super::request::{NotificationRequest, Priority};

/// Delivery failure detail.
#[derive(Debug, Error)]
pub enum PushError {
    /// The HTTP request could not be built or sent.
    #[error("Push transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Push endpoint rejected request: status={status} body={body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body (truncated by the server, passed through as-is).
        body: String,
    },
}

/// Something that can deliver one alert.
///
/// Separated from [`PushClient`] so the pipeline worker can be exercised
/// against in-process transports in tests.
#[async_trait]
pub trait AlertTransport: Send + Sync {
    /// Deliver one alert.
    ///
    /// # Errors
    ///
    /// Returns an error on any transport or endpoint failure; the caller
    /// logs and moves on, it never retries the same item.
    async fn deliver(&self, request: &NotificationRequest) -> Result<(), PushError>;
}

/// Production transport over `reqwest`.
#[derive(Debug, Clone)]
pub struct PushClient {
    client: Client,
    endpoint: String,
    token: String,
    user: String,
    expire_secs: u64,
    retry_secs: u64,
}

impl PushClient {
    /// Build a client from configuration.
    ///
    /// The client-side timeout is taken from the config, which validation
    /// guarantees is strictly shorter than the watchdog stall threshold —
    /// the watchdog never has to race an in-flight send.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &NotificationConfig) -> Result<Self, PushError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.send_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token: config.token.clone(),
            user: config.user.clone(),
            expire_secs: config.emergency_expire_secs.min(MAX_EMERGENCY_EXPIRE_SECS),
            retry_secs: config.emergency_retry_secs.max(MIN_EMERGENCY_RETRY_SECS),
        })
    }

    fn form_params(&self, request: &NotificationRequest) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("token", self.token.clone()),
            ("user", self.user.clone()),
            ("title", request.title.clone()),
            ("message", request.message.clone()),
            ("priority", request.priority.level().to_string()),
        ];
        if request.priority == Priority::Emergency {
            params.push(("expire", self.expire_secs.to_string()));
            params.push(("retry", self.retry_secs.to_string()));
        }
        params
    }
}

#[async_trait]
impl AlertTransport for PushClient {
    async fn deliver(&self, request: &NotificationRequest) -> Result<(), PushError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&self.form_params(request))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(endpoint: String) -> NotificationConfig {
        NotificationConfig {
            endpoint,
            token: "app-token".to_string(),
            user: "user-key".to_string(),
            ..NotificationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_normal_priority_form_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1/messages.json"))
            .and(body_string_contains("token=app-token"))
            .and(body_string_contains("user=user-key"))
            .and(body_string_contains("priority=0"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = PushClient::new(&config(format!("{}/1/messages.json", server.uri()))).unwrap();
        let request = NotificationRequest::new("k", "title", "body", Priority::Normal);
        client.deliver(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_emergency_priority_adds_expire_and_retry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("priority=2"))
            .and(body_string_contains("expire=3600"))
            .and(body_string_contains("retry=60"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = PushClient::new(&config(server.uri())).unwrap();
        let request = NotificationRequest::new("k", "title", "body", Priority::Emergency);
        client.deliver(&request).await.unwrap();
    }

    #[tokio::test]
    async fn test_non_success_status_is_a_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let client = PushClient::new(&config(server.uri())).unwrap();
        let request = NotificationRequest::new("k", "t", "m", Priority::High);
        let err = client.deliver(&request).await.unwrap_err();
        match err {
            PushError::Rejected { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "rate limited");
            }
            PushError::Transport(_) => panic!("expected Rejected"),
        }
    }
}
