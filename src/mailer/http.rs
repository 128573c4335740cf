//! HTTP mail provider client.
//!
//! POSTs one message per recipient to the provider's send endpoint. The
//! contact id travels as message metadata and comes back on delivery-event
//! callbacks, which is how bounces find their way to the right contact.
//! Connection-level failures and retryable statuses (429, 5xx) are retried
//! with bounded exponential backoff before the recipient is reported
//! failed; a 4xx means the provider rejected this recipient and retrying
//! cannot help.

use std::time::Duration;

use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::interfaces::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};

#[derive(Debug, Clone)]
pub struct HttpMailerConfig {
    /// Provider send endpoint URL.
    pub endpoint: String,
    /// Bearer token for the provider API.
    pub api_key: String,
    /// Sender address for all outreach mail.
    pub from_address: String,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for HttpMailerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            from_address: String::new(),
            timeout: Duration::from_secs(10),
        }
    }
}

impl HttpMailerConfig {
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_api_key(mut self, api_key: String) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_from_address(mut self, from_address: String) -> Self {
        self.from_address = from_address;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Response body for an accepted message.
#[derive(Debug, Deserialize)]
struct SendResponse {
    id: Option<String>,
}

/// Mail delivery over the provider's HTTP API.
pub struct HttpMailer {
    client: Client,
    config: HttpMailerConfig,
}

impl HttpMailer {
    pub fn new(config: HttpMailerConfig) -> Result<Self, MailerError> {
        if config.endpoint.is_empty() {
            return Err(MailerError::Config("mail endpoint not configured".into()));
        }
        if config.from_address.is_empty() {
            return Err(MailerError::Config("from address not configured".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(MailerError::Http)?;
        Ok(Self { client, config })
    }

    fn backoff() -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(100))
            .with_max_delay(Duration::from_secs(2))
            .with_max_times(3)
            .with_jitter()
    }

    fn is_retryable(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
    }

    async fn post_message(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError> {
        let payload = json!({
            "from": self.config.from_address,
            "to": email.to,
            "subject": email.subject,
            "text": email.body,
            "metadata": { "contact_id": email.contact_id.to_string() },
        });

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let body: SendResponse = response.json().await.unwrap_or(SendResponse { id: None });
            debug!(to = %email.to, provider_id = ?body.id, "message accepted");
            return Ok(DeliveryReceipt {
                provider_message_id: body.id,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let detail = format!("HTTP {} - {}", status, body.chars().take(200).collect::<String>());
        if Self::is_retryable_status(status) {
            Err(MailerError::Unavailable(detail))
        } else {
            Err(MailerError::Rejected(detail))
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError> {
        (|| async { self.post_message(email).await })
            .retry(Self::backoff())
            .when(|e| {
                matches!(e, MailerError::Http(err) if Self::is_retryable(err))
                    || matches!(e, MailerError::Unavailable(_))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = HttpMailerConfig::default()
            .with_endpoint("https://mail.example/v1/send".to_string())
            .with_api_key("key".to_string())
            .with_from_address("team@pledgeline.example".to_string())
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.endpoint, "https://mail.example/v1/send");
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_endpoint_fails() {
        let result = HttpMailer::new(HttpMailerConfig::default());
        assert!(matches!(result, Err(MailerError::Config(_))));
    }

    #[test]
    fn test_retryable_statuses() {
        use reqwest::StatusCode;
        assert!(HttpMailer::is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(HttpMailer::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(!HttpMailer::is_retryable_status(StatusCode::BAD_REQUEST));
        assert!(!HttpMailer::is_retryable_status(StatusCode::UNPROCESSABLE_ENTITY));
    }
}
