//! HTTP client for the payment processor's session listing API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::interfaces::{GatewayError, GatewaySession, PaymentGateway};

#[derive(Debug, Clone)]
pub struct HttpPaymentGatewayConfig {
    /// API base, e.g. "https://api.processor.example".
    pub api_base: String,
    /// Secret key for the org's processor account.
    pub api_key: String,
    pub timeout: Duration,
    /// Sessions fetched per page.
    pub page_size: usize,
}

impl Default for HttpPaymentGatewayConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            api_key: String::new(),
            timeout: Duration::from_secs(30),
            page_size: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SessionPage {
    data: Vec<SessionRecord>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Debug, Deserialize)]
struct SessionRecord {
    id: String,
    amount_total: i64,
    currency: String,
    payment_status: String,
    /// Unix seconds.
    created: i64,
}

/// Session listing over the processor's HTTP API, paginated with
/// `starting_after` cursors.
pub struct HttpPaymentGateway {
    client: Client,
    config: HttpPaymentGatewayConfig,
}

impl HttpPaymentGateway {
    pub fn new(config: HttpPaymentGatewayConfig) -> Result<Self, GatewayError> {
        if config.api_base.is_empty() {
            return Err(GatewayError::Config("gateway api_base not configured".into()));
        }
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(GatewayError::Http)?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn list_paid_sessions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GatewaySession>, GatewayError> {
        let url = format!("{}/v1/checkout/sessions", self.config.api_base);
        let mut sessions = Vec::new();
        let mut starting_after: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .bearer_auth(&self.config.api_key)
                .query(&[
                    ("payment_status", "paid".to_string()),
                    ("created_gte", from.timestamp().to_string()),
                    ("created_lt", to.timestamp().to_string()),
                    ("limit", self.config.page_size.to_string()),
                ]);
            if let Some(cursor) = &starting_after {
                request = request.query(&[("starting_after", cursor.as_str())]);
            }

            let response = request.send().await?;
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(GatewayError::Unavailable(format!(
                    "HTTP {} - {}",
                    status,
                    body.chars().take(200).collect::<String>()
                )));
            }

            let page: SessionPage = response
                .json()
                .await
                .map_err(|e| GatewayError::Malformed(e.to_string()))?;

            debug!(count = page.data.len(), has_more = page.has_more, "gateway page fetched");

            starting_after = page.data.last().map(|s| s.id.clone());
            for record in page.data {
                let created_at = DateTime::from_timestamp(record.created, 0)
                    .ok_or_else(|| {
                        GatewayError::Malformed(format!("bad created timestamp on {}", record.id))
                    })?;
                sessions.push(GatewaySession {
                    id: record.id,
                    amount_minor: record.amount_total,
                    currency: record.currency,
                    status: record.payment_status,
                    created_at,
                });
            }

            if !page.has_more || starting_after.is_none() {
                break;
            }
        }

        Ok(sessions)
    }
}
