//! Payment gateway read interface, used by reconciliation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),

    #[error("malformed gateway response: {0}")]
    Malformed(String),

    #[error("gateway misconfigured: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A checkout session as the external processor reports it.
#[derive(Debug, Clone)]
pub struct GatewaySession {
    pub id: String,
    pub amount_minor: i64,
    pub currency: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Read-only view of the external payment processor. Reconciliation lists
/// paid sessions and diffs them against the ledger; it never mutates
/// either side.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn list_paid_sessions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GatewaySession>>;
}
