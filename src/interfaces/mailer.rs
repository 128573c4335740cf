//! Mail delivery interface.

use async_trait::async_trait;
use uuid::Uuid;

/// Result type for mailer operations.
pub type Result<T> = std::result::Result<T, MailerError>;

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    /// The provider rejected this recipient (bad address, suppressed).
    #[error("recipient rejected: {0}")]
    Rejected(String),

    /// Transient provider failure; the next sweep retries naturally.
    #[error("mail provider unavailable: {0}")]
    Unavailable(String),

    #[error("send timed out")]
    Timeout,

    #[error("mailer misconfigured: {0}")]
    Config(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

/// One message addressed to one recipient.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    /// Carried as opaque metadata so delivery-event callbacks can be traced
    /// back to the contact.
    pub contact_id: Uuid,
    pub subject: String,
    pub body: String,
}

/// Provider acknowledgement for a dispatched message.
#[derive(Debug, Clone, Default)]
pub struct DeliveryReceipt {
    pub provider_message_id: Option<String>,
}

/// Interface to the mail delivery provider.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt>;
}
