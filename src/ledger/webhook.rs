//! Payment confirmation payloads.
//!
//! Shape follows the processor's checkout-session events: an event envelope
//! wrapping the session object, with our routing ids carried in the session
//! metadata the checkout page was created with.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::interfaces::PaymentConfirmation;
use crate::ledger::signature::SignatureError;

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    /// Rejected at the boundary; no state was touched.
    #[error("invalid signature: {0}")]
    Signature(#[from] SignatureError),

    /// Body parsed but required fields were missing or unusable.
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    Storage(#[from] crate::interfaces::StorageError),
}

/// Event types the ledger acts on.
pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";

/// Session `payment_status` value that confirms money moved.
pub const PAYMENT_STATUS_PAID: &str = "paid";

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: PaymentEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentEventData {
    pub object: CheckoutSession,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// External session id; becomes the ledger idempotency key.
    pub id: String,
    pub amount_total: i64,
    pub currency: String,
    pub payment_status: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    /// Donor-entered public comment, if the checkout collected one.
    pub comment: Option<String>,
    pub metadata: SessionMetadata,
}

/// Routing ids stamped onto the checkout session at creation time.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionMetadata {
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub athlete_id: Uuid,
}

impl PaymentEvent {
    /// Parse a verified raw body.
    pub fn from_body(body: &[u8]) -> Result<Self, WebhookError> {
        serde_json::from_slice(body).map_err(|e| WebhookError::Malformed(e.to_string()))
    }

    /// Whether this event type/status combination confirms a payment.
    /// Everything else is acknowledged and dropped.
    pub fn confirms_payment(&self) -> bool {
        self.event_type == EVENT_CHECKOUT_COMPLETED
            && self.data.object.payment_status == PAYMENT_STATUS_PAID
    }

    /// Convert into the ledger's write command.
    pub fn into_confirmation(self, now: DateTime<Utc>) -> Result<PaymentConfirmation, WebhookError> {
        let session = self.data.object;
        if session.id.is_empty() {
            return Err(WebhookError::Malformed("empty session id".into()));
        }
        if session.amount_total <= 0 {
            return Err(WebhookError::Malformed(format!(
                "non-positive amount {}",
                session.amount_total
            )));
        }
        let donor_email = session
            .customer_email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| WebhookError::Malformed("missing customer email".into()))?;

        Ok(PaymentConfirmation {
            session_id: session.id,
            source_event_id: self.id,
            source_event_type: self.event_type,
            org_id: session.metadata.org_id,
            campaign_id: session.metadata.campaign_id,
            athlete_id: session.metadata.athlete_id,
            amount_minor: session.amount_total,
            currency: session.currency,
            donor_email,
            donor_name: session.customer_name,
            comment: session.comment.filter(|c| !c.trim().is_empty()),
            confirmed_at: now,
        })
    }
}
