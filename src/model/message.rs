//! Outreach audit trail and delivery-event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::SendPhase;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendOutcome {
    Sent,
    Failed { reason: String },
}

/// Append-only record of one attempted send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutreachMessage {
    pub id: Uuid,
    pub org_id: Uuid,
    pub athlete_id: Uuid,
    pub contact_id: Uuid,
    pub recipient: String,
    pub phase: SendPhase,
    pub outcome: SendOutcome,
    /// Tracking id returned by the mail provider, echoed back on
    /// delivery-event callbacks.
    pub provider_message_id: Option<String>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryEventKind {
    Delivered,
    Bounced,
    Complained,
}

impl DeliveryEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryEventKind::Delivered => "delivered",
            DeliveryEventKind::Bounced => "bounced",
            DeliveryEventKind::Complained => "complained",
        }
    }
}

/// Append-only log row for a provider delivery-status callback.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryEvent {
    pub id: Uuid,
    pub contact_id: Uuid,
    pub email: String,
    pub kind: DeliveryEventKind,
    pub provider_event_id: Option<String>,
    pub occurred_at: DateTime<Utc>,
}
