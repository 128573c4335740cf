//! Ledger entry and its at-most-once satellite records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    Pending,
    Paid,
}

impl DonationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            DonationStatus::Pending => "pending",
            DonationStatus::Paid => "paid",
        }
    }

    pub fn parse(s: &str) -> Option<DonationStatus> {
        match s {
            "pending" => Some(DonationStatus::Pending),
            "paid" => Some(DonationStatus::Paid),
            _ => None,
        }
    }
}

/// The authoritative record of one confirmed payment.
///
/// `id` is the external checkout-session identifier supplied by the payment
/// confirmation — never generated locally. Aggregate increments happen
/// exactly once per id: re-applying a confirmation for an id already `Paid`
/// is side-effect-free. Entries are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Donation {
    /// Idempotency key.
    pub id: String,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub athlete_id: Uuid,
    /// Minor currency units.
    pub amount_minor: i64,
    pub currency: String,
    pub status: DonationStatus,
    pub donor_email: String,
    pub donor_name: Option<String>,
    pub comment: Option<String>,
    pub source_event_id: String,
    pub source_event_type: String,
    pub paid_at: Option<DateTime<Utc>>,
}

/// Public comment shown on the campaign page. Written at most once per
/// donation; duplicate webhook deliveries hit the existence check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonorComment {
    pub donation_id: String,
    pub org_id: Uuid,
    pub athlete_id: Uuid,
    pub donor_display: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Public donor-feed entry, at most once per donation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub donation_id: String,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub athlete_id: Uuid,
    pub donor_display: String,
    pub amount_minor: i64,
    pub created_at: DateTime<Utc>,
}

/// Queued receipt message, at most once per donation. A separate mail
/// worker drains the queue and flips `sent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptJob {
    pub donation_id: String,
    pub email: String,
    pub amount_minor: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub sent: bool,
}
