//! Campaign document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A fundraising campaign.
///
/// The start date anchors the phase schedule and is treated as immutable
/// once phases have begun firing. Aggregates are mutated only inside the
/// ledger transaction that marks a donation paid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    /// Anchor for the phase schedule; no schedule exists without it.
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Hosted checkout landing page for this campaign.
    pub donate_url: String,
    /// Total confirmed, in minor currency units.
    pub raised_minor: i64,
    pub donor_count: i64,
}

impl Campaign {
    /// Whether the campaign has ended as of the given local date.
    pub fn ended_by(&self, today: NaiveDate) -> bool {
        matches!(self.end_date, Some(end) if end < today)
    }
}
