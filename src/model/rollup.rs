//! Daily rollup document.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Materialized per-org daily sum over paid ledger entries.
///
/// Write-once by (org, date): the rollup job checks for an existing
/// document before writing, so re-runs are no-ops.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyRollup {
    pub org_id: Uuid,
    /// Local date in the organization's time zone.
    pub date: NaiveDate,
    pub raised_minor: i64,
    pub donation_count: i64,
    pub created_at: DateTime<Utc>,
}

impl DailyRollup {
    /// Storage key, unique per (org, date).
    pub fn key(org_id: Uuid, date: NaiveDate) -> String {
        format!("{}:{}", org_id, date)
    }
}
