//! Athlete document and outreach cursor.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::PhaseKey;

/// The scheduler's only persisted cursor.
///
/// `last_phase_sent` advances forward through the fixed phase ordering,
/// never backward. `next_phase`/`next_send_at` are observability fields
/// recomputed every sweep; they carry no authority of their own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutreachState {
    pub auto_send: bool,
    pub last_phase_sent: Option<PhaseKey>,
    pub next_phase: Option<PhaseKey>,
    pub next_send_at: Option<DateTime<Utc>>,
}

/// An athlete soliciting donors inside a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Athlete {
    pub id: Uuid,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub name: String,
    /// Athlete-authored template that takes precedence over every org
    /// template when present.
    pub custom_template: Option<String>,
    /// Personal appeal substituted into the personal-message token.
    pub personal_message: Option<String>,
    pub raised_minor: i64,
    pub donor_count: i64,
    pub outreach: OutreachState,
}
