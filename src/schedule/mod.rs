//! Outreach phase schedule calculation.
//!
//! A campaign's drip schedule is a fixed table of phases, each offset a
//! whole number of calendar days from the campaign start date and anchored
//! to a fixed local send time in the organization's time zone. Offsets are
//! applied in calendar days rather than 24h multiples so the local send
//! time stays stable across DST transitions.

mod state;

pub use state::{classify, SweepState};

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Local wall-clock hour at which scheduled phases fire.
pub const SEND_HOUR: u32 = 18;
/// Local wall-clock minute at which scheduled phases fire.
pub const SEND_MINUTE: u32 = 30;

/// One step in the fixed outreach sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKey {
    Week1a,
    Week1b,
    Week2,
    Week3,
    Week4,
    Week5,
}

impl PhaseKey {
    /// The fixed phase ordering. Cursor advancement is defined over this
    /// sequence and never moves backward through it.
    pub const ORDER: [PhaseKey; 6] = [
        PhaseKey::Week1a,
        PhaseKey::Week1b,
        PhaseKey::Week2,
        PhaseKey::Week3,
        PhaseKey::Week4,
        PhaseKey::Week5,
    ];

    /// Offset from the campaign start date, in whole calendar days.
    pub fn offset_days(self) -> u64 {
        match self {
            PhaseKey::Week1a => 0,
            PhaseKey::Week1b => 3,
            PhaseKey::Week2 => 7,
            PhaseKey::Week3 => 14,
            PhaseKey::Week4 => 21,
            PhaseKey::Week5 => 28,
        }
    }

    /// Position in the fixed ordering.
    pub fn index(self) -> usize {
        match self {
            PhaseKey::Week1a => 0,
            PhaseKey::Week1b => 1,
            PhaseKey::Week2 => 2,
            PhaseKey::Week3 => 3,
            PhaseKey::Week4 => 4,
            PhaseKey::Week5 => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PhaseKey::Week1a => "week1a",
            PhaseKey::Week1b => "week1b",
            PhaseKey::Week2 => "week2",
            PhaseKey::Week3 => "week3",
            PhaseKey::Week4 => "week4",
            PhaseKey::Week5 => "week5",
        }
    }

    /// Parse a stored phase key.
    pub fn parse(s: &str) -> Option<PhaseKey> {
        PhaseKey::ORDER.into_iter().find(|k| k.as_str() == s)
    }
}

impl std::fmt::Display for PhaseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase label carried on an audit record: either a scheduled drip phase or
/// a caller-initiated manual send, which bypasses the phase cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendPhase {
    Drip(PhaseKey),
    Manual,
}

impl SendPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            SendPhase::Drip(key) => key.as_str(),
            SendPhase::Manual => "manual",
        }
    }
}

impl std::fmt::Display for SendPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phase together with its absolute due instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseSlot {
    pub key: PhaseKey,
    pub due_at: DateTime<Utc>,
}

/// Compute the full ordered schedule for a campaign start date.
///
/// Each phase lands on `start + offset` calendar days, re-anchored to
/// 18:30 local wall-clock time in `tz` and converted back to an absolute
/// instant. The result is strictly increasing. Dates that cannot be
/// represented (calendar overflow, pathological zone data) are skipped
/// rather than surfaced; a phase that cannot fire simply never becomes due.
pub fn phase_schedule(start: NaiveDate, tz: Tz) -> Vec<PhaseSlot> {
    PhaseKey::ORDER
        .into_iter()
        .filter_map(|key| {
            let date = start.checked_add_days(Days::new(key.offset_days()))?;
            let local = date.and_hms_opt(SEND_HOUR, SEND_MINUTE, 0)?;
            let due_at = local_to_instant(tz, local)?;
            Some(PhaseSlot { key, due_at })
        })
        .collect()
}

/// Schedule for a campaign that may not have a usable start date or zone.
///
/// Returns an empty schedule when either is missing or unparseable; callers
/// treat "no schedule" as "nothing is ever due".
pub fn schedule_for(start: Option<NaiveDate>, zone: &str) -> Vec<PhaseSlot> {
    let Some(start) = start else {
        return Vec::new();
    };
    let Ok(tz) = zone.parse::<Tz>() else {
        return Vec::new();
    };
    phase_schedule(start, tz)
}

/// Resolve a local wall-clock time in `tz` to a UTC instant.
///
/// Ambiguous times (fall-back transition) take the earlier mapping. A
/// wall-clock erased by a spring-forward gap rolls ahead one hour to the
/// first representable instant.
fn local_to_instant(tz: Tz, local: NaiveDateTime) -> Option<DateTime<Utc>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => {
            let shifted = local.checked_add_signed(Duration::hours(1))?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc))
        }
    }
}
