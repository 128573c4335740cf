//! Sweep-state classification.
//!
//! Reduces an athlete's schedule, phase cursor, and the current instant to
//! one of four states the sweep acts on. Making the state explicit keeps
//! the cursor invariant (forward only, one phase per sweep) checkable in
//! one place instead of scattered through the sweep loop.

use chrono::{DateTime, Utc};

use super::{PhaseKey, PhaseSlot};

/// What the sweep should do for one athlete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    /// No usable schedule; nothing is ever due.
    NoSchedule,
    /// A future phase exists but none is due yet.
    Waiting { next: PhaseSlot },
    /// A phase is due now.
    Due { phase: PhaseSlot },
    /// Every phase is behind the cursor; the drip sequence has finished.
    Exhausted,
}

/// Classify an athlete's position in the schedule.
///
/// Only phases strictly after `last_sent` are considered. Of those, the
/// latest one already due fires; earlier overdue phases have had their
/// windows fully elapse and are skipped rather than fired late. At most one
/// phase is ever reported due, so a sweep can never double-fire.
pub fn classify(
    schedule: &[PhaseSlot],
    last_sent: Option<PhaseKey>,
    now: DateTime<Utc>,
) -> SweepState {
    if schedule.is_empty() {
        return SweepState::NoSchedule;
    }

    let cursor = last_sent.map(|k| k.index());
    let remaining: Vec<&PhaseSlot> = schedule
        .iter()
        .filter(|slot| match cursor {
            Some(idx) => slot.key.index() > idx,
            None => true,
        })
        .collect();

    if remaining.is_empty() {
        return SweepState::Exhausted;
    }

    let due = remaining.iter().rev().find(|slot| slot.due_at <= now);
    match due {
        Some(slot) => SweepState::Due { phase: **slot },
        None => SweepState::Waiting {
            next: *remaining[0],
        },
    }
}
