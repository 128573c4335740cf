//! Daily rollup materialization.

use std::sync::Arc;

use chrono::{DateTime, Days, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::info;
use uuid::Uuid;

use crate::interfaces::{LedgerStore, OutreachStore, StorageError};
use crate::model::DailyRollup;

#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    #[error("unknown org {0}")]
    UnknownOrg(Uuid),

    #[error("org has unparseable time zone {0:?}")]
    BadZone(String),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug)]
pub enum RollupOutcome {
    Created(DailyRollup),
    /// A rollup for this (org, day) already exists; re-runs are no-ops.
    AlreadyExists,
}

/// Materialize one org's rollup for one local day.
///
/// Day boundaries are taken in the organization's time zone so the rollup
/// matches what the org sees on its dashboard. The existence check plus the
/// write-once insert make the job safe to re-run and safe to race.
pub async fn run_daily_rollup(
    outreach: &Arc<dyn OutreachStore>,
    ledger: &Arc<dyn LedgerStore>,
    org_id: Uuid,
    date: NaiveDate,
) -> Result<RollupOutcome, RollupError> {
    if ledger.rollup(org_id, date).await?.is_some() {
        return Ok(RollupOutcome::AlreadyExists);
    }

    let org = outreach
        .organization(org_id)
        .await?
        .ok_or(RollupError::UnknownOrg(org_id))?;
    let tz: Tz = org
        .time_zone
        .parse()
        .map_err(|_| RollupError::BadZone(org.time_zone.clone()))?;

    let from = day_start(tz, date).ok_or_else(|| RollupError::BadZone(org.time_zone.clone()))?;
    let to = date
        .checked_add_days(Days::new(1))
        .and_then(|next| day_start(tz, next))
        .ok_or_else(|| RollupError::BadZone(org.time_zone.clone()))?;

    let entries = ledger.paid_in_range(org_id, from, to).await?;
    let rollup = DailyRollup {
        org_id,
        date,
        raised_minor: entries.iter().map(|e| e.amount_minor).sum(),
        donation_count: entries.len() as i64,
        created_at: Utc::now(),
    };

    match ledger.insert_rollup(rollup.clone()).await {
        Ok(()) => {
            info!(
                %org_id,
                %date,
                raised_minor = rollup.raised_minor,
                donation_count = rollup.donation_count,
                "daily rollup created"
            );
            Ok(RollupOutcome::Created(rollup))
        }
        // Concurrent run won the race; same idempotent outcome.
        Err(e) if e.is_already_exists() => Ok(RollupOutcome::AlreadyExists),
        Err(e) => Err(e.into()),
    }
}

fn day_start(tz: Tz, date: NaiveDate) -> Option<DateTime<Utc>> {
    let local = date.and_hms_opt(0, 0, 0)?;
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}
