//! pledgeline-jobs: one-shot ledger consumers.
//!
//! Usage:
//! - `pledgeline-jobs rollup <org_id> <date>` — materialize the daily
//!   rollup for one org and local date (YYYY-MM-DD). Idempotent; a rollup
//!   that already exists is reported and left alone.
//! - `pledgeline-jobs reconcile <org_id> <from> <to>` — diff the
//!   processor's paid sessions against the ledger over [from, to) UTC
//!   dates. Read-only.

use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use pledgeline::config::Config;
use pledgeline::gateway::{HttpPaymentGateway, HttpPaymentGatewayConfig};
use pledgeline::interfaces::{LedgerStore, OutreachStore, PaymentGateway};
use pledgeline::recon::{reconcile, run_daily_rollup, RollupOutcome};
use pledgeline::storage::MongoStore;
use pledgeline::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = std::env::args().collect();
    let usage = "usage: pledgeline-jobs rollup <org_id> <date> | reconcile <org_id> <from> <to>";

    let config = Config::load()?;
    let store = Arc::new(
        MongoStore::connect(&config.storage.uri, &config.storage.database).await?,
    );
    let outreach_store: Arc<dyn OutreachStore> = store.clone();
    let ledger_store: Arc<dyn LedgerStore> = store;

    match args.get(1).map(String::as_str) {
        Some("rollup") => {
            let org_id: Uuid = args.get(2).ok_or(usage)?.parse()?;
            let date: NaiveDate = args.get(3).ok_or(usage)?.parse()?;
            match run_daily_rollup(&outreach_store, &ledger_store, org_id, date).await? {
                RollupOutcome::Created(rollup) => info!(
                    %org_id,
                    %date,
                    raised_minor = rollup.raised_minor,
                    donation_count = rollup.donation_count,
                    "rollup created"
                ),
                RollupOutcome::AlreadyExists => {
                    info!(%org_id, %date, "rollup already exists, nothing to do")
                }
            }
        }
        Some("reconcile") => {
            let org_id: Uuid = args.get(2).ok_or(usage)?.parse()?;
            let from: NaiveDate = args.get(3).ok_or(usage)?.parse()?;
            let to: NaiveDate = args.get(4).ok_or(usage)?.parse()?;
            let from = Utc
                .from_utc_datetime(&from.and_hms_opt(0, 0, 0).ok_or("bad from date")?);
            let to = Utc.from_utc_datetime(&to.and_hms_opt(0, 0, 0).ok_or("bad to date")?);

            let gateway: Arc<dyn PaymentGateway> =
                Arc::new(HttpPaymentGateway::new(HttpPaymentGatewayConfig {
                    api_base: config.payments.api_base.clone(),
                    api_key: config.payments.api_key.clone(),
                    ..HttpPaymentGatewayConfig::default()
                })?);

            let report = reconcile(&gateway, &ledger_store, org_id, from, to).await?;
            if report.is_clean() {
                info!(%org_id, "ledger is consistent with the gateway");
            } else {
                for session in &report.missing {
                    warn!(id = %session.id, amount = session.amount_minor, "missing from ledger");
                }
                for id in &report.extra {
                    warn!(%id, "in ledger but not at gateway");
                }
                for m in &report.mismatched {
                    warn!(
                        id = %m.id,
                        gateway_amount = m.gateway_amount,
                        ledger_amount = m.ledger_amount,
                        "amount or status mismatch"
                    );
                }
            }
        }
        _ => return Err(usage.into()),
    }

    Ok(())
}
