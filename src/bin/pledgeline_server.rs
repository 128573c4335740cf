//! pledgeline-server: webhook endpoints + drip scheduler.
//!
//! Runs the HTTP boundary (payment confirmations, email delivery events,
//! manual sends) and, unless disabled, the periodic outreach sweep in the
//! same process.
//!
//! ## Configuration
//! - `PLEDGELINE_CONFIG`: optional path to a YAML config file
//! - `PLEDGELINE__STORAGE__URI` / `PLEDGELINE__STORAGE__DATABASE`
//! - `PLEDGELINE__PAYMENTS__WEBHOOK_SECRET`: required
//! - `PLEDGELINE__MAILER__ENDPOINT` / `__API_KEY` / `__FROM_ADDRESS`
//! - `PLEDGELINE_LOG`: tracing filter (default "info")

use std::sync::Arc;

use tracing::{error, info};

use pledgeline::config::Config;
use pledgeline::handlers::{self, AppState};
use pledgeline::interfaces::{LedgerStore, Mailer, OutreachStore};
use pledgeline::ledger::PaymentLedger;
use pledgeline::mailer::HttpMailer;
use pledgeline::outreach::DripScheduler;
use pledgeline::storage::MongoStore;
use pledgeline::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    init_tracing();

    let config = Config::load().map_err(|e| {
        error!("failed to load configuration: {}", e);
        e
    })?;

    if config.payments.webhook_secret.is_empty() {
        return Err("payments.webhook_secret must be configured".into());
    }

    info!("starting pledgeline-server");

    let store = Arc::new(
        MongoStore::connect(&config.storage.uri, &config.storage.database).await?,
    );
    let outreach_store: Arc<dyn OutreachStore> = store.clone();
    let ledger_store: Arc<dyn LedgerStore> = store;

    let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(config.mailer.to_http_config())?);
    let ledger = Arc::new(PaymentLedger::new(ledger_store));

    if config.outreach.sweep_enabled {
        let scheduler = DripScheduler::new(
            Arc::clone(&outreach_store),
            Arc::clone(&mailer),
            config.outreach.to_scheduler_config(),
        );
        tokio::spawn(async move {
            scheduler.run().await;
        });
    } else {
        info!("sweep disabled; serving endpoints only");
    }

    let state = AppState::new(
        outreach_store,
        mailer,
        ledger,
        &config.payments,
        &config.outreach,
    );
    handlers::serve(state, &config.server.host, config.server.port).await?;

    Ok(())
}
