//! Drip scheduler: the periodic outreach sweep.
//!
//! Runs on a fixed interval, classifies every auto-send athlete against the
//! phase schedule, and fires the due phase through the send engine. The
//! phase cursor advances only after a send that reached at least one
//! recipient, so an overlapping or re-run sweep cannot double-send and a
//! transient provider outage delays a phase instead of skipping it.
//!
//! Per-athlete failures are caught, logged, and the sweep moves on; one
//! athlete can never abort the batch.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use crate::interfaces::{CursorAdvance, Mailer, OutreachStore, StorageError};
use crate::model::{Athlete, Campaign, Organization};
use crate::outreach::engine::{SendEngine, SendEngineConfig, SendError, SendRequest};
use crate::outreach::filter;
use crate::render::{self, RenderContext, DEFAULT_SUBJECT, DEFAULT_TEMPLATE};
use crate::schedule::{self, PhaseSlot, SendPhase, SweepState};

/// Result type for sweep operations.
pub type Result<T> = std::result::Result<T, SweepError>;

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// What one sweep pass did for one athlete.
#[derive(Debug)]
pub enum AthleteOutcome {
    /// Not processed this pass (org disabled, campaign ended, no schedule,
    /// no eligible recipients, ...). The reason is logged, nothing changed.
    Skipped(&'static str),
    /// A future phase exists; `next_phase`/`next_send_at` were persisted.
    Waiting(PhaseSlot),
    /// All phases are behind the cursor; the next fields were cleared.
    Exhausted,
    /// A phase fired and the cursor advanced.
    Fired {
        phase: PhaseSlot,
        sent: usize,
        failed: usize,
    },
}

/// Counters for one full sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub athletes: usize,
    pub fired: usize,
    pub waiting: usize,
    pub exhausted: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct DripSchedulerConfig {
    /// Sweep cadence. Only needs to be finer than the phase granularity;
    /// the default matches the original 15 minute trigger.
    pub sweep_interval: Duration,
    pub engine: SendEngineConfig,
}

impl Default for DripSchedulerConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(900),
            engine: SendEngineConfig::default(),
        }
    }
}

/// Periodic outreach sweep over all auto-send athletes.
pub struct DripScheduler {
    store: Arc<dyn OutreachStore>,
    engine: SendEngine,
    config: DripSchedulerConfig,
}

impl DripScheduler {
    pub fn new(
        store: Arc<dyn OutreachStore>,
        mailer: Arc<dyn Mailer>,
        config: DripSchedulerConfig,
    ) -> Self {
        let engine = SendEngine::new(Arc::clone(&store), mailer, config.engine.clone());
        Self {
            store,
            engine,
            config,
        }
    }

    /// Run the sweep loop indefinitely.
    pub async fn run(&self) {
        info!(
            interval = ?self.config.sweep_interval,
            "starting drip scheduler"
        );
        let mut ticker = interval(self.config.sweep_interval);
        loop {
            ticker.tick().await;
            let stats = self.sweep_once(Utc::now()).await;
            info!(
                athletes = stats.athletes,
                fired = stats.fired,
                waiting = stats.waiting,
                exhausted = stats.exhausted,
                skipped = stats.skipped,
                failed = stats.failed,
                "sweep complete"
            );
        }
    }

    /// One pass over every auto-send athlete.
    ///
    /// Athletes are processed sequentially to bound load; the fan-out
    /// inside each athlete's batch is where concurrency lives.
    pub async fn sweep_once(&self, now: DateTime<Utc>) -> SweepStats {
        let mut stats = SweepStats::default();

        let athletes = match self.store.auto_send_athletes().await {
            Ok(athletes) => athletes,
            Err(e) => {
                error!(error = %e, "failed to list athletes, skipping sweep");
                return stats;
            }
        };

        stats.athletes = athletes.len();
        for athlete in athletes {
            match self.sweep_athlete(&athlete, now).await {
                Ok(AthleteOutcome::Fired {
                    phase,
                    sent,
                    failed,
                }) => {
                    stats.fired += 1;
                    info!(
                        athlete_id = %athlete.id,
                        phase = %phase.key,
                        sent,
                        failed,
                        "phase fired"
                    );
                }
                Ok(AthleteOutcome::Waiting(next)) => {
                    stats.waiting += 1;
                    debug!(
                        athlete_id = %athlete.id,
                        next_phase = %next.key,
                        next_send_at = %next.due_at,
                        "waiting"
                    );
                }
                Ok(AthleteOutcome::Exhausted) => stats.exhausted += 1,
                Ok(AthleteOutcome::Skipped(reason)) => {
                    stats.skipped += 1;
                    debug!(athlete_id = %athlete.id, reason, "athlete skipped");
                }
                Err(e) => {
                    // Cursor untouched; the same phase stays eligible on the
                    // next sweep.
                    stats.failed += 1;
                    warn!(athlete_id = %athlete.id, error = %e, "athlete sweep failed");
                }
            }
        }

        stats
    }

    async fn sweep_athlete(&self, athlete: &Athlete, now: DateTime<Utc>) -> Result<AthleteOutcome> {
        if !athlete.outreach.auto_send {
            return Ok(AthleteOutcome::Skipped("auto-send disabled"));
        }

        // Org config is read fresh every pass rather than cached: another
        // process may have flipped the kill switch or edited templates.
        let Some(org) = self.store.organization(athlete.org_id).await? else {
            return Ok(AthleteOutcome::Skipped("unknown org"));
        };
        if !org.outreach_enabled {
            return Ok(AthleteOutcome::Skipped("org outreach disabled"));
        }
        debug!(org_id = %org.id, config_version = org.config_version, "org config loaded");

        let Some(campaign) = self.store.campaign(athlete.campaign_id).await? else {
            return Ok(AthleteOutcome::Skipped("unknown campaign"));
        };
        if let Ok(tz) = org.time_zone.parse::<chrono_tz::Tz>() {
            if campaign.ended_by(now.with_timezone(&tz).date_naive()) {
                return Ok(AthleteOutcome::Skipped("campaign ended"));
            }
        }

        let sched = schedule::schedule_for(campaign.start_date, &org.time_zone);
        match schedule::classify(&sched, athlete.outreach.last_phase_sent, now) {
            SweepState::NoSchedule => Ok(AthleteOutcome::Skipped("no schedule")),
            SweepState::Waiting { next } => {
                self.store
                    .update_next_phase(athlete.id, Some(next.key), Some(next.due_at))
                    .await?;
                Ok(AthleteOutcome::Waiting(next))
            }
            SweepState::Exhausted => {
                self.store.update_next_phase(athlete.id, None, None).await?;
                Ok(AthleteOutcome::Exhausted)
            }
            SweepState::Due { phase } => self.fire_phase(athlete, &org, &campaign, &sched, phase).await,
        }
    }

    async fn fire_phase(
        &self,
        athlete: &Athlete,
        org: &Organization,
        campaign: &Campaign,
        sched: &[PhaseSlot],
        phase: PhaseSlot,
    ) -> Result<AthleteOutcome> {
        let contacts = self.store.contacts_for_athlete(athlete.id).await?;
        let recipients = filter::scheduled_recipients(&contacts);

        let template = athlete
            .custom_template
            .as_deref()
            .or(org.template_for(phase.key))
            .unwrap_or(DEFAULT_TEMPLATE);
        let subject_template = org.subject_for(phase.key).unwrap_or(DEFAULT_SUBJECT);

        let ctx = RenderContext {
            athlete_name: Some(athlete.name.clone()),
            team_name: Some(org.name.clone()),
            campaign_name: Some(campaign.name.clone()),
            donate_url: Some(campaign.donate_url.clone()),
            personal_message: athlete.personal_message.clone(),
        };

        let next = sched
            .iter()
            .find(|slot| slot.key.index() > phase.key.index());
        let request = SendRequest {
            org_id: athlete.org_id,
            athlete_id: athlete.id,
            phase: SendPhase::Drip(phase.key),
            subject: render::render_subject(subject_template, &ctx),
            body: render::render_body(template, &ctx),
            recipients,
            cursor: Some(CursorAdvance {
                last_phase_sent: phase.key,
                next_phase: next.map(|s| s.key),
                next_send_at: next.map(|s| s.due_at),
            }),
        };

        match self.engine.dispatch(request).await {
            Ok(report) => Ok(AthleteOutcome::Fired {
                phase,
                sent: report.sent.len(),
                failed: report.failed.len(),
            }),
            // Empty contact list (or fully suppressed): the cursor stays
            // put and the phase is retried next sweep, waiting out a
            // still-running import rather than skipping the phase.
            Err(SendError::NoValidRecipients) => {
                Ok(AthleteOutcome::Skipped("no eligible recipients"))
            }
            Err(e) => Err(e.into()),
        }
    }
}
