//! Applying confirmations to the ledger.
//!
//! The financial write — entry, aggregates, contact flip — is one store
//! transaction keyed by the session id. The public side effects that follow
//! (donor comment, feed item, receipt) are at-most-once by the same key and
//! deliberately isolated: a failure there is logged and swallowed, never
//! allowed to undo or fail the money.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::interfaces::{ApplyOutcome, LedgerStore, PaymentConfirmation};
use crate::model::{Donation, DonorComment, FeedItem, ReceiptJob};

use super::webhook::{PaymentEvent, WebhookError};

/// What processing one delivery amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    /// First application: ledger entry written, aggregates incremented.
    Applied,
    /// Duplicate delivery; the idempotency check short-circuited.
    AlreadyPaid,
    /// Event acknowledged but not a payment confirmation.
    Ignored,
}

/// Ledger-side webhook processing.
pub struct PaymentLedger {
    store: Arc<dyn LedgerStore>,
}

impl PaymentLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Process a verified, parsed event.
    pub async fn process_event(
        &self,
        event: PaymentEvent,
        now: DateTime<Utc>,
    ) -> Result<WebhookOutcome, WebhookError> {
        if !event.confirms_payment() {
            debug!(event_id = %event.id, event_type = %event.event_type, "event ignored");
            return Ok(WebhookOutcome::Ignored);
        }
        let confirmation = event.into_confirmation(now)?;
        self.apply(&confirmation).await
    }

    /// Apply one confirmation.
    pub async fn apply(
        &self,
        confirmation: &PaymentConfirmation,
    ) -> Result<WebhookOutcome, WebhookError> {
        match self.store.apply_paid(confirmation).await? {
            ApplyOutcome::AlreadyPaid => {
                // Exactly-once: the first delivery did all the work,
                // including the post-steps below.
                debug!(session_id = %confirmation.session_id, "duplicate confirmation, no-op");
                Ok(WebhookOutcome::AlreadyPaid)
            }
            ApplyOutcome::Applied(donation) => {
                info!(
                    session_id = %donation.id,
                    athlete_id = %donation.athlete_id,
                    amount_minor = donation.amount_minor,
                    "donation recorded"
                );
                self.post_steps(&donation).await;
                Ok(WebhookOutcome::Applied)
            }
        }
    }

    /// Best-effort public side effects, at most once per donation id.
    async fn post_steps(&self, donation: &Donation) {
        let now = Utc::now();
        let donor_display = donation
            .donor_name
            .clone()
            .unwrap_or_else(|| "Anonymous".to_string());

        if let Some(body) = donation.comment.clone() {
            let result = self
                .store
                .insert_comment(DonorComment {
                    donation_id: donation.id.clone(),
                    org_id: donation.org_id,
                    athlete_id: donation.athlete_id,
                    donor_display: donor_display.clone(),
                    body,
                    created_at: now,
                })
                .await;
            log_post_step("donor comment", &donation.id, result);
        }

        let result = self
            .store
            .insert_feed_item(FeedItem {
                donation_id: donation.id.clone(),
                org_id: donation.org_id,
                campaign_id: donation.campaign_id,
                athlete_id: donation.athlete_id,
                donor_display,
                amount_minor: donation.amount_minor,
                created_at: now,
            })
            .await;
        log_post_step("feed item", &donation.id, result);

        let result = self
            .store
            .enqueue_receipt(ReceiptJob {
                donation_id: donation.id.clone(),
                email: donation.donor_email.clone(),
                amount_minor: donation.amount_minor,
                currency: donation.currency.clone(),
                created_at: now,
                sent: false,
            })
            .await;
        log_post_step("receipt", &donation.id, result);
    }
}

fn log_post_step(
    step: &'static str,
    donation_id: &str,
    result: crate::interfaces::Result<()>,
) {
    match result {
        Ok(()) => {}
        Err(e) if e.is_already_exists() => {
            debug!(donation_id, step, "post-step already recorded");
        }
        Err(e) => {
            warn!(donation_id, step, error = %e, "post-step failed, continuing");
        }
    }
}
