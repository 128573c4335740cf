//! Batch send engine.
//!
//! Dispatches one rendered message to a filtered recipient set with bounded
//! concurrency, collects every recipient's outcome independently, and ends
//! with a single atomic audit-trail commit.
//!
//! ## At-least-once boundary
//!
//! Dispatch happens before the commit. If the process dies in between, the
//! next sweep re-dispatches the same phase and already-delivered recipients
//! receive the message again. Duplicate email is the accepted cost here;
//! duplicate money is prevented separately by the payment ledger's
//! idempotency key. Failed recipients are logged, never retried by this
//! component.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::interfaces::{
    CursorAdvance, Mailer, MailerError, OutboundEmail, OutreachStore, SendBatch, SentRecipient,
    StorageError,
};
use crate::model::Contact;
use crate::outreach::filter;
use crate::schedule::SendPhase;

/// Result type for send operations.
pub type Result<T> = std::result::Result<T, SendError>;

#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// Nothing to send after filtering. Surfaced to the caller, never
    /// retried automatically.
    #[error("no valid recipients")]
    NoValidRecipients,

    /// Every recipient failed; nothing was committed and the phase cursor
    /// must not advance.
    #[error("all {0} sends failed")]
    AllFailed(usize),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// One failed recipient in an otherwise successful batch.
#[derive(Debug, Clone)]
pub struct SendFailure {
    pub email: String,
    pub reason: String,
}

/// Outcome of a batch: which contacts were dispatched and which failed.
/// Partial failure is not an error.
#[derive(Debug, Default)]
pub struct SendReport {
    pub sent: Vec<SentRecipient>,
    pub failed: Vec<SendFailure>,
}

/// A fully rendered batch ready for dispatch.
#[derive(Debug)]
pub struct SendRequest {
    pub org_id: uuid::Uuid,
    pub athlete_id: uuid::Uuid,
    pub phase: SendPhase,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<Contact>,
    /// Cursor advance committed with the batch; `None` for manual sends.
    pub cursor: Option<CursorAdvance>,
}

#[derive(Debug, Clone)]
pub struct SendEngineConfig {
    /// Concurrent dispatch ceiling.
    pub concurrency: usize,
    /// Per-recipient delivery timeout.
    pub send_timeout: Duration,
    /// Overall wall-clock budget for one batch. Recipients not dispatched
    /// before it elapses are reported failed rather than blocking forever.
    pub budget: Duration,
}

impl Default for SendEngineConfig {
    fn default() -> Self {
        Self {
            concurrency: 8,
            send_timeout: Duration::from_secs(10),
            budget: Duration::from_secs(120),
        }
    }
}

/// Batch send engine over a [`Mailer`] and an [`OutreachStore`].
pub struct SendEngine {
    store: Arc<dyn OutreachStore>,
    mailer: Arc<dyn Mailer>,
    config: SendEngineConfig,
}

impl SendEngine {
    pub fn new(
        store: Arc<dyn OutreachStore>,
        mailer: Arc<dyn Mailer>,
        config: SendEngineConfig,
    ) -> Self {
        Self {
            store,
            mailer,
            config,
        }
    }

    /// Dispatch a batch and commit the audit trail.
    ///
    /// Every recipient's outcome is collected; one failure never aborts the
    /// others. On any success the batch commit covers contact flips, audit
    /// records, and the optional cursor advance in one write.
    pub async fn dispatch(&self, request: SendRequest) -> Result<SendReport> {
        // The exclusion set is enforced here as well as in the caller's
        // filter pass; this is the last gate before dispatch.
        let recipients = match request.phase {
            SendPhase::Drip(_) => filter::scheduled_recipients(&request.recipients),
            SendPhase::Manual => filter::manual_recipients(&request.recipients),
        };

        if recipients.is_empty() {
            return Err(SendError::NoValidRecipients);
        }

        let total = recipients.len();
        let deadline = Instant::now() + self.config.budget;

        let outcomes: Vec<(Contact, std::result::Result<_, MailerError>)> =
            stream::iter(recipients)
                .map(|contact| {
                    let mailer = Arc::clone(&self.mailer);
                    let subject = request.subject.clone();
                    let body = request.body.clone();
                    let send_timeout = self.config.send_timeout;
                    async move {
                        if Instant::now() >= deadline {
                            return (contact, Err(MailerError::Timeout));
                        }
                        let email = OutboundEmail {
                            to: contact.email.clone(),
                            contact_id: contact.id,
                            subject,
                            body,
                        };
                        let result =
                            match tokio::time::timeout(send_timeout, mailer.send(&email)).await {
                                Ok(result) => result,
                                Err(_) => Err(MailerError::Timeout),
                            };
                        (contact, result)
                    }
                })
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;

        let mut report = SendReport::default();
        for (contact, outcome) in outcomes {
            match outcome {
                Ok(receipt) => report.sent.push(SentRecipient {
                    contact_id: contact.id,
                    email: contact.email,
                    provider_message_id: receipt.provider_message_id,
                }),
                Err(e) => {
                    debug!(
                        recipient = %contact.email,
                        error = %e,
                        "recipient dispatch failed"
                    );
                    report.failed.push(SendFailure {
                        email: contact.email,
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.sent.is_empty() {
            return Err(SendError::AllFailed(total));
        }

        if !report.failed.is_empty() {
            warn!(
                athlete_id = %request.athlete_id,
                phase = %request.phase,
                sent = report.sent.len(),
                failed = report.failed.len(),
                "partial send failure"
            );
        }

        let batch = SendBatch {
            org_id: request.org_id,
            athlete_id: request.athlete_id,
            phase: request.phase,
            sent: report.sent.clone(),
            sent_at: Utc::now(),
            cursor: request.cursor,
        };
        self.store.commit_send_batch(batch).await?;

        Ok(report)
    }
}
