//! Document store interface.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::model::{
    Athlete, Campaign, Contact, DailyRollup, DeliveryEvent, Donation, DonorComment, FeedItem,
    Organization, ReceiptJob,
};
use crate::schedule::{PhaseKey, SendPhase};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("not found: {kind} {id}")]
    NotFound { kind: &'static str, id: String },

    /// Unique-key conflict. This is the duplicate-idempotent-write signal:
    /// callers performing at-most-once inserts catch it and move on.
    #[error("already exists: {kind} {key}")]
    AlreadyExists { kind: &'static str, key: String },

    #[error("malformed document: {0}")]
    MalformedDocument(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

impl StorageError {
    pub fn is_already_exists(&self) -> bool {
        matches!(self, StorageError::AlreadyExists { .. })
    }
}

/// One successfully dispatched recipient inside a send batch.
#[derive(Debug, Clone)]
pub struct SentRecipient {
    pub contact_id: Uuid,
    pub email: String,
    pub provider_message_id: Option<String>,
}

/// Phase-cursor advance carried by a scheduled send batch. Manual sends
/// never carry one.
#[derive(Debug, Clone)]
pub struct CursorAdvance {
    pub last_phase_sent: PhaseKey,
    pub next_phase: Option<PhaseKey>,
    pub next_send_at: Option<DateTime<Utc>>,
}

/// The single atomic commit at the end of a batch send: contact status
/// flips, one audit record per sent contact, and the optional cursor
/// advance, applied together or not at all.
#[derive(Debug, Clone)]
pub struct SendBatch {
    pub org_id: Uuid,
    pub athlete_id: Uuid,
    pub phase: SendPhase,
    pub sent: Vec<SentRecipient>,
    pub sent_at: DateTime<Utc>,
    pub cursor: Option<CursorAdvance>,
}

/// A verified, parsed payment confirmation — the ledger's write command.
///
/// `session_id` is the external idempotency key and becomes the ledger
/// entry's primary key.
#[derive(Debug, Clone)]
pub struct PaymentConfirmation {
    pub session_id: String,
    pub source_event_id: String,
    pub source_event_type: String,
    pub org_id: Uuid,
    pub campaign_id: Uuid,
    pub athlete_id: Uuid,
    pub amount_minor: i64,
    pub currency: String,
    pub donor_email: String,
    pub donor_name: Option<String>,
    pub comment: Option<String>,
    pub confirmed_at: DateTime<Utc>,
}

/// Result of applying the "paid" transition.
#[derive(Debug, Clone)]
pub enum ApplyOutcome {
    /// First successful application; aggregates were incremented.
    Applied(Donation),
    /// The entry was already paid; nothing changed.
    AlreadyPaid,
}

/// Interface for outreach-side persistence.
#[async_trait]
pub trait OutreachStore: Send + Sync {
    async fn organization(&self, id: Uuid) -> Result<Option<Organization>>;

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>>;

    async fn athlete(&self, id: Uuid) -> Result<Option<Athlete>>;

    /// Athletes with auto-send enabled, the sweep's working set.
    async fn auto_send_athletes(&self) -> Result<Vec<Athlete>>;

    /// All contacts for one athlete, read fresh each sweep so a contact
    /// converted by the ledger mid-flight is excluded next pass.
    async fn contacts_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<Contact>>;

    /// Subset of an athlete's contacts by id, for manual sends.
    async fn contacts_by_ids(&self, athlete_id: Uuid, ids: &[Uuid]) -> Result<Vec<Contact>>;

    /// Persist the observability half of the cursor (`next_phase` /
    /// `next_send_at`) without advancing `last_phase_sent`.
    async fn update_next_phase(
        &self,
        athlete_id: Uuid,
        next_phase: Option<PhaseKey>,
        next_send_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Atomically commit a send batch; see [`SendBatch`].
    async fn commit_send_batch(&self, batch: SendBatch) -> Result<()>;

    /// Record a provider delivery event and flip the contact to a terminal
    /// status for bounces and complaints.
    async fn apply_delivery_event(&self, event: DeliveryEvent) -> Result<()>;
}

/// Interface for ledger-side persistence.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Apply the "paid" transition inside one transaction: check the entry
    /// by id, early-exit if already paid, otherwise write it, increment
    /// campaign and athlete aggregates, and flip the matching contact to
    /// donated. Exactly-once by construction.
    async fn apply_paid(&self, confirmation: &PaymentConfirmation) -> Result<ApplyOutcome>;

    async fn donation(&self, id: &str) -> Result<Option<Donation>>;

    /// Insert a public donor comment; `AlreadyExists` on duplicate.
    async fn insert_comment(&self, comment: DonorComment) -> Result<()>;

    /// Insert a public feed item; `AlreadyExists` on duplicate.
    async fn insert_feed_item(&self, item: FeedItem) -> Result<()>;

    /// Queue a receipt; `AlreadyExists` on duplicate.
    async fn enqueue_receipt(&self, job: ReceiptJob) -> Result<()>;

    /// Paid entries for an org with `paid_at` in `[from, to)`.
    async fn paid_in_range(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Donation>>;

    async fn rollup(&self, org_id: Uuid, date: NaiveDate) -> Result<Option<DailyRollup>>;

    /// Write-once rollup insert; `AlreadyExists` on duplicate.
    async fn insert_rollup(&self, rollup: DailyRollup) -> Result<()>;
}
