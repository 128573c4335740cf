//! MongoDB store implementation.
//!
//! Documents are built and read with the `doc!` macro rather than serde
//! round-trips so the wire representation stays explicit: ids as strings,
//! instants as BSON datetimes, calendar dates as `YYYY-MM-DD` strings.
//! At-most-once records (comments, feed, receipts, rollups) use the
//! donation id / rollup key as `_id`, so a duplicate insert surfaces as a
//! duplicate-key write error and maps to `StorageError::AlreadyExists`.
//! Multi-document financial and batch writes run in a client session
//! transaction.

mod ledger;
mod outreach;

use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{doc, Document};
use mongodb::{Client, Collection, Database, IndexModel};
use uuid::Uuid;

use crate::interfaces::{Result, StorageError};
use crate::model::{Athlete, Campaign, Contact, ContactStatus, Donation, DonationStatus, Organization, OutreachState};
use crate::schedule::{PhaseKey, SendPhase};

use super::{
    ATHLETES_COLLECTION, CAMPAIGNS_COLLECTION, COMMENTS_COLLECTION, CONTACTS_COLLECTION,
    DELIVERY_EVENTS_COLLECTION, DONATIONS_COLLECTION, FEED_COLLECTION, MESSAGES_COLLECTION,
    ORGS_COLLECTION, RECEIPTS_COLLECTION, ROLLUPS_COLLECTION,
};

/// MongoDB implementation of the outreach and ledger stores.
pub struct MongoStore {
    client: Client,
    database: Database,
    orgs: Collection<Document>,
    campaigns: Collection<Document>,
    athletes: Collection<Document>,
    contacts: Collection<Document>,
    donations: Collection<Document>,
    messages: Collection<Document>,
    delivery_events: Collection<Document>,
    comments: Collection<Document>,
    feed: Collection<Document>,
    receipts: Collection<Document>,
    rollups: Collection<Document>,
}

impl MongoStore {
    /// Create a store over an existing client and initialize indexes.
    pub async fn new(client: Client, database_name: &str) -> Result<Self> {
        let database = client.database(database_name);
        let store = Self {
            client,
            orgs: database.collection(ORGS_COLLECTION),
            campaigns: database.collection(CAMPAIGNS_COLLECTION),
            athletes: database.collection(ATHLETES_COLLECTION),
            contacts: database.collection(CONTACTS_COLLECTION),
            donations: database.collection(DONATIONS_COLLECTION),
            messages: database.collection(MESSAGES_COLLECTION),
            delivery_events: database.collection(DELIVERY_EVENTS_COLLECTION),
            comments: database.collection(COMMENTS_COLLECTION),
            feed: database.collection(FEED_COLLECTION),
            receipts: database.collection(RECEIPTS_COLLECTION),
            rollups: database.collection(ROLLUPS_COLLECTION),
            database,
        };
        store.init().await?;
        Ok(store)
    }

    /// Connect and build the store.
    pub async fn connect(uri: &str, database_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).await?;
        Self::new(client, database_name).await
    }

    /// Initialize indexes for the query patterns the sweep and ledger use.
    async fn init(&self) -> Result<()> {
        let sweep_index = IndexModel::builder()
            .keys(doc! { "outreach.auto_send": 1 })
            .build();
        self.athletes.create_index(sweep_index).await?;

        let contact_index = IndexModel::builder()
            .keys(doc! { "athlete_id": 1, "email_key": 1 })
            .build();
        self.contacts.create_index(contact_index).await?;

        let donation_index = IndexModel::builder()
            .keys(doc! { "org_id": 1, "status": 1, "paid_at": 1 })
            .build();
        self.donations.create_index(donation_index).await?;

        let message_index = IndexModel::builder()
            .keys(doc! { "athlete_id": 1, "sent_at": 1 })
            .build();
        self.messages.create_index(message_index).await?;

        let event_index = IndexModel::builder()
            .keys(doc! { "contact_id": 1 })
            .build();
        self.delivery_events.create_index(event_index).await?;

        Ok(())
    }

    pub(super) fn client(&self) -> &Client {
        &self.client
    }

    /// Database handle, exposed for operational tooling.
    pub fn database(&self) -> &Database {
        &self.database
    }
}

/// Map an insert error, turning duplicate-key conflicts into
/// `AlreadyExists` so idempotent writers can branch on it.
pub(super) fn map_insert_err(
    error: mongodb::error::Error,
    kind: &'static str,
    key: String,
) -> StorageError {
    if let mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
        ref write_err,
    )) = *error.kind
    {
        if write_err.code == 11000 {
            return StorageError::AlreadyExists { kind, key };
        }
    }
    StorageError::from(error)
}

// ============================================================================
// Field accessors
// ============================================================================

pub(super) fn get_str(doc: &Document, key: &str) -> Result<String> {
    doc.get_str(key)
        .map(str::to_string)
        .map_err(|_| malformed(doc, key))
}

pub(super) fn opt_str(doc: &Document, key: &str) -> Option<String> {
    doc.get_str(key).ok().map(str::to_string)
}

pub(super) fn get_uuid(doc: &Document, key: &str) -> Result<Uuid> {
    doc.get_str(key)
        .ok()
        .and_then(|s| Uuid::parse_str(s).ok())
        .ok_or_else(|| malformed(doc, key))
}

pub(super) fn get_i64(doc: &Document, key: &str) -> Result<i64> {
    doc.get_i64(key)
        .or_else(|_| doc.get_i32(key).map(i64::from))
        .map_err(|_| malformed(doc, key))
}

pub(super) fn opt_instant(doc: &Document, key: &str) -> Option<DateTime<Utc>> {
    doc.get_datetime(key).ok().map(|dt| dt.to_chrono())
}

pub(super) fn opt_date(doc: &Document, key: &str) -> Option<NaiveDate> {
    doc.get_str(key)
        .ok()
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

pub(super) fn bson_instant(at: DateTime<Utc>) -> mongodb::bson::DateTime {
    mongodb::bson::DateTime::from_chrono(at)
}

fn malformed(doc: &Document, key: &str) -> StorageError {
    let id = opt_str(doc, "_id").unwrap_or_default();
    StorageError::MalformedDocument(format!("document {id}: bad or missing field {key}"))
}

// ============================================================================
// Document mapping
// ============================================================================

pub(super) fn org_from_doc(doc: &Document) -> Result<Organization> {
    let mut phase_templates = std::collections::HashMap::new();
    let mut phase_subjects = std::collections::HashMap::new();
    if let Ok(templates) = doc.get_document("phase_templates") {
        for (key, value) in templates {
            if let (Some(phase), Some(text)) = (PhaseKey::parse(key), value.as_str()) {
                phase_templates.insert(phase, text.to_string());
            }
        }
    }
    if let Ok(subjects) = doc.get_document("phase_subjects") {
        for (key, value) in subjects {
            if let (Some(phase), Some(text)) = (PhaseKey::parse(key), value.as_str()) {
                phase_subjects.insert(phase, text.to_string());
            }
        }
    }

    Ok(Organization {
        id: get_uuid(doc, "_id")?,
        name: get_str(doc, "name")?,
        time_zone: get_str(doc, "time_zone")?,
        outreach_enabled: doc.get_bool("outreach_enabled").unwrap_or(false),
        phase_templates,
        phase_subjects,
        default_template: opt_str(doc, "default_template"),
        config_version: get_i64(doc, "config_version").unwrap_or(0) as u64,
    })
}

pub(super) fn campaign_from_doc(doc: &Document) -> Result<Campaign> {
    Ok(Campaign {
        id: get_uuid(doc, "_id")?,
        org_id: get_uuid(doc, "org_id")?,
        name: get_str(doc, "name")?,
        start_date: opt_date(doc, "start_date"),
        end_date: opt_date(doc, "end_date"),
        donate_url: opt_str(doc, "donate_url").unwrap_or_default(),
        raised_minor: get_i64(doc, "raised_minor").unwrap_or(0),
        donor_count: get_i64(doc, "donor_count").unwrap_or(0),
    })
}

pub(super) fn athlete_from_doc(doc: &Document) -> Result<Athlete> {
    let outreach = match doc.get_document("outreach") {
        Ok(cursor) => OutreachState {
            auto_send: cursor.get_bool("auto_send").unwrap_or(false),
            last_phase_sent: cursor
                .get_str("last_phase_sent")
                .ok()
                .and_then(PhaseKey::parse),
            next_phase: cursor.get_str("next_phase").ok().and_then(PhaseKey::parse),
            next_send_at: opt_instant(cursor, "next_send_at"),
        },
        Err(_) => OutreachState::default(),
    };

    Ok(Athlete {
        id: get_uuid(doc, "_id")?,
        org_id: get_uuid(doc, "org_id")?,
        campaign_id: get_uuid(doc, "campaign_id")?,
        name: get_str(doc, "name")?,
        custom_template: opt_str(doc, "custom_template"),
        personal_message: opt_str(doc, "personal_message"),
        raised_minor: get_i64(doc, "raised_minor").unwrap_or(0),
        donor_count: get_i64(doc, "donor_count").unwrap_or(0),
        outreach,
    })
}

pub(super) fn contact_from_doc(doc: &Document) -> Result<Contact> {
    let status = doc
        .get_str("status")
        .ok()
        .and_then(ContactStatus::parse)
        .ok_or_else(|| malformed(doc, "status"))?;
    Ok(Contact {
        id: get_uuid(doc, "_id")?,
        org_id: get_uuid(doc, "org_id")?,
        athlete_id: get_uuid(doc, "athlete_id")?,
        name: opt_str(doc, "name"),
        email: get_str(doc, "email")?,
        email_key: get_str(doc, "email_key")?,
        status,
        last_sent_at: opt_instant(doc, "last_sent_at"),
        last_phase_sent: opt_str(doc, "last_phase_sent").and_then(|s| parse_send_phase(&s)),
    })
}

pub(super) fn donation_from_doc(doc: &Document) -> Result<Donation> {
    let status = doc
        .get_str("status")
        .ok()
        .and_then(DonationStatus::parse)
        .ok_or_else(|| malformed(doc, "status"))?;
    Ok(Donation {
        id: get_str(doc, "_id")?,
        org_id: get_uuid(doc, "org_id")?,
        campaign_id: get_uuid(doc, "campaign_id")?,
        athlete_id: get_uuid(doc, "athlete_id")?,
        amount_minor: get_i64(doc, "amount_minor")?,
        currency: get_str(doc, "currency")?,
        status,
        donor_email: get_str(doc, "donor_email")?,
        donor_name: opt_str(doc, "donor_name"),
        comment: opt_str(doc, "comment"),
        source_event_id: opt_str(doc, "source_event_id").unwrap_or_default(),
        source_event_type: opt_str(doc, "source_event_type").unwrap_or_default(),
        paid_at: opt_instant(doc, "paid_at"),
    })
}

pub(super) fn parse_send_phase(s: &str) -> Option<SendPhase> {
    if s == "manual" {
        return Some(SendPhase::Manual);
    }
    PhaseKey::parse(s).map(SendPhase::Drip)
}
