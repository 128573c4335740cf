//! In-memory store for tests and local development.
//!
//! A single `RwLock` around the whole state stands in for the document
//! store's transactions: every multi-document write happens under one write
//! guard, so the atomicity the traits promise holds here too. Fault
//! injection flags let tests exercise the failure paths.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::interfaces::{
    ApplyOutcome, LedgerStore, OutreachStore, PaymentConfirmation, Result, SendBatch,
    StorageError,
};
use crate::model::{
    email_key, Athlete, Campaign, Contact, ContactStatus, DailyRollup, DeliveryEvent,
    DeliveryEventKind, Donation, DonationStatus, DonorComment, FeedItem, Organization,
    OutreachMessage, ReceiptJob, SendOutcome,
};
use crate::schedule::PhaseKey;

#[derive(Default)]
struct State {
    orgs: HashMap<Uuid, Organization>,
    campaigns: HashMap<Uuid, Campaign>,
    athletes: HashMap<Uuid, Athlete>,
    contacts: HashMap<Uuid, Contact>,
    donations: HashMap<String, Donation>,
    messages: Vec<OutreachMessage>,
    delivery_events: Vec<DeliveryEvent>,
    comments: HashMap<String, DonorComment>,
    feed: HashMap<String, FeedItem>,
    receipts: HashMap<String, ReceiptJob>,
    rollups: HashMap<String, DailyRollup>,
}

/// In-memory implementation of both store interfaces.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_on_commit: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `commit_send_batch` fail until cleared.
    pub async fn set_fail_on_commit(&self, fail: bool) {
        *self.fail_on_commit.write().await = fail;
    }

    // Seeding helpers -------------------------------------------------------

    pub async fn insert_org(&self, org: Organization) {
        self.state.write().await.orgs.insert(org.id, org);
    }

    pub async fn insert_campaign(&self, campaign: Campaign) {
        self.state
            .write()
            .await
            .campaigns
            .insert(campaign.id, campaign);
    }

    pub async fn insert_athlete(&self, athlete: Athlete) {
        self.state
            .write()
            .await
            .athletes
            .insert(athlete.id, athlete);
    }

    pub async fn insert_contact(&self, contact: Contact) {
        self.state
            .write()
            .await
            .contacts
            .insert(contact.id, contact);
    }

    // Inspection helpers for tests ------------------------------------------

    pub async fn contact(&self, id: Uuid) -> Option<Contact> {
        self.state.read().await.contacts.get(&id).cloned()
    }

    pub async fn messages(&self) -> Vec<OutreachMessage> {
        self.state.read().await.messages.clone()
    }

    pub async fn delivery_events(&self) -> Vec<DeliveryEvent> {
        self.state.read().await.delivery_events.clone()
    }

    pub async fn receipts(&self) -> Vec<ReceiptJob> {
        self.state.read().await.receipts.values().cloned().collect()
    }

    pub async fn comments(&self) -> Vec<DonorComment> {
        self.state.read().await.comments.values().cloned().collect()
    }

    pub async fn feed_items(&self) -> Vec<FeedItem> {
        self.state.read().await.feed.values().cloned().collect()
    }
}

#[async_trait]
impl OutreachStore for MemoryStore {
    async fn organization(&self, id: Uuid) -> Result<Option<Organization>> {
        Ok(self.state.read().await.orgs.get(&id).cloned())
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        Ok(self.state.read().await.campaigns.get(&id).cloned())
    }

    async fn athlete(&self, id: Uuid) -> Result<Option<Athlete>> {
        Ok(self.state.read().await.athletes.get(&id).cloned())
    }

    async fn auto_send_athletes(&self) -> Result<Vec<Athlete>> {
        let state = self.state.read().await;
        let mut athletes: Vec<Athlete> = state
            .athletes
            .values()
            .filter(|a| a.outreach.auto_send)
            .cloned()
            .collect();
        athletes.sort_by_key(|a| a.id);
        Ok(athletes)
    }

    async fn contacts_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        let mut contacts: Vec<Contact> = state
            .contacts
            .values()
            .filter(|c| c.athlete_id == athlete_id)
            .cloned()
            .collect();
        contacts.sort_by_key(|c| c.id);
        Ok(contacts)
    }

    async fn contacts_by_ids(&self, athlete_id: Uuid, ids: &[Uuid]) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.contacts.get(id))
            .filter(|c| c.athlete_id == athlete_id)
            .cloned()
            .collect())
    }

    async fn update_next_phase(
        &self,
        athlete_id: Uuid,
        next_phase: Option<PhaseKey>,
        next_send_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        let athlete = state
            .athletes
            .get_mut(&athlete_id)
            .ok_or(StorageError::NotFound {
                kind: "athlete",
                id: athlete_id.to_string(),
            })?;
        athlete.outreach.next_phase = next_phase;
        athlete.outreach.next_send_at = next_send_at;
        Ok(())
    }

    async fn commit_send_batch(&self, batch: SendBatch) -> Result<()> {
        if *self.fail_on_commit.read().await {
            return Err(StorageError::Unavailable("commit disabled".into()));
        }

        let mut state = self.state.write().await;

        for recipient in &batch.sent {
            if let Some(contact) = state.contacts.get_mut(&recipient.contact_id) {
                // A terminal status set concurrently (e.g. the ledger flipped
                // the contact to donated mid-batch) is never overwritten.
                if !contact.status.is_terminal() {
                    contact.status = ContactStatus::Sent;
                }
                contact.last_sent_at = Some(batch.sent_at);
                contact.last_phase_sent = Some(batch.phase);
            }
            state.messages.push(OutreachMessage {
                id: Uuid::new_v4(),
                org_id: batch.org_id,
                athlete_id: batch.athlete_id,
                contact_id: recipient.contact_id,
                recipient: recipient.email.clone(),
                phase: batch.phase,
                outcome: SendOutcome::Sent,
                provider_message_id: recipient.provider_message_id.clone(),
                sent_at: batch.sent_at,
            });
        }

        if let Some(cursor) = &batch.cursor {
            let athlete =
                state
                    .athletes
                    .get_mut(&batch.athlete_id)
                    .ok_or(StorageError::NotFound {
                        kind: "athlete",
                        id: batch.athlete_id.to_string(),
                    })?;
            let moves_forward = match athlete.outreach.last_phase_sent {
                Some(current) => cursor.last_phase_sent.index() > current.index(),
                None => true,
            };
            if moves_forward {
                athlete.outreach.last_phase_sent = Some(cursor.last_phase_sent);
                athlete.outreach.next_phase = cursor.next_phase;
                athlete.outreach.next_send_at = cursor.next_send_at;
            }
        }

        Ok(())
    }

    async fn apply_delivery_event(&self, event: DeliveryEvent) -> Result<()> {
        let mut state = self.state.write().await;
        let contact = state
            .contacts
            .get_mut(&event.contact_id)
            .ok_or(StorageError::NotFound {
                kind: "contact",
                id: event.contact_id.to_string(),
            })?;
        match event.kind {
            DeliveryEventKind::Bounced => contact.status = ContactStatus::Bounced,
            DeliveryEventKind::Complained => contact.status = ContactStatus::Complained,
            DeliveryEventKind::Delivered => {}
        }
        state.delivery_events.push(event);
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn apply_paid(&self, confirmation: &PaymentConfirmation) -> Result<ApplyOutcome> {
        let mut state = self.state.write().await;

        if let Some(existing) = state.donations.get(&confirmation.session_id) {
            if existing.status == DonationStatus::Paid {
                return Ok(ApplyOutcome::AlreadyPaid);
            }
        }

        let donation = Donation {
            id: confirmation.session_id.clone(),
            org_id: confirmation.org_id,
            campaign_id: confirmation.campaign_id,
            athlete_id: confirmation.athlete_id,
            amount_minor: confirmation.amount_minor,
            currency: confirmation.currency.clone(),
            status: DonationStatus::Paid,
            donor_email: confirmation.donor_email.clone(),
            donor_name: confirmation.donor_name.clone(),
            comment: confirmation.comment.clone(),
            source_event_id: confirmation.source_event_id.clone(),
            source_event_type: confirmation.source_event_type.clone(),
            paid_at: Some(confirmation.confirmed_at),
        };
        state
            .donations
            .insert(donation.id.clone(), donation.clone());

        if let Some(campaign) = state.campaigns.get_mut(&confirmation.campaign_id) {
            campaign.raised_minor += confirmation.amount_minor;
            campaign.donor_count += 1;
        }
        if let Some(athlete) = state.athletes.get_mut(&confirmation.athlete_id) {
            athlete.raised_minor += confirmation.amount_minor;
            athlete.donor_count += 1;
        }

        let key = email_key(&confirmation.donor_email);
        for contact in state.contacts.values_mut() {
            if contact.athlete_id == confirmation.athlete_id && contact.email_key == key {
                contact.status = ContactStatus::Donated;
            }
        }

        Ok(ApplyOutcome::Applied(donation))
    }

    async fn donation(&self, id: &str) -> Result<Option<Donation>> {
        Ok(self.state.read().await.donations.get(id).cloned())
    }

    async fn insert_comment(&self, comment: DonorComment) -> Result<()> {
        let mut state = self.state.write().await;
        if state.comments.contains_key(&comment.donation_id) {
            return Err(StorageError::AlreadyExists {
                kind: "donor comment",
                key: comment.donation_id,
            });
        }
        state.comments.insert(comment.donation_id.clone(), comment);
        Ok(())
    }

    async fn insert_feed_item(&self, item: FeedItem) -> Result<()> {
        let mut state = self.state.write().await;
        if state.feed.contains_key(&item.donation_id) {
            return Err(StorageError::AlreadyExists {
                kind: "feed item",
                key: item.donation_id,
            });
        }
        state.feed.insert(item.donation_id.clone(), item);
        Ok(())
    }

    async fn enqueue_receipt(&self, job: ReceiptJob) -> Result<()> {
        let mut state = self.state.write().await;
        if state.receipts.contains_key(&job.donation_id) {
            return Err(StorageError::AlreadyExists {
                kind: "receipt",
                key: job.donation_id,
            });
        }
        state.receipts.insert(job.donation_id.clone(), job);
        Ok(())
    }

    async fn paid_in_range(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Donation>> {
        let state = self.state.read().await;
        let mut entries: Vec<Donation> = state
            .donations
            .values()
            .filter(|d| {
                d.org_id == org_id
                    && d.status == DonationStatus::Paid
                    && d.paid_at.is_some_and(|at| at >= from && at < to)
            })
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.paid_at.cmp(&b.paid_at));
        Ok(entries)
    }

    async fn rollup(&self, org_id: Uuid, date: NaiveDate) -> Result<Option<DailyRollup>> {
        let key = DailyRollup::key(org_id, date);
        Ok(self.state.read().await.rollups.get(&key).cloned())
    }

    async fn insert_rollup(&self, rollup: DailyRollup) -> Result<()> {
        let key = DailyRollup::key(rollup.org_id, rollup.date);
        let mut state = self.state.write().await;
        if state.rollups.contains_key(&key) {
            return Err(StorageError::AlreadyExists {
                kind: "rollup",
                key,
            });
        }
        state.rollups.insert(key, rollup);
        Ok(())
    }
}
