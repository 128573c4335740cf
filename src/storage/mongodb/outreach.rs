//! MongoDB `OutreachStore` implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Bson, Document};
use uuid::Uuid;

use crate::interfaces::{OutreachStore, Result, SendBatch, StorageError};
use crate::model::{Athlete, Campaign, Contact, DeliveryEvent, DeliveryEventKind, Organization};
use crate::schedule::PhaseKey;

use super::{
    athlete_from_doc, bson_instant, campaign_from_doc, contact_from_doc, org_from_doc, MongoStore,
};

/// Statuses a batch send must never overwrite.
const TERMINAL_STATUSES: [&str; 3] = ["bounced", "complained", "donated"];

#[async_trait]
impl OutreachStore for MongoStore {
    async fn organization(&self, id: Uuid) -> Result<Option<Organization>> {
        let found = self.orgs.find_one(doc! { "_id": id.to_string() }).await?;
        found.as_ref().map(org_from_doc).transpose()
    }

    async fn campaign(&self, id: Uuid) -> Result<Option<Campaign>> {
        let found = self
            .campaigns
            .find_one(doc! { "_id": id.to_string() })
            .await?;
        found.as_ref().map(campaign_from_doc).transpose()
    }

    async fn athlete(&self, id: Uuid) -> Result<Option<Athlete>> {
        let found = self
            .athletes
            .find_one(doc! { "_id": id.to_string() })
            .await?;
        found.as_ref().map(athlete_from_doc).transpose()
    }

    async fn auto_send_athletes(&self) -> Result<Vec<Athlete>> {
        let mut cursor = self
            .athletes
            .find(doc! { "outreach.auto_send": true })
            .await?;
        let mut athletes = Vec::new();
        while cursor.advance().await? {
            athletes.push(athlete_from_doc(&cursor.deserialize_current()?)?);
        }
        Ok(athletes)
    }

    async fn contacts_for_athlete(&self, athlete_id: Uuid) -> Result<Vec<Contact>> {
        let mut cursor = self
            .contacts
            .find(doc! { "athlete_id": athlete_id.to_string() })
            .await?;
        let mut contacts = Vec::new();
        while cursor.advance().await? {
            contacts.push(contact_from_doc(&cursor.deserialize_current()?)?);
        }
        Ok(contacts)
    }

    async fn contacts_by_ids(&self, athlete_id: Uuid, ids: &[Uuid]) -> Result<Vec<Contact>> {
        let id_strings: Vec<String> = ids.iter().map(Uuid::to_string).collect();
        let mut cursor = self
            .contacts
            .find(doc! {
                "_id": { "$in": id_strings },
                "athlete_id": athlete_id.to_string(),
            })
            .await?;
        let mut contacts = Vec::new();
        while cursor.advance().await? {
            contacts.push(contact_from_doc(&cursor.deserialize_current()?)?);
        }
        Ok(contacts)
    }

    async fn update_next_phase(
        &self,
        athlete_id: Uuid,
        next_phase: Option<PhaseKey>,
        next_send_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let next_phase = next_phase
            .map(|p| Bson::String(p.as_str().to_string()))
            .unwrap_or(Bson::Null);
        let next_send_at = next_send_at
            .map(|at| Bson::DateTime(bson_instant(at)))
            .unwrap_or(Bson::Null);

        let result = self
            .athletes
            .update_one(
                doc! { "_id": athlete_id.to_string() },
                doc! { "$set": {
                    "outreach.next_phase": next_phase,
                    "outreach.next_send_at": next_send_at,
                } },
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StorageError::NotFound {
                kind: "athlete",
                id: athlete_id.to_string(),
            });
        }
        Ok(())
    }

    async fn commit_send_batch(&self, batch: SendBatch) -> Result<()> {
        let mut session = self.client().start_session().await?;
        session.start_transaction().await?;

        let sent_at = bson_instant(batch.sent_at);
        let phase = batch.phase.as_str();

        let mut audit_docs: Vec<Document> = Vec::with_capacity(batch.sent.len());
        for recipient in &batch.sent {
            let contact_id = recipient.contact_id.to_string();

            // Status flips to sent unless a terminal status landed
            // concurrently; the send timestamps are recorded either way.
            self.contacts
                .update_one(
                    doc! {
                        "_id": &contact_id,
                        "status": { "$nin": TERMINAL_STATUSES.to_vec() },
                    },
                    doc! { "$set": { "status": "sent" } },
                )
                .session(&mut session)
                .await?;
            self.contacts
                .update_one(
                    doc! { "_id": &contact_id },
                    doc! { "$set": {
                        "last_sent_at": sent_at,
                        "last_phase_sent": phase,
                    } },
                )
                .session(&mut session)
                .await?;

            audit_docs.push(doc! {
                "_id": Uuid::new_v4().to_string(),
                "org_id": batch.org_id.to_string(),
                "athlete_id": batch.athlete_id.to_string(),
                "contact_id": contact_id,
                "recipient": &recipient.email,
                "phase": phase,
                "outcome": "sent",
                "provider_message_id": recipient
                    .provider_message_id
                    .as_deref()
                    .map(Bson::from)
                    .unwrap_or(Bson::Null),
                "sent_at": sent_at,
            });
        }

        if !audit_docs.is_empty() {
            self.messages
                .insert_many(audit_docs)
                .session(&mut session)
                .await?;
        }

        if let Some(cursor) = &batch.cursor {
            // Forward-only guard: the filter only matches when the stored
            // cursor is unset or strictly behind the phase just sent, so a
            // racing sweep can never move it backward.
            let earlier: Vec<&str> = PhaseKey::ORDER[..cursor.last_phase_sent.index()]
                .iter()
                .map(|k| k.as_str())
                .collect();
            let next_phase = cursor
                .next_phase
                .map(|p| Bson::String(p.as_str().to_string()))
                .unwrap_or(Bson::Null);
            let next_send_at = cursor
                .next_send_at
                .map(|at| Bson::DateTime(bson_instant(at)))
                .unwrap_or(Bson::Null);

            self.athletes
                .update_one(
                    doc! {
                        "_id": batch.athlete_id.to_string(),
                        "$or": [
                            { "outreach.last_phase_sent": Bson::Null },
                            { "outreach.last_phase_sent": { "$exists": false } },
                            { "outreach.last_phase_sent": { "$in": earlier } },
                        ],
                    },
                    doc! { "$set": {
                        "outreach.last_phase_sent": cursor.last_phase_sent.as_str(),
                        "outreach.next_phase": next_phase,
                        "outreach.next_send_at": next_send_at,
                    } },
                )
                .session(&mut session)
                .await?;
        }

        session.commit_transaction().await?;
        Ok(())
    }

    async fn apply_delivery_event(&self, event: DeliveryEvent) -> Result<()> {
        let contact_id = event.contact_id.to_string();

        let status = match event.kind {
            DeliveryEventKind::Bounced => Some("bounced"),
            DeliveryEventKind::Complained => Some("complained"),
            DeliveryEventKind::Delivered => None,
        };
        if let Some(status) = status {
            let result = self
                .contacts
                .update_one(
                    doc! { "_id": &contact_id },
                    doc! { "$set": { "status": status } },
                )
                .await?;
            if result.matched_count == 0 {
                return Err(StorageError::NotFound {
                    kind: "contact",
                    id: contact_id,
                });
            }
        }

        self.delivery_events
            .insert_one(doc! {
                "_id": event.id.to_string(),
                "contact_id": event.contact_id.to_string(),
                "email": &event.email,
                "kind": event.kind.as_str(),
                "provider_event_id": event
                    .provider_event_id
                    .as_deref()
                    .map(Bson::from)
                    .unwrap_or(Bson::Null),
                "occurred_at": bson_instant(event.occurred_at),
            })
            .await?;
        Ok(())
    }
}
