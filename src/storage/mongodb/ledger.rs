//! MongoDB `LedgerStore` implementation.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use mongodb::bson::{doc, Bson, Document};
use mongodb::options::FindOptions;
use uuid::Uuid;

use crate::interfaces::{ApplyOutcome, LedgerStore, PaymentConfirmation, Result};
use crate::model::{email_key, DailyRollup, Donation, DonorComment, FeedItem, ReceiptJob};

use super::{bson_instant, donation_from_doc, get_i64, map_insert_err, opt_date, MongoStore};

#[async_trait]
impl LedgerStore for MongoStore {
    async fn apply_paid(&self, confirmation: &PaymentConfirmation) -> Result<ApplyOutcome> {
        let mut session = self.client().start_session().await?;
        session.start_transaction().await?;

        // Idempotency check first: a re-delivered confirmation for an entry
        // already paid leaves the transaction with zero writes.
        let existing = self
            .donations
            .find_one(doc! { "_id": &confirmation.session_id })
            .session(&mut session)
            .await?;
        if let Some(ref entry) = existing {
            if entry.get_str("status") == Ok("paid") {
                session.abort_transaction().await?;
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
            status: crate::model::DonationStatus::Paid,
            donor_email: confirmation.donor_email.clone(),
            donor_name: confirmation.donor_name.clone(),
            comment: confirmation.comment.clone(),
            source_event_id: confirmation.source_event_id.clone(),
            source_event_type: confirmation.source_event_type.clone(),
            paid_at: Some(confirmation.confirmed_at),
        };

        self.donations
            .replace_one(
                doc! { "_id": &confirmation.session_id },
                donation_to_doc(&donation),
            )
            .upsert(true)
            .session(&mut session)
            .await?;

        let increments = doc! { "$inc": {
            "raised_minor": confirmation.amount_minor,
            "donor_count": 1i64,
        } };
        self.campaigns
            .update_one(
                doc! { "_id": confirmation.campaign_id.to_string() },
                increments.clone(),
            )
            .session(&mut session)
            .await?;
        self.athletes
            .update_one(
                doc! { "_id": confirmation.athlete_id.to_string() },
                increments,
            )
            .session(&mut session)
            .await?;

        // Conversion is what suppresses the donor from every later sweep,
        // so it rides in the same transaction as the money.
        self.contacts
            .update_many(
                doc! {
                    "athlete_id": confirmation.athlete_id.to_string(),
                    "email_key": email_key(&confirmation.donor_email),
                },
                doc! { "$set": { "status": "donated" } },
            )
            .session(&mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(ApplyOutcome::Applied(donation))
    }

    async fn donation(&self, id: &str) -> Result<Option<Donation>> {
        let found = self.donations.find_one(doc! { "_id": id }).await?;
        found.as_ref().map(donation_from_doc).transpose()
    }

    async fn insert_comment(&self, comment: DonorComment) -> Result<()> {
        let key = comment.donation_id.clone();
        self.comments
            .insert_one(doc! {
                "_id": &comment.donation_id,
                "org_id": comment.org_id.to_string(),
                "athlete_id": comment.athlete_id.to_string(),
                "donor_display": &comment.donor_display,
                "body": &comment.body,
                "created_at": bson_instant(comment.created_at),
            })
            .await
            .map_err(|e| map_insert_err(e, "donor comment", key))?;
        Ok(())
    }

    async fn insert_feed_item(&self, item: FeedItem) -> Result<()> {
        let key = item.donation_id.clone();
        self.feed
            .insert_one(doc! {
                "_id": &item.donation_id,
                "org_id": item.org_id.to_string(),
                "campaign_id": item.campaign_id.to_string(),
                "athlete_id": item.athlete_id.to_string(),
                "donor_display": &item.donor_display,
                "amount_minor": item.amount_minor,
                "created_at": bson_instant(item.created_at),
            })
            .await
            .map_err(|e| map_insert_err(e, "feed item", key))?;
        Ok(())
    }

    async fn enqueue_receipt(&self, job: ReceiptJob) -> Result<()> {
        let key = job.donation_id.clone();
        self.receipts
            .insert_one(doc! {
                "_id": &job.donation_id,
                "email": &job.email,
                "amount_minor": job.amount_minor,
                "currency": &job.currency,
                "created_at": bson_instant(job.created_at),
                "sent": job.sent,
            })
            .await
            .map_err(|e| map_insert_err(e, "receipt", key))?;
        Ok(())
    }

    async fn paid_in_range(
        &self,
        org_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Donation>> {
        let filter = doc! {
            "org_id": org_id.to_string(),
            "status": "paid",
            "paid_at": { "$gte": bson_instant(from), "$lt": bson_instant(to) },
        };
        let options = FindOptions::builder().sort(doc! { "paid_at": 1 }).build();

        let mut cursor = self.donations.find(filter).with_options(options).await?;
        let mut entries = Vec::new();
        while cursor.advance().await? {
            entries.push(donation_from_doc(&cursor.deserialize_current()?)?);
        }
        Ok(entries)
    }

    async fn rollup(&self, org_id: Uuid, date: NaiveDate) -> Result<Option<DailyRollup>> {
        let found = self
            .rollups
            .find_one(doc! { "_id": DailyRollup::key(org_id, date) })
            .await?;
        found.as_ref().map(rollup_from_doc).transpose()
    }

    async fn insert_rollup(&self, rollup: DailyRollup) -> Result<()> {
        let key = DailyRollup::key(rollup.org_id, rollup.date);
        self.rollups
            .insert_one(doc! {
                "_id": &key,
                "org_id": rollup.org_id.to_string(),
                "date": rollup.date.format("%Y-%m-%d").to_string(),
                "raised_minor": rollup.raised_minor,
                "donation_count": rollup.donation_count,
                "created_at": bson_instant(rollup.created_at),
            })
            .await
            .map_err(|e| map_insert_err(e, "rollup", key))?;
        Ok(())
    }
}

fn donation_to_doc(donation: &Donation) -> Document {
    doc! {
        "_id": &donation.id,
        "org_id": donation.org_id.to_string(),
        "campaign_id": donation.campaign_id.to_string(),
        "athlete_id": donation.athlete_id.to_string(),
        "amount_minor": donation.amount_minor,
        "currency": &donation.currency,
        "status": donation.status.as_str(),
        "donor_email": &donation.donor_email,
        "donor_name": donation.donor_name.as_deref().map(Bson::from).unwrap_or(Bson::Null),
        "comment": donation.comment.as_deref().map(Bson::from).unwrap_or(Bson::Null),
        "source_event_id": &donation.source_event_id,
        "source_event_type": &donation.source_event_type,
        "paid_at": donation.paid_at.map(|at| Bson::DateTime(bson_instant(at))).unwrap_or(Bson::Null),
    }
}

fn rollup_from_doc(doc: &Document) -> Result<DailyRollup> {
    Ok(DailyRollup {
        org_id: super::get_uuid(doc, "org_id")?,
        date: opt_date(doc, "date").ok_or_else(|| {
            crate::interfaces::StorageError::MalformedDocument("rollup missing date".into())
        })?,
        raised_minor: get_i64(doc, "raised_minor")?,
        donation_count: get_i64(doc, "donation_count")?,
        created_at: super::opt_instant(doc, "created_at").unwrap_or_else(Utc::now),
    })
}
