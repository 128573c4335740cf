//! Payment ledger acceptance tests: exactly-once money, suppression, and
//! the ledger consumers.

mod common;

use std::sync::Arc;

use pledgeline::gateway::MockPaymentGateway;
use pledgeline::interfaces::{
    GatewaySession, LedgerStore, Mailer, OutreachStore, PaymentGateway,
};
use pledgeline::ledger::{PaymentLedger, WebhookOutcome};
use pledgeline::mailer::MockMailer;
use pledgeline::model::{ContactStatus, ReceiptJob};
use pledgeline::outreach::{DripScheduler, DripSchedulerConfig};
use pledgeline::recon::{reconcile, run_daily_rollup, RollupOutcome};
use pledgeline::storage::MemoryStore;

use common::{at, confirmation, contact, date, seed_basic};

fn ledger(store: &Arc<MemoryStore>) -> PaymentLedger {
    let store: Arc<dyn LedgerStore> = store.clone();
    PaymentLedger::new(store)
}

#[tokio::test]
async fn test_duplicate_confirmation_applies_exactly_once() {
    let store = Arc::new(MemoryStore::new());
    let (_, campaign, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let donor = contact(&athlete, "donor@example.com", ContactStatus::Sent);
    store.insert_contact(donor.clone()).await;

    let ledger = ledger(&store);
    let conf = confirmation("sess_123", &athlete, 2500, "donor@example.com", at(2024, 1, 3, 12, 0));

    let first = ledger.apply(&conf).await.unwrap();
    let second = ledger.apply(&conf).await.unwrap();
    assert_eq!(first, WebhookOutcome::Applied);
    assert_eq!(second, WebhookOutcome::AlreadyPaid);

    // One ledger entry, aggregates incremented once.
    let entry = store.donation("sess_123").await.unwrap().unwrap();
    assert_eq!(entry.amount_minor, 2500);
    let campaign = store.campaign(campaign.id).await.unwrap().unwrap();
    assert_eq!(campaign.raised_minor, 2500);
    assert_eq!(campaign.donor_count, 1);
    let athlete = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(athlete.raised_minor, 2500);
    assert_eq!(athlete.donor_count, 1);

    // One receipt, one feed item, one comment.
    assert_eq!(store.receipts().await.len(), 1);
    assert_eq!(store.feed_items().await.len(), 1);
    assert_eq!(store.comments().await.len(), 1);

    // The matching contact converted.
    let donor = store.contact(donor.id).await.unwrap();
    assert_eq!(donor.status, ContactStatus::Donated);
}

#[tokio::test]
async fn test_converted_donor_is_suppressed_from_later_sweeps() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let donor = contact(&athlete, "donor@example.com", ContactStatus::Sent);
    let other = contact(&athlete, "other@example.com", ContactStatus::Draft);
    store.insert_contact(donor.clone()).await;
    store.insert_contact(other.clone()).await;

    let conf = confirmation("sess_9", &athlete, 1000, "Donor@Example.com", at(2024, 1, 3, 12, 0));
    ledger(&store).apply(&conf).await.unwrap();

    let store_dyn: Arc<dyn OutreachStore> = store.clone();
    let mailer_dyn: Arc<dyn Mailer> = mailer.clone();
    let scheduler = DripScheduler::new(store_dyn, mailer_dyn, DripSchedulerConfig::default());
    scheduler.sweep_once(at(2024, 1, 5, 12, 0)).await;

    let recipients: Vec<String> = mailer.sent().await.iter().map(|e| e.to.clone()).collect();
    assert_eq!(recipients, vec!["other@example.com".to_string()]);
}

#[tokio::test]
async fn test_non_payment_events_are_ignored() {
    let store = Arc::new(MemoryStore::new());
    let (_, _, _) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let ledger = ledger(&store);

    let body = r#"{
        "id": "evt_1",
        "type": "checkout.session.expired",
        "data": { "object": {
            "id": "sess_void",
            "amount_total": 1000,
            "currency": "usd",
            "payment_status": "unpaid",
            "customer_email": "x@example.com",
            "metadata": {
                "org_id": "0b7f9a3e-54d1-4f66-9d2b-0a1c2d3e4f55",
                "campaign_id": "1c8e0b4f-65e2-4a77-8e3c-1b2d3e4f5a66",
                "athlete_id": "2d9f1c5a-76f3-4b88-9f4d-2c3e4f5a6b77"
            }
        } }
    }"#;
    let event = pledgeline::ledger::PaymentEvent::from_body(body.as_bytes()).unwrap();
    let outcome = ledger.process_event(event, at(2024, 1, 3, 12, 0)).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::Ignored);
    assert!(store.donation("sess_void").await.unwrap().is_none());
}

#[tokio::test]
async fn test_post_step_conflict_does_not_disturb_the_ledger() {
    let store = Arc::new(MemoryStore::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;

    // A receipt for this id already exists, as after a crash between the
    // financial write of a previous delivery and its remaining post-steps.
    store
        .enqueue_receipt(ReceiptJob {
            donation_id: "sess_77".to_string(),
            email: "donor@example.com".to_string(),
            amount_minor: 500,
            currency: "usd".to_string(),
            created_at: at(2024, 1, 2, 0, 0),
            sent: false,
        })
        .await
        .unwrap();

    let conf = confirmation("sess_77", &athlete, 500, "donor@example.com", at(2024, 1, 3, 12, 0));
    let outcome = ledger(&store).apply(&conf).await.unwrap();

    assert_eq!(outcome, WebhookOutcome::Applied);
    assert!(store.donation("sess_77").await.unwrap().is_some());
    assert_eq!(store.receipts().await.len(), 1);
}

#[tokio::test]
async fn test_daily_rollup_is_write_once() {
    let store = Arc::new(MemoryStore::new());
    let (org, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let ledger_handle = ledger(&store);

    // Two donations on Jan 3 (LA time), one on Jan 4.
    for (id, amount, when) in [
        ("sess_a", 1000, at(2024, 1, 3, 20, 0)),
        ("sess_b", 2500, at(2024, 1, 4, 1, 0)),  // still Jan 3 in LA
        ("sess_c", 4000, at(2024, 1, 4, 20, 0)),
    ] {
        let conf = confirmation(id, &athlete, amount, "d@example.com", when);
        ledger_handle.apply(&conf).await.unwrap();
    }

    let outreach: Arc<dyn OutreachStore> = store.clone();
    let ledger_store: Arc<dyn LedgerStore> = store.clone();

    let outcome = run_daily_rollup(&outreach, &ledger_store, org.id, date(2024, 1, 3))
        .await
        .unwrap();
    match outcome {
        RollupOutcome::Created(rollup) => {
            assert_eq!(rollup.raised_minor, 3500);
            assert_eq!(rollup.donation_count, 2);
        }
        RollupOutcome::AlreadyExists => panic!("first run must create"),
    }

    // Re-run is a no-op.
    let outcome = run_daily_rollup(&outreach, &ledger_store, org.id, date(2024, 1, 3))
        .await
        .unwrap();
    assert!(matches!(outcome, RollupOutcome::AlreadyExists));
}

#[tokio::test]
async fn test_reconcile_reports_missing_extra_and_mismatched() {
    let store = Arc::new(MemoryStore::new());
    let (org, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let ledger_handle = ledger(&store);

    // Ledger knows sess_ok (matching), sess_short (wrong amount) and
    // sess_extra (unknown to the gateway).
    for (id, amount) in [("sess_ok", 1000), ("sess_short", 900), ("sess_extra", 300)] {
        let conf = confirmation(id, &athlete, amount, "d@example.com", at(2024, 1, 3, 12, 0));
        ledger_handle.apply(&conf).await.unwrap();
    }

    let gateway = Arc::new(MockPaymentGateway::new());
    for (id, amount) in [("sess_ok", 1000), ("sess_short", 1200), ("sess_missing", 800)] {
        gateway
            .add_session(GatewaySession {
                id: id.to_string(),
                amount_minor: amount,
                currency: "usd".to_string(),
                status: "paid".to_string(),
                created_at: at(2024, 1, 3, 12, 0),
            })
            .await;
    }

    let gateway_dyn: Arc<dyn PaymentGateway> = gateway;
    let ledger_store: Arc<dyn LedgerStore> = store.clone();
    let report = reconcile(
        &gateway_dyn,
        &ledger_store,
        org.id,
        at(2024, 1, 3, 0, 0),
        at(2024, 1, 4, 0, 0),
    )
    .await
    .unwrap();

    assert!(!report.is_clean());
    assert_eq!(report.missing.len(), 1);
    assert_eq!(report.missing[0].id, "sess_missing");
    assert_eq!(report.extra, vec!["sess_extra".to_string()]);
    assert_eq!(report.mismatched.len(), 1);
    assert_eq!(report.mismatched[0].id, "sess_short");
}
