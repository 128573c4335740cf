//! Drip scheduler acceptance tests over the in-memory store.

mod common;

use std::sync::Arc;

use pledgeline::interfaces::{Mailer, OutreachStore};
use pledgeline::mailer::MockMailer;
use pledgeline::model::ContactStatus;
use pledgeline::outreach::{
    send_manual, DripScheduler, DripSchedulerConfig, ManualSendRequest, SendEngine,
    SendEngineConfig,
};
use pledgeline::schedule::{PhaseKey, SendPhase};
use pledgeline::storage::MemoryStore;

use common::{at, contact, date, seed_basic};

fn scheduler(
    store: &Arc<MemoryStore>,
    mailer: &Arc<MockMailer>,
) -> DripScheduler {
    let store: Arc<dyn OutreachStore> = store.clone();
    let mailer: Arc<dyn Mailer> = mailer.clone();
    DripScheduler::new(store, mailer, DripSchedulerConfig::default())
}

#[tokio::test]
async fn test_not_yet_due_updates_next_send_at_without_sending() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;

    // week1a fires 2024-01-02T02:30Z (18:30 PST); sweep a few hours early.
    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 1, 20, 0))
        .await;

    assert_eq!(stats.waiting, 1);
    assert_eq!(stats.fired, 0);
    assert_eq!(mailer.sent_count().await, 0);

    let athlete = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(athlete.outreach.next_phase, Some(PhaseKey::Week1a));
    assert_eq!(
        athlete.outreach.next_send_at,
        Some(at(2024, 1, 2, 2, 30))
    );
    assert_eq!(athlete.outreach.last_phase_sent, None);
}

#[tokio::test]
async fn test_due_phase_sends_to_eligible_and_advances_on_partial_failure() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;

    // Five contacts: one invalid address, one already donated, three
    // eligible of which one will fail delivery.
    let ok_a = contact(&athlete, "a@example.com", ContactStatus::Draft);
    let ok_b = contact(&athlete, "b@example.com", ContactStatus::Draft);
    let flaky = contact(&athlete, "c@example.com", ContactStatus::Draft);
    store.insert_contact(ok_a.clone()).await;
    store.insert_contact(ok_b.clone()).await;
    store.insert_contact(flaky.clone()).await;
    store
        .insert_contact(contact(&athlete, "not-an-address", ContactStatus::Draft))
        .await;
    store
        .insert_contact(contact(&athlete, "d@example.com", ContactStatus::Donated))
        .await;
    mailer.fail_address("c@example.com").await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 3, 0))
        .await;

    assert_eq!(stats.fired, 1);
    assert_eq!(mailer.sent_count().await, 2);

    // Cursor advanced despite the partial failure.
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, Some(PhaseKey::Week1a));
    assert_eq!(updated.outreach.next_phase, Some(PhaseKey::Week1b));

    // Succeeded contacts flipped and audited; the failed one untouched.
    for id in [ok_a.id, ok_b.id] {
        let c = store.contact(id).await.unwrap();
        assert_eq!(c.status, ContactStatus::Sent);
        assert_eq!(c.last_phase_sent, Some(SendPhase::Drip(PhaseKey::Week1a)));
    }
    let c = store.contact(flaky.id).await.unwrap();
    assert_eq!(c.status, ContactStatus::Draft);
    assert_eq!(store.messages().await.len(), 2);
}

#[tokio::test]
async fn test_all_sends_failed_does_not_advance_cursor() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;
    mailer.set_fail_all(true).await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 3, 0))
        .await;

    assert_eq!(stats.failed, 1);
    assert!(store.messages().await.is_empty());
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, None);

    // Provider recovers; the same phase fires on the next sweep.
    mailer.set_fail_all(false).await;
    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 4, 0))
        .await;
    assert_eq!(stats.fired, 1);
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, Some(PhaseKey::Week1a));
}

#[tokio::test]
async fn test_overdue_backlog_fires_only_most_advanced_phase() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;

    // Ten days of downtime: week1a, week1b and week2 are all overdue.
    // Exactly one batch goes out and the cursor lands on week2.
    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 11, 12, 0))
        .await;

    assert_eq!(stats.fired, 1);
    assert_eq!(mailer.sent_count().await, 1);
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, Some(PhaseKey::Week2));
    assert_eq!(updated.outreach.next_phase, Some(PhaseKey::Week3));
}

#[tokio::test]
async fn test_org_kill_switch_skips_athlete() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (mut org, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;
    org.outreach_enabled = false;
    store.insert_org(org).await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 3, 0))
        .await;

    assert_eq!(stats.skipped, 1);
    assert_eq!(mailer.sent_count().await, 0);
}

#[tokio::test]
async fn test_missing_start_date_means_nothing_is_ever_due() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, None).await;
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 6, 1, 12, 0))
        .await;

    assert_eq!(stats.skipped, 1);
    assert_eq!(mailer.sent_count().await, 0);
}

#[tokio::test]
async fn test_exhausted_schedule_clears_next_fields() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, mut athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    athlete.outreach.last_phase_sent = Some(PhaseKey::Week5);
    athlete.outreach.next_phase = Some(PhaseKey::Week5);
    athlete.outreach.next_send_at = Some(at(2024, 1, 29, 2, 30));
    store.insert_athlete(athlete.clone()).await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 3, 1, 0, 0))
        .await;

    assert_eq!(stats.exhausted, 1);
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.next_phase, None);
    assert_eq!(updated.outreach.next_send_at, None);
}

#[tokio::test]
async fn test_empty_contact_list_leaves_phase_eligible() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;

    // Import not finished yet: no contacts. The phase is not consumed.
    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 3, 0))
        .await;
    assert_eq!(stats.skipped, 1);

    // Contacts arrive; the same phase fires on a later sweep.
    store
        .insert_contact(contact(&athlete, "a@example.com", ContactStatus::Draft))
        .await;
    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 4, 0))
        .await;
    assert_eq!(stats.fired, 1);
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, Some(PhaseKey::Week1a));
}

#[tokio::test]
async fn test_one_athlete_failure_does_not_abort_the_sweep() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (org, campaign, athlete_a) = seed_basic(&store, Some(date(2024, 1, 1))).await;

    // Second athlete points at a campaign that no longer resolves.
    let mut athlete_b = common::athlete(&org, &campaign, true);
    athlete_b.campaign_id = uuid::Uuid::new_v4();
    store.insert_athlete(athlete_b.clone()).await;

    store
        .insert_contact(contact(&athlete_a, "a@example.com", ContactStatus::Draft))
        .await;

    let stats = scheduler(&store, &mailer)
        .sweep_once(at(2024, 1, 2, 3, 0))
        .await;

    assert_eq!(stats.athletes, 2);
    assert_eq!(stats.fired, 1);
    assert_eq!(stats.skipped, 1);
    assert_eq!(mailer.sent_count().await, 1);
}

#[tokio::test]
async fn test_manual_send_reaches_donated_and_leaves_cursor_alone() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;

    let donated = contact(&athlete, "donor@example.com", ContactStatus::Donated);
    let bounced = contact(&athlete, "gone@example.com", ContactStatus::Bounced);
    store.insert_contact(donated.clone()).await;
    store.insert_contact(bounced.clone()).await;

    let store_dyn: Arc<dyn OutreachStore> = store.clone();
    let mailer_dyn: Arc<dyn Mailer> = mailer.clone();
    let engine = SendEngine::new(
        Arc::clone(&store_dyn),
        mailer_dyn,
        SendEngineConfig::default(),
    );

    let report = send_manual(
        &store_dyn,
        &engine,
        ManualSendRequest {
            athlete_id: athlete.id,
            contact_ids: vec![donated.id, bounced.id],
            subject: Some("One more thing from {{athlete_name}}".to_string()),
            body: None,
        },
    )
    .await
    .unwrap();

    // Donated is reachable manually; bounced never is.
    assert_eq!(report.sent.len(), 1);
    assert_eq!(mailer.sent().await[0].to, "donor@example.com");
    assert_eq!(
        mailer.sent().await[0].subject,
        "One more thing from Jordan Reyes"
    );

    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, None);
    assert_eq!(store.messages().await[0].phase, SendPhase::Manual);
}
