//! Router-level tests for the HTTP boundary.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use pledgeline::config::{OutreachConfig, PaymentsConfig};
use pledgeline::handlers::{router, AppState};
use pledgeline::interfaces::{LedgerStore, Mailer, OutreachStore};
use pledgeline::ledger::{signature, PaymentLedger, SIGNATURE_HEADER};
use pledgeline::mailer::MockMailer;
use pledgeline::model::ContactStatus;
use pledgeline::storage::MemoryStore;

use common::{at, contact, date, seed_basic};

const SECRET: &str = "whsec_router_test";

fn app_state(store: &Arc<MemoryStore>, mailer: &Arc<MockMailer>) -> AppState {
    let outreach: Arc<dyn OutreachStore> = store.clone();
    let ledger_store: Arc<dyn LedgerStore> = store.clone();
    let mailer: Arc<dyn Mailer> = mailer.clone();
    let payments = PaymentsConfig {
        webhook_secret: SECRET.to_string(),
        ..PaymentsConfig::default()
    };
    AppState::new(
        outreach,
        mailer,
        Arc::new(PaymentLedger::new(ledger_store)),
        &payments,
        &OutreachConfig::default(),
    )
}

fn payment_body(athlete: &pledgeline::model::Athlete) -> String {
    format!(
        r#"{{
            "id": "evt_http",
            "type": "checkout.session.completed",
            "data": {{ "object": {{
                "id": "sess_http",
                "amount_total": 1500,
                "currency": "usd",
                "payment_status": "paid",
                "customer_email": "donor@example.com",
                "metadata": {{
                    "org_id": "{}",
                    "campaign_id": "{}",
                    "athlete_id": "{}"
                }}
            }} }}
        }}"#,
        athlete.org_id, athlete.campaign_id, athlete.id
    )
}

#[tokio::test]
async fn test_health() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let app = router(app_state(&store, &mailer));

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signed_payment_webhook_is_applied() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let app = router(app_state(&store, &mailer));

    let body = payment_body(&athlete);
    let header = signature::sign(SECRET.as_bytes(), body.as_bytes(), chrono::Utc::now());

    let response = app
        .oneshot(
            Request::post("/hooks/payments")
                .header(SIGNATURE_HEADER, header)
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let entry = store.donation("sess_http").await.unwrap().unwrap();
    assert_eq!(entry.amount_minor, 1500);
}

#[tokio::test]
async fn test_tampered_payment_webhook_is_rejected_without_state_change() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let app = router(app_state(&store, &mailer));

    let body = payment_body(&athlete);
    let header = signature::sign(SECRET.as_bytes(), body.as_bytes(), chrono::Utc::now());
    let tampered = body.replace("1500", "9999");

    let response = app
        .oneshot(
            Request::post("/hooks/payments")
                .header(SIGNATURE_HEADER, header)
                .body(Body::from(tampered))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(store.donation("sess_http").await.unwrap().is_none());
}

#[tokio::test]
async fn test_missing_signature_header_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let app = router(app_state(&store, &mailer));

    let response = app
        .oneshot(
            Request::post("/hooks/payments")
                .body(Body::from(payment_body(&athlete)))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bounce_event_flips_contact_and_always_acks() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let bouncing = contact(&athlete, "gone@example.com", ContactStatus::Sent);
    store.insert_contact(bouncing.clone()).await;
    let app = router(app_state(&store, &mailer));

    let body = format!(
        r#"[{{"event":"bounced","email":"gone@example.com","contact_id":"{}","event_id":"ev-1","timestamp":{}}}]"#,
        bouncing.id,
        at(2024, 1, 5, 0, 0).timestamp()
    );
    let response = app
        .clone()
        .oneshot(
            Request::post("/hooks/email")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let updated = store.contact(bouncing.id).await.unwrap();
    assert_eq!(updated.status, ContactStatus::Bounced);
    assert_eq!(store.delivery_events().await.len(), 1);

    // Garbage bodies are acknowledged too; providers must not retry-storm.
    let response = app
        .oneshot(
            Request::post("/hooks/email")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_manual_send_endpoint() {
    let store = Arc::new(MemoryStore::new());
    let mailer = Arc::new(MockMailer::new());
    let (_, _, athlete) = seed_basic(&store, Some(date(2024, 1, 1))).await;
    let target = contact(&athlete, "friend@example.com", ContactStatus::Draft);
    store.insert_contact(target.clone()).await;
    let app = router(app_state(&store, &mailer));

    let body = format!(
        r#"{{"athlete_id":"{}","contact_ids":["{}"]}}"#,
        athlete.id, target.id
    );
    let response = app
        .oneshot(
            Request::post("/api/outreach/manual")
                .header("content-type", "application/json")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(mailer.sent_count().await, 1);
    assert_eq!(mailer.sent().await[0].to, "friend@example.com");

    // Manual sends never touch the automatic cursor.
    let updated = store.athlete(athlete.id).await.unwrap().unwrap();
    assert_eq!(updated.outreach.last_phase_sent, None);
}
