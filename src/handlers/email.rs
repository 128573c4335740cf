//! Email delivery-events endpoint.
//!
//! Providers retry aggressively on non-2xx, so this endpoint acknowledges
//! everything: malformed bodies and internal failures are logged and
//! swallowed. The contact id arrives as the opaque metadata attached to the
//! original send.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{DeliveryEvent, DeliveryEventKind};

use super::AppState;

#[derive(Debug, Deserialize)]
struct EmailEventPayload {
    event: String,
    email: String,
    #[serde(default)]
    contact_id: Option<Uuid>,
    #[serde(default)]
    event_id: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    timestamp: Option<i64>,
}

pub async fn handle_email_events(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let events: Vec<EmailEventPayload> = match serde_json::from_slice(&body) {
        Ok(events) => events,
        Err(e) => {
            warn!(error = %e, "unparseable delivery-event body, acknowledging anyway");
            return StatusCode::OK;
        }
    };

    for payload in events {
        let Some(kind) = parse_kind(&payload.event) else {
            debug!(event = %payload.event, "unhandled delivery event type");
            continue;
        };
        let Some(contact_id) = payload.contact_id else {
            warn!(email = %payload.email, "delivery event without contact metadata");
            continue;
        };
        let occurred_at = payload
            .timestamp
            .and_then(|t| DateTime::from_timestamp(t, 0))
            .unwrap_or_else(Utc::now);

        let event = DeliveryEvent {
            id: Uuid::new_v4(),
            contact_id,
            email: payload.email.clone(),
            kind,
            provider_event_id: payload.event_id.clone(),
            occurred_at,
        };
        if let Err(e) = state.store.apply_delivery_event(event).await {
            warn!(
                %contact_id,
                kind = kind.as_str(),
                error = %e,
                "failed to apply delivery event"
            );
        }
    }

    StatusCode::OK
}

fn parse_kind(event: &str) -> Option<DeliveryEventKind> {
    match event {
        "delivered" => Some(DeliveryEventKind::Delivered),
        "bounced" | "bounce" | "permanent_fail" => Some(DeliveryEventKind::Bounced),
        "complained" | "complaint" | "spam" => Some(DeliveryEventKind::Complained),
        _ => None,
    }
}
