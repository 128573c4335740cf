//! Payment confirmation endpoint.
//!
//! Raw-body handler: the signature is verified over the exact bytes on the
//! wire before anything is parsed. Signature or payload failures are 400
//! with no state change; once the financial write succeeds the response is
//! 200 no matter what the non-critical post-steps did.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, warn};

use crate::ledger::{verify_signature, PaymentEvent, WebhookError, SIGNATURE_HEADER};

use super::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    received: bool,
}

#[derive(Debug, Serialize)]
pub struct WebhookErrorResponse {
    error: String,
}

pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, (StatusCode, Json<WebhookErrorResponse>)> {
    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "missing signature header"))?;

    verify_signature(
        &state.webhook_secret,
        header,
        &body,
        Utc::now(),
        state.signature_tolerance,
    )
    .map_err(|e| {
        warn!(error = %e, "webhook signature rejected");
        reject(StatusCode::BAD_REQUEST, "invalid signature")
    })?;

    let event = PaymentEvent::from_body(&body).map_err(|e| {
        warn!(error = %e, "webhook payload rejected");
        reject(StatusCode::BAD_REQUEST, "malformed payload")
    })?;

    let processed = tokio::time::timeout(
        state.handler_budget,
        state.ledger.process_event(event, Utc::now()),
    )
    .await;

    match processed {
        Ok(Ok(_)) => Ok(Json(WebhookResponse { received: true })),
        Ok(Err(WebhookError::Malformed(e))) => {
            warn!(error = %e, "webhook event unusable");
            Err(reject(StatusCode::BAD_REQUEST, "malformed payload"))
        }
        Ok(Err(e)) => {
            // Financial write failed; a 5xx makes the processor redeliver,
            // which the idempotency key makes safe.
            error!(error = %e, "webhook processing failed");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "processing failed"))
        }
        Err(_) => {
            error!("webhook processing exceeded budget");
            Err(reject(StatusCode::INTERNAL_SERVER_ERROR, "processing timeout"))
        }
    }
}

fn reject(
    status: StatusCode,
    message: &str,
) -> (StatusCode, Json<WebhookErrorResponse>) {
    (
        status,
        Json(WebhookErrorResponse {
            error: message.to_string(),
        }),
    )
}
