//! HTTP boundary: webhook endpoints and the manual send trigger.
//!
//! The router is built separately from `serve` so tests can drive it with
//! `tower::ServiceExt::oneshot` without binding a socket.

mod email;
mod manual;
mod payments;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{OutreachConfig, PaymentsConfig};
use crate::interfaces::{Mailer, OutreachStore};
use crate::ledger::PaymentLedger;
use crate::outreach::SendEngine;

/// Shared state for axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn OutreachStore>,
    pub ledger: Arc<PaymentLedger>,
    pub engine: Arc<SendEngine>,
    pub webhook_secret: Arc<Vec<u8>>,
    pub signature_tolerance: Duration,
    pub handler_budget: Duration,
}

impl AppState {
    pub fn new(
        store: Arc<dyn OutreachStore>,
        mailer: Arc<dyn Mailer>,
        ledger: Arc<PaymentLedger>,
        payments: &PaymentsConfig,
        outreach: &OutreachConfig,
    ) -> Self {
        let engine = SendEngine::new(
            Arc::clone(&store),
            mailer,
            outreach.to_scheduler_config().engine,
        );
        Self {
            store,
            ledger,
            engine: Arc::new(engine),
            webhook_secret: Arc::new(payments.webhook_secret.clone().into_bytes()),
            signature_tolerance: payments.tolerance(),
            handler_budget: payments.handler_budget(),
        }
    }
}

/// Build the axum router (separated for testing).
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/hooks/payments", post(payments::handle_payment_webhook))
        .route("/hooks/email", post(email::handle_email_events))
        .route("/api/outreach/manual", post(manual::handle_manual_send))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server on the given address.
pub async fn serve(
    state: AppState,
    host: &str,
    port: u16,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let app = router(state);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> StatusCode {
    StatusCode::OK
}
