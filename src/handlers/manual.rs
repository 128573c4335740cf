//! Manual send endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::outreach::{send_manual, ManualSendError, ManualSendRequest, SendError};

use super::AppState;

#[derive(Debug, Deserialize)]
pub struct ManualSendBody {
    pub athlete_id: Uuid,
    pub contact_ids: Vec<Uuid>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ManualSendResponse {
    pub sent: usize,
    pub failed: Vec<FailedRecipient>,
}

#[derive(Debug, Serialize)]
pub struct FailedRecipient {
    pub email: String,
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ManualSendErrorResponse {
    pub error: String,
}

pub async fn handle_manual_send(
    State(state): State<AppState>,
    Json(body): Json<ManualSendBody>,
) -> Result<Json<ManualSendResponse>, (StatusCode, Json<ManualSendErrorResponse>)> {
    let request = ManualSendRequest {
        athlete_id: body.athlete_id,
        contact_ids: body.contact_ids,
        subject: body.subject,
        body: body.body,
    };

    match send_manual(&state.store, &state.engine, request).await {
        Ok(report) => Ok(Json(ManualSendResponse {
            sent: report.sent.len(),
            failed: report
                .failed
                .into_iter()
                .map(|f| FailedRecipient {
                    email: f.email,
                    reason: f.reason,
                })
                .collect(),
        })),
        Err(e) => {
            warn!(error = %e, "manual send failed");
            let (status, message) = match &e {
                ManualSendError::UnknownAthlete(_) | ManualSendError::UnknownCampaign(_) => {
                    (StatusCode::NOT_FOUND, e.to_string())
                }
                ManualSendError::Send(SendError::NoValidRecipients) => {
                    (StatusCode::BAD_REQUEST, e.to_string())
                }
                ManualSendError::Send(SendError::AllFailed(_)) => {
                    (StatusCode::BAD_GATEWAY, e.to_string())
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            };
            Err((status, Json(ManualSendErrorResponse { error: message })))
        }
    }
}
