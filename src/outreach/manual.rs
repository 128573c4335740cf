//! Caller-initiated sends.
//!
//! Same engine as the drip sweep, but the caller supplies the contact ids,
//! the phase label is `manual`, and the automatic schedule is never touched:
//! no cursor read, no cursor advance.

use std::sync::Arc;

use uuid::Uuid;

use crate::interfaces::{OutreachStore, StorageError};
use crate::outreach::engine::{SendEngine, SendError, SendReport, SendRequest};
use crate::outreach::filter;
use crate::render::{self, RenderContext, DEFAULT_SUBJECT, DEFAULT_TEMPLATE};
use crate::schedule::SendPhase;

#[derive(Debug, thiserror::Error)]
pub enum ManualSendError {
    #[error("unknown athlete {0}")]
    UnknownAthlete(Uuid),

    #[error("unknown campaign for athlete {0}")]
    UnknownCampaign(Uuid),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Send(#[from] SendError),
}

/// A manual send as the admin/athlete UI submits it.
#[derive(Debug, Clone)]
pub struct ManualSendRequest {
    pub athlete_id: Uuid,
    pub contact_ids: Vec<Uuid>,
    /// Subject template override; tokens are still substituted.
    pub subject: Option<String>,
    /// Body template override; tokens are still substituted.
    pub body: Option<String>,
}

/// Send to an explicit contact selection on behalf of one athlete.
pub async fn send_manual(
    store: &Arc<dyn OutreachStore>,
    engine: &SendEngine,
    request: ManualSendRequest,
) -> Result<SendReport, ManualSendError> {
    let athlete = store
        .athlete(request.athlete_id)
        .await?
        .ok_or(ManualSendError::UnknownAthlete(request.athlete_id))?;
    let org = store.organization(athlete.org_id).await?;
    let campaign = store
        .campaign(athlete.campaign_id)
        .await?
        .ok_or(ManualSendError::UnknownCampaign(athlete.id))?;

    let contacts = store
        .contacts_by_ids(athlete.id, &request.contact_ids)
        .await?;
    let recipients = filter::manual_recipients(&contacts);

    let body_template = request
        .body
        .as_deref()
        .or(athlete.custom_template.as_deref())
        .or(org.as_ref().and_then(|o| o.default_template.as_deref()))
        .unwrap_or(DEFAULT_TEMPLATE);
    let subject_template = request.subject.as_deref().unwrap_or(DEFAULT_SUBJECT);

    let ctx = RenderContext {
        athlete_name: Some(athlete.name.clone()),
        team_name: org.as_ref().map(|o| o.name.clone()),
        campaign_name: Some(campaign.name.clone()),
        donate_url: Some(campaign.donate_url.clone()),
        personal_message: athlete.personal_message.clone(),
    };

    let report = engine
        .dispatch(SendRequest {
            org_id: athlete.org_id,
            athlete_id: athlete.id,
            phase: SendPhase::Manual,
            subject: render::render_subject(subject_template, &ctx),
            body: render::render_body(body_template, &ctx),
            recipients,
            cursor: None,
        })
        .await?;

    Ok(report)
}
