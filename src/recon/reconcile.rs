//! Read-only ledger reconciliation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::interfaces::{
    GatewayError, GatewaySession, LedgerStore, PaymentGateway, StorageError,
};
use crate::model::DonationStatus;

#[derive(Debug, thiserror::Error)]
pub enum ReconError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// A session both sides know about but disagree on.
#[derive(Debug, Clone)]
pub struct LedgerMismatch {
    pub id: String,
    pub gateway_amount: i64,
    pub ledger_amount: i64,
    pub gateway_status: String,
    pub ledger_status: DonationStatus,
}

/// Outcome of one reconciliation run. Purely descriptive; acting on it is
/// an operator decision.
#[derive(Debug, Default)]
pub struct ReconciliationReport {
    /// Paid at the gateway, absent from the ledger.
    pub missing: Vec<GatewaySession>,
    /// Paid in the ledger, unknown to the gateway in this range.
    pub extra: Vec<String>,
    pub mismatched: Vec<LedgerMismatch>,
}

impl ReconciliationReport {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty() && self.mismatched.is_empty()
    }
}

/// Diff the gateway's paid sessions against the ledger for one org.
///
/// The gateway client is scoped to the org's processor account, so both
/// sides of the diff cover the same population.
pub async fn reconcile(
    gateway: &Arc<dyn PaymentGateway>,
    store: &Arc<dyn LedgerStore>,
    org_id: Uuid,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<ReconciliationReport, ReconError> {
    let sessions = gateway.list_paid_sessions(from, to).await?;
    let mut report = ReconciliationReport::default();

    for session in &sessions {
        match store.donation(&session.id).await? {
            None => report.missing.push(session.clone()),
            Some(entry) => {
                if entry.amount_minor != session.amount_minor
                    || entry.status != DonationStatus::Paid
                {
                    report.mismatched.push(LedgerMismatch {
                        id: session.id.clone(),
                        gateway_amount: session.amount_minor,
                        ledger_amount: entry.amount_minor,
                        gateway_status: session.status.clone(),
                        ledger_status: entry.status,
                    });
                }
            }
        }
    }

    let ledger_entries = store.paid_in_range(org_id, from, to).await?;
    for entry in ledger_entries {
        if !sessions.iter().any(|s| s.id == entry.id) {
            report.extra.push(entry.id);
        }
    }

    info!(
        %org_id,
        gateway_sessions = sessions.len(),
        missing = report.missing.len(),
        extra = report.extra.len(),
        mismatched = report.mismatched.len(),
        "reconciliation complete"
    );

    Ok(report)
}
