//! Mock payment gateway for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::interfaces::{GatewayError, GatewaySession, PaymentGateway};

#[derive(Default)]
pub struct MockPaymentGateway {
    sessions: RwLock<Vec<GatewaySession>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_session(&self, session: GatewaySession) {
        self.sessions.write().await.push(session);
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn list_paid_sessions(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<GatewaySession>, GatewayError> {
        Ok(self
            .sessions
            .read()
            .await
            .iter()
            .filter(|s| s.created_at >= from && s.created_at < to && s.status == "paid")
            .cloned()
            .collect())
    }
}
