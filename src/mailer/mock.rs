//! Mock mailer for tests.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::interfaces::{DeliveryReceipt, Mailer, MailerError, OutboundEmail};

/// Records every send and fails the addresses a test scripts.
#[derive(Default)]
pub struct MockMailer {
    sent: RwLock<Vec<OutboundEmail>>,
    failing: RwLock<HashSet<String>>,
    fail_all: RwLock<bool>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sends to this address fail with a transient error.
    pub async fn fail_address(&self, email: &str) {
        self.failing.write().await.insert(email.to_string());
    }

    /// Make every send fail until cleared.
    pub async fn set_fail_all(&self, fail: bool) {
        *self.fail_all.write().await = fail;
    }

    pub async fn sent(&self) -> Vec<OutboundEmail> {
        self.sent.read().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.read().await.len()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<DeliveryReceipt, MailerError> {
        if *self.fail_all.read().await || self.failing.read().await.contains(&email.to) {
            return Err(MailerError::Unavailable("scripted failure".into()));
        }
        let mut sent = self.sent.write().await;
        sent.push(email.clone());
        Ok(DeliveryReceipt {
            provider_message_id: Some(format!("mock-{}", sent.len())),
        })
    }
}
