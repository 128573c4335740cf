//! Contact document.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::SendPhase;

/// Delivery lifecycle of a contact.
///
/// `Donated`, `Bounced` and `Complained` are terminal: a contact in one of
/// these states is permanently excluded from all future phases, with no
/// automatic reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContactStatus {
    Draft,
    Sent,
    Bounced,
    Complained,
    Donated,
}

impl ContactStatus {
    /// Terminal states suppress the contact forever.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ContactStatus::Bounced | ContactStatus::Complained | ContactStatus::Donated
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ContactStatus::Draft => "draft",
            ContactStatus::Sent => "sent",
            ContactStatus::Bounced => "bounced",
            ContactStatus::Complained => "complained",
            ContactStatus::Donated => "donated",
        }
    }

    pub fn parse(s: &str) -> Option<ContactStatus> {
        match s {
            "draft" => Some(ContactStatus::Draft),
            "sent" => Some(ContactStatus::Sent),
            "bounced" => Some(ContactStatus::Bounced),
            "complained" => Some(ContactStatus::Complained),
            "donated" => Some(ContactStatus::Donated),
            _ => None,
        }
    }
}

/// Normalized form of an address, used for matching a payment confirmation
/// back to the contact that produced it.
pub fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// A donor contact imported by an athlete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contact {
    pub id: Uuid,
    pub org_id: Uuid,
    pub athlete_id: Uuid,
    pub name: Option<String>,
    pub email: String,
    /// Lowercased lookup key; see [`email_key`].
    pub email_key: String,
    pub status: ContactStatus,
    pub last_sent_at: Option<DateTime<Utc>>,
    pub last_phase_sent: Option<SendPhase>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_key_normalizes() {
        assert_eq!(email_key("  Dave@Example.COM "), "dave@example.com");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ContactStatus::Donated.is_terminal());
        assert!(ContactStatus::Bounced.is_terminal());
        assert!(ContactStatus::Complained.is_terminal());
        assert!(!ContactStatus::Draft.is_terminal());
        assert!(!ContactStatus::Sent.is_terminal());
    }
}
