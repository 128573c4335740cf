//! Recipient filtering.
//!
//! Advisory and pure: callers get the eligible subset, state is never
//! mutated here, and the Send Engine re-applies the exclusion before
//! dispatch. Scheduled sends suppress converted donors; manual sends a
//! caller already pre-selected only suppress bounces and complaints.

use crate::model::{Contact, ContactStatus};

/// Pragmatic address syntax check: one `@`, a non-empty local part, and a
/// dotted domain. The mail provider is the real authority; this exists to
/// keep obviously broken imports out of a batch.
pub fn is_valid_email(email: &str) -> bool {
    if email.len() > 254 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }
    domain.split('.').count() >= 2 && domain.split('.').all(|label| !label.is_empty())
}

/// Contacts a scheduled sweep may send to: valid address and not in a
/// terminal status (donated, bounced, complained).
pub fn scheduled_recipients(contacts: &[Contact]) -> Vec<Contact> {
    contacts
        .iter()
        .filter(|c| is_valid_email(&c.email) && !c.status.is_terminal())
        .cloned()
        .collect()
}

/// Contacts a manual, caller-selected send may reach: valid address and not
/// bounced or complained. Donated contacts stay reachable here — suppression
/// applies to automated phases, not to an explicit human choice.
pub fn manual_recipients(contacts: &[Contact]) -> Vec<Contact> {
    contacts
        .iter()
        .filter(|c| {
            is_valid_email(&c.email)
                && !matches!(
                    c.status,
                    ContactStatus::Bounced | ContactStatus::Complained
                )
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn contact(email: &str, status: ContactStatus) -> Contact {
        Contact {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            athlete_id: Uuid::new_v4(),
            name: None,
            email: email.to_string(),
            email_key: crate::model::email_key(email),
            status,
            last_sent_at: None,
            last_phase_sent: None,
        }
    }

    #[test]
    fn test_email_syntax() {
        assert!(is_valid_email("dave@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.co"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("dave@"));
        assert!(!is_valid_email("dave@localhost"));
        assert!(!is_valid_email("dave@exa mple.com"));
        assert!(!is_valid_email("dave@example..com"));
    }

    #[test]
    fn test_scheduled_excludes_all_terminal_statuses() {
        let contacts = vec![
            contact("a@example.com", ContactStatus::Draft),
            contact("b@example.com", ContactStatus::Sent),
            contact("c@example.com", ContactStatus::Donated),
            contact("d@example.com", ContactStatus::Bounced),
            contact("e@example.com", ContactStatus::Complained),
            contact("broken", ContactStatus::Draft),
        ];
        let eligible = scheduled_recipients(&contacts);
        let emails: Vec<&str> = eligible.iter().map(|c| c.email.as_str()).collect();
        assert_eq!(emails, vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn test_manual_keeps_donated() {
        let contacts = vec![
            contact("a@example.com", ContactStatus::Donated),
            contact("b@example.com", ContactStatus::Bounced),
            contact("c@example.com", ContactStatus::Complained),
        ];
        let eligible = manual_recipients(&contacts);
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].email, "a@example.com");
    }
}
