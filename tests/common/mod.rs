//! Shared fixtures for the integration suites.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use pledgeline::interfaces::PaymentConfirmation;
use pledgeline::model::{
    email_key, Athlete, Campaign, Contact, ContactStatus, Organization, OutreachState,
};
use pledgeline::storage::MemoryStore;

pub const LA: &str = "America/Los_Angeles";

pub fn org(time_zone: &str) -> Organization {
    Organization {
        id: Uuid::new_v4(),
        name: "Westfield Track".to_string(),
        time_zone: time_zone.to_string(),
        outreach_enabled: true,
        phase_templates: HashMap::new(),
        phase_subjects: HashMap::new(),
        default_template: None,
        config_version: 1,
    }
}

pub fn campaign(org: &Organization, start_date: Option<NaiveDate>) -> Campaign {
    Campaign {
        id: Uuid::new_v4(),
        org_id: org.id,
        name: "Spring Sprint".to_string(),
        start_date,
        end_date: None,
        donate_url: "https://donate.example/spring".to_string(),
        raised_minor: 0,
        donor_count: 0,
    }
}

pub fn athlete(org: &Organization, campaign: &Campaign, auto_send: bool) -> Athlete {
    Athlete {
        id: Uuid::new_v4(),
        org_id: org.id,
        campaign_id: campaign.id,
        name: "Jordan Reyes".to_string(),
        custom_template: None,
        personal_message: None,
        raised_minor: 0,
        donor_count: 0,
        outreach: OutreachState {
            auto_send,
            ..OutreachState::default()
        },
    }
}

pub fn contact(athlete: &Athlete, email: &str, status: ContactStatus) -> Contact {
    Contact {
        id: Uuid::new_v4(),
        org_id: athlete.org_id,
        athlete_id: athlete.id,
        name: None,
        email: email.to_string(),
        email_key: email_key(email),
        status,
        last_sent_at: None,
        last_phase_sent: None,
    }
}

pub fn confirmation(
    session_id: &str,
    athlete: &Athlete,
    amount_minor: i64,
    donor_email: &str,
    at: DateTime<Utc>,
) -> PaymentConfirmation {
    PaymentConfirmation {
        session_id: session_id.to_string(),
        source_event_id: format!("evt_{session_id}"),
        source_event_type: "checkout.session.completed".to_string(),
        org_id: athlete.org_id,
        campaign_id: athlete.campaign_id,
        athlete_id: athlete.id,
        amount_minor,
        currency: "usd".to_string(),
        donor_email: donor_email.to_string(),
        donor_name: Some("Pat Donor".to_string()),
        comment: Some("Go team!".to_string()),
        confirmed_at: at,
    }
}

/// Seed a store with one org, one campaign, and one auto-send athlete.
pub async fn seed_basic(
    store: &Arc<MemoryStore>,
    start_date: Option<NaiveDate>,
) -> (Organization, Campaign, Athlete) {
    let org = org(LA);
    let campaign = campaign(&org, start_date);
    let athlete = athlete(&org, &campaign, true);
    store.insert_org(org.clone()).await;
    store.insert_campaign(campaign.clone()).await;
    store.insert_athlete(athlete.clone()).await;
    (org, campaign, athlete)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    chrono::TimeZone::with_ymd_and_hms(&Utc, y, m, d, h, min, 0).unwrap()
}
