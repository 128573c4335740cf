//! Pledgeline - donor outreach scheduling and payment ledger
//!
//! Core services behind a team-fundraising platform: the multi-phase
//! donor-outreach scheduler (drip campaign) and the idempotent payment
//! webhook ledger it depends on for suppression and completion signals.

pub mod config;
pub mod gateway;
pub mod handlers;
pub mod interfaces;
pub mod ledger;
pub mod mailer;
pub mod model;
pub mod outreach;
pub mod recon;
pub mod render;
pub mod schedule;
pub mod storage;
pub mod utils;
