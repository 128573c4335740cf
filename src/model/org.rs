//! Organization document.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schedule::PhaseKey;

/// An organization running fundraising campaigns.
///
/// Carries the org-wide outreach kill switch and the per-phase message
/// templates. `config_version` is bumped on every admin mutation; sweeps
/// read the document fresh each pass and log the version they acted on, so
/// concurrent sweep workers never act on a stale cached copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    pub id: Uuid,
    pub name: String,
    /// IANA zone name, e.g. "America/Los_Angeles".
    pub time_zone: String,
    /// Global kill switch for automated outreach.
    pub outreach_enabled: bool,
    /// Per-phase message body overrides.
    pub phase_templates: HashMap<PhaseKey, String>,
    /// Per-phase subject overrides.
    pub phase_subjects: HashMap<PhaseKey, String>,
    /// Fallback body when a phase has no override.
    pub default_template: Option<String>,
    pub config_version: u64,
}

impl Organization {
    /// Resolve the message body for a phase: per-phase template, then the
    /// org default. Built-in fallback is the renderer's concern.
    pub fn template_for(&self, phase: PhaseKey) -> Option<&str> {
        self.phase_templates
            .get(&phase)
            .or(self.default_template.as_ref())
            .map(String::as_str)
    }

    /// Resolve the subject line for a phase.
    pub fn subject_for(&self, phase: PhaseKey) -> Option<&str> {
        self.phase_subjects.get(&phase).map(String::as_str)
    }
}
