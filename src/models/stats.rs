//! Aggregate statistics reported to the popup.

use serde::{Deserialize, Serialize};

use super::Lead;

/// Snapshot of the lead collection and usage counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub total_leads: usize,
    pub daily_count: u32,
    pub lifetime: u64,
    pub email_count: usize,
    pub phone_count: usize,
    pub is_premium: bool,
}

impl Stats {
    /// Fill the lead-derived counts from a collection.
    pub fn with_leads(mut self, leads: &[Lead]) -> Self {
        self.total_leads = leads.len();
        self.email_count = leads.iter().filter(|l| !l.email.is_empty()).count();
        self.phone_count = leads.iter().filter(|l| !l.phone.is_empty()).count();
        self
    }
}
