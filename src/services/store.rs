//! Deduplicating lead store.
//!
//! Leads are kept in discovery order and keyed by display name. A lead whose
//! name is already present is merged into the existing record instead of
//! being appended.

use std::collections::HashMap;

use crate::models::Lead;

/// Outcome of [`LeadStore::upsert`].
#[derive(Debug, PartialEq, Eq)]
pub enum Upsert<'a> {
    /// The name was new; the lead was appended.
    Inserted(&'a Lead),
    /// The name existed; empty fields were filled from the incoming lead.
    Merged(&'a Lead),
}

impl<'a> Upsert<'a> {
    pub fn lead(&self) -> &'a Lead {
        match self {
            Upsert::Inserted(lead) | Upsert::Merged(lead) => lead,
        }
    }

    pub fn is_new(&self) -> bool {
        matches!(self, Upsert::Inserted(_))
    }
}

/// Ordered collection of leads with unique names.
#[derive(Debug, Default, Clone)]
pub struct LeadStore {
    leads: Vec<Lead>,
    index: HashMap<String, usize>,
}

impl LeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from persisted leads, merging any duplicate names.
    pub fn from_leads(leads: Vec<Lead>) -> Self {
        let mut store = Self::new();
        for lead in leads {
            store.upsert(lead);
        }
        store
    }

    /// Insert a new lead or merge it into the one sharing its name.
    pub fn upsert(&mut self, lead: Lead) -> Upsert<'_> {
        match self.index.get(&lead.name) {
            Some(&idx) => {
                let existing = &mut self.leads[idx];
                existing.fill_from(&lead);
                Upsert::Merged(existing)
            }
            None => {
                let idx = self.leads.len();
                self.index.insert(lead.name.clone(), idx);
                self.leads.push(lead);
                Upsert::Inserted(&self.leads[idx])
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Lead> {
        self.index.get(name).map(|&idx| &self.leads[idx])
    }

    /// Mutable access for enrichment. The name must not be changed.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Lead> {
        self.index.get(name).map(|&idx| &mut self.leads[idx])
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    pub fn clear(&mut self) {
        self.leads.clear();
        self.index.clear();
    }

    /// Names of leads with a website and no email, in discovery order.
    pub fn crawl_targets(&self) -> Vec<String> {
        self.leads
            .iter()
            .filter(|lead| lead.is_crawl_target())
            .map(|lead| lead.name.clone())
            .collect()
    }
}
