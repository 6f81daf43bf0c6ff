//! Lead data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A business discovered on a directory page.
///
/// Every text field uses the empty string for "unknown", which keeps the
/// merge rule uniform: a field is filled only while it is still empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Lead {
    /// Display name, also the deduplication key
    pub name: String,

    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub phone: String,

    /// External website of the business
    #[serde(default)]
    pub website: String,

    /// Decimal rating kept as text (e.g. "4.5")
    #[serde(default)]
    pub rating: String,

    /// Integer review count kept as text (e.g. "1234")
    #[serde(default)]
    pub review_count: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub hours: String,

    /// Contact email, discovered on the detail view or by crawling the website
    #[serde(default)]
    pub email: String,

    /// Social profile URLs in discovery order, without duplicates
    #[serde(default)]
    pub social_links: Vec<String>,

    pub scraped_at: DateTime<Utc>,
}

impl Lead {
    /// Create an otherwise empty lead stamped with the current time.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            address: String::new(),
            phone: String::new(),
            website: String::new(),
            rating: String::new(),
            review_count: String::new(),
            category: String::new(),
            hours: String::new(),
            email: String::new(),
            social_links: Vec::new(),
            scraped_at: Utc::now(),
        }
    }

    /// Whether the crawler should visit this lead's website.
    pub fn is_crawl_target(&self) -> bool {
        !self.website.is_empty() && self.email.is_empty()
    }

    /// Append a social link unless it is already present.
    pub fn push_social_link(&mut self, href: &str) {
        if !self.social_links.iter().any(|l| l == href) {
            self.social_links.push(href.to_string());
        }
    }

    /// Copy every field that is empty here but populated on `other`.
    ///
    /// Returns `true` when at least one field changed. Populated fields are
    /// never overwritten.
    pub fn fill_from(&mut self, other: &Lead) -> bool {
        let mut changed = false;
        for (mine, theirs) in [
            (&mut self.address, &other.address),
            (&mut self.phone, &other.phone),
            (&mut self.website, &other.website),
            (&mut self.rating, &other.rating),
            (&mut self.review_count, &other.review_count),
            (&mut self.category, &other.category),
            (&mut self.hours, &other.hours),
            (&mut self.email, &other.email),
        ] {
            if mine.is_empty() && !theirs.is_empty() {
                mine.clone_from(theirs);
                changed = true;
            }
        }
        if self.social_links.is_empty() && !other.social_links.is_empty() {
            self.social_links.clone_from(&other.social_links);
            changed = true;
        }
        changed
    }
}
