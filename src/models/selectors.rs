// src/models/selectors.rs

//! CSS selectors for scraping a business directory.
//!
//! Defaults target the current map-search markup; every selector can be
//! overridden from `config.toml` when the markup drifts.

use serde::{Deserialize, Serialize};

/// One way of locating result cards on a listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingStrategy {
    /// Direct element children of the first element matching `container`
    Children { container: String },

    /// Every element matching `selector`, widened to the closest `closest` match
    Query {
        selector: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        closest: Option<String>,
    },
}

impl ListingStrategy {
    fn selectors(&self) -> Vec<&str> {
        match self {
            ListingStrategy::Children { container } => vec![container.as_str()],
            ListingStrategy::Query { selector, closest } => {
                let mut out = vec![selector.as_str()];
                out.extend(closest.as_deref());
                out
            }
        }
    }
}

/// Selectors applied to a result card in the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardSelectors {
    /// Fallback cascade; the first strategy producing a lead wins
    #[serde(default = "defaults::card_strategies")]
    pub strategies: Vec<ListingStrategy>,

    #[serde(default = "defaults::card_name")]
    pub name: String,

    #[serde(default = "defaults::rating")]
    pub rating: String,

    #[serde(default = "defaults::review_count")]
    pub review_count: String,

    /// Free-text blocks scanned line by line for phone and address
    #[serde(default = "defaults::card_info_blocks")]
    pub info_blocks: String,

    #[serde(default = "defaults::card_category")]
    pub category: String,

    #[serde(default = "defaults::card_website")]
    pub website: String,

    #[serde(default = "defaults::card_hours")]
    pub hours: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            strategies: defaults::card_strategies(),
            name: defaults::card_name(),
            rating: defaults::rating(),
            review_count: defaults::review_count(),
            info_blocks: defaults::card_info_blocks(),
            category: defaults::card_category(),
            website: defaults::card_website(),
            hours: defaults::card_hours(),
        }
    }
}

/// Selectors applied to the single-business detail view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    #[serde(default = "defaults::detail_panel")]
    pub panel: String,

    #[serde(default = "defaults::detail_name")]
    pub name: String,

    #[serde(default = "defaults::rating")]
    pub rating: String,

    #[serde(default = "defaults::review_count")]
    pub review_count: String,

    #[serde(default = "defaults::detail_phone")]
    pub phone: String,

    #[serde(default = "defaults::detail_phone_fallback")]
    pub phone_fallback: String,

    #[serde(default = "defaults::detail_website")]
    pub website: String,

    #[serde(default = "defaults::detail_website_fallback")]
    pub website_fallback: String,

    #[serde(default = "defaults::detail_address")]
    pub address: String,

    #[serde(default = "defaults::detail_address_fallback")]
    pub address_fallback: String,

    #[serde(default = "defaults::detail_category")]
    pub category: String,

    #[serde(default = "defaults::detail_hours")]
    pub hours: String,

    /// Anchors inspected for social profile links
    #[serde(default = "defaults::detail_links")]
    pub links: String,
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            panel: defaults::detail_panel(),
            name: defaults::detail_name(),
            rating: defaults::rating(),
            review_count: defaults::review_count(),
            phone: defaults::detail_phone(),
            phone_fallback: defaults::detail_phone_fallback(),
            website: defaults::detail_website(),
            website_fallback: defaults::detail_website_fallback(),
            address: defaults::detail_address(),
            address_fallback: defaults::detail_address_fallback(),
            category: defaults::detail_category(),
            hours: defaults::detail_hours(),
            links: defaults::detail_links(),
        }
    }
}

/// Both selector profiles.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SelectorConfig {
    #[serde(default)]
    pub cards: CardSelectors,

    #[serde(default)]
    pub detail: DetailSelectors,
}

impl SelectorConfig {
    /// Every selector string in both profiles, for validation.
    pub fn all(&self) -> Vec<&str> {
        let c = &self.cards;
        let d = &self.detail;
        let mut out: Vec<&str> = c.strategies.iter().flat_map(|s| s.selectors()).collect();
        out.extend([
            c.name.as_str(),
            c.rating.as_str(),
            c.review_count.as_str(),
            c.info_blocks.as_str(),
            c.category.as_str(),
            c.website.as_str(),
            c.hours.as_str(),
            d.panel.as_str(),
            d.name.as_str(),
            d.rating.as_str(),
            d.review_count.as_str(),
            d.phone.as_str(),
            d.phone_fallback.as_str(),
            d.website.as_str(),
            d.website_fallback.as_str(),
            d.address.as_str(),
            d.address_fallback.as_str(),
            d.category.as_str(),
            d.hours.as_str(),
            d.links.as_str(),
        ]);
        out
    }
}

mod defaults {
    use super::ListingStrategy;

    pub fn card_strategies() -> Vec<ListingStrategy> {
        vec![
            ListingStrategy::Children {
                container: r#"div[role="feed"]"#.into(),
            },
            ListingStrategy::Query {
                selector: r#"div[role="article"], div.Nv2PK, a.hfpxzc"#.into(),
                closest: Some("div".into()),
            },
            ListingStrategy::Query {
                selector: ".Nv2PK".into(),
                closest: None,
            },
        ]
    }

    pub fn card_name() -> String {
        "div.qBF1Pd, div.fontHeadlineSmall, span.fontHeadlineSmall".into()
    }
    pub fn rating() -> String {
        r#"span.MW4etd, span[role="img"][aria-label*="star"]"#.into()
    }
    pub fn review_count() -> String {
        "span.UY7F9".into()
    }
    pub fn card_info_blocks() -> String {
        "div.W4Efsd".into()
    }
    pub fn card_category() -> String {
        "span.mgr77e span, div.W4Efsd span.fontBodyMedium".into()
    }
    pub fn card_website() -> String {
        r#"a[href*="http"]"#.into()
    }
    pub fn card_hours() -> String {
        r#"span[aria-label*="hours"], span[aria-label*="Hours"], div.t39EBf"#.into()
    }

    pub fn detail_panel() -> String {
        r#"div[role="main"]"#.into()
    }
    pub fn detail_name() -> String {
        "h1.DUwDvf, h1.fontHeadlineLarge".into()
    }
    pub fn detail_phone() -> String {
        r#"button[data-item-id*="phone"] div.fontBodyMedium, button[aria-label*="Phone"]"#.into()
    }
    pub fn detail_phone_fallback() -> String {
        r#"button[aria-label*="Phone"], button[data-item-id*="phone"]"#.into()
    }
    pub fn detail_website() -> String {
        r#"a[data-item-id="authority"], a[aria-label*="Website"]"#.into()
    }
    pub fn detail_website_fallback() -> String {
        r#"a[data-item-id="authority"], a[aria-label*="Website"], a[aria-label*="website"]"#.into()
    }
    pub fn detail_address() -> String {
        r#"button[data-item-id="address"] div.fontBodyMedium, button[aria-label*="Address"]"#
            .into()
    }
    pub fn detail_address_fallback() -> String {
        r#"button[data-item-id="address"]"#.into()
    }
    pub fn detail_category() -> String {
        r#"button[jsaction*="category"]"#.into()
    }
    pub fn detail_hours() -> String {
        r#"div[aria-label*="hours"] table, div.t39EBf"#.into()
    }
    pub fn detail_links() -> String {
        "a[href]".into()
    }
}
