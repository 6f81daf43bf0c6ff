// src/services/records.rs

//! Record builder.
//!
//! Turns a rendered directory page into [`Lead`] records. Result cards are
//! located with a cascade of listing strategies: the first strategy that
//! produces at least one named lead wins. The detail view is read from a
//! single panel with primary selectors and fallbacks per field.
//!
//! Missing fields are left empty. A candidate without a resolvable name is
//! discarded.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::DocumentAdapter;
use crate::models::{Config, DirectoryConfig, Lead, ListingStrategy, SelectorConfig};
use crate::services::fields::{
    ElementFields, extract_emails, extract_phone, extract_rating, extract_review_count,
};
use crate::utils::host_matches;

static ADDRESS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\s+\w+\s+(st|ave|blvd|rd|dr|ln|way|ct|pl|hwy|pike|pkwy|cir)")
        .expect("valid address regex")
});
static STATUS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)closed|open").expect("valid status regex"));
static ADDRESS_PREFIX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^Address:\s*").expect("valid address prefix regex"));
static NEWLINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n+").expect("valid newline regex"));

const MAX_CATEGORY_CHARS: usize = 50;

/// Builds leads from result cards and the detail panel.
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    selectors: SelectorConfig,
    directory: DirectoryConfig,
}

impl RecordBuilder {
    pub fn new(selectors: SelectorConfig, directory: DirectoryConfig) -> Self {
        Self {
            selectors,
            directory,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.selectors.clone(), config.directory.clone())
    }

    /// Scrape every visible result card.
    ///
    /// Names are unique within the returned list; the first card carrying a
    /// name wins.
    pub fn scrape_cards<D: DocumentAdapter>(&self, doc: &D) -> Vec<Lead> {
        for (idx, strategy) in self.selectors.cards.strategies.iter().enumerate() {
            let mut seen = HashSet::new();
            let leads: Vec<Lead> = self
                .candidates(doc, strategy)
                .into_iter()
                .filter_map(|card| self.scrape_card(doc, card))
                .filter(|lead| seen.insert(lead.name.clone()))
                .collect();

            if !leads.is_empty() {
                log::debug!(
                    "Listing strategy {} produced {} lead(s)",
                    idx + 1,
                    leads.len()
                );
                return leads;
            }
        }
        log::debug!("No listing strategy produced a lead");
        Vec::new()
    }

    fn candidates<'a, D: DocumentAdapter>(
        &self,
        doc: &'a D,
        strategy: &ListingStrategy,
    ) -> Vec<D::Node<'a>> {
        match strategy {
            ListingStrategy::Children { container } => doc
                .query(doc.root(), container)
                .map(|feed| doc.children(feed))
                .unwrap_or_default(),
            ListingStrategy::Query { selector, closest } => doc
                .query_all(doc.root(), selector)
                .into_iter()
                .map(|node| match closest {
                    Some(sel) => doc.closest(node, sel).unwrap_or(node),
                    None => node,
                })
                .collect(),
        }
    }

    /// Build a lead from one result card, or `None` if it has no name.
    pub fn scrape_card<'a, D: DocumentAdapter>(
        &self,
        doc: &'a D,
        card: D::Node<'a>,
    ) -> Option<Lead> {
        let sel = &self.selectors.cards;

        let name = non_empty(text_of(doc, doc.query(card, &sel.name)))
            .or_else(|| non_empty(attr_of(doc, Some(card), "aria-label")))?;
        let mut lead = Lead::new(name);

        lead.rating = extract_rating(fields_of(doc, doc.query(card, &sel.rating)).as_ref());
        lead.review_count =
            extract_review_count(fields_of(doc, doc.query(card, &sel.review_count)).as_ref());

        for block in doc.query_all(card, &sel.info_blocks) {
            let text = text_of(doc, Some(block));
            if lead.phone.is_empty() {
                lead.phone = extract_phone(Some(&text));
            }
            if lead.address.is_empty() && ADDRESS_RE.is_match(&text) {
                lead.address = text;
            }
        }

        lead.category = doc
            .query_all(card, &sel.category)
            .into_iter()
            .map(|node| text_of(doc, Some(node)))
            .find(|text| is_category(text))
            .unwrap_or_default();

        lead.website = doc
            .query_all(card, &sel.website)
            .into_iter()
            .filter_map(|a| non_empty(attr_of(doc, Some(a), "href")))
            .find(|href| self.is_external(href))
            .unwrap_or_default();

        lead.hours = text_of(doc, doc.query(card, &sel.hours));
        Some(lead)
    }

    /// Build a lead from the open detail panel.
    ///
    /// Returns `None` when no panel is present or it carries no name.
    pub fn scrape_detail<D: DocumentAdapter>(&self, doc: &D) -> Option<Lead> {
        let sel = &self.selectors.detail;
        let panel = doc.query(doc.root(), &sel.panel)?;

        let name = non_empty(text_of(doc, doc.query(panel, &sel.name)))?;
        let mut lead = Lead::new(name);

        lead.rating = extract_rating(fields_of(doc, doc.query(panel, &sel.rating)).as_ref());
        lead.review_count =
            extract_review_count(fields_of(doc, doc.query(panel, &sel.review_count)).as_ref());

        lead.phone = self.detail_phone(doc, panel);
        lead.website = self.detail_website(doc, panel);
        lead.address = self.detail_address(doc, panel);
        lead.category = text_of(doc, doc.query(panel, &sel.category));
        lead.hours = NEWLINES_RE
            .replace_all(&text_of(doc, doc.query(panel, &sel.hours)), ", ")
            .into_owned();

        if let Some(email) = extract_emails(Some(&doc.text(panel))).into_iter().next() {
            lead.email = email;
        }

        for a in doc.query_all(panel, &sel.links) {
            let Some(href) = non_empty(attr_of(doc, Some(a), "href")) else {
                continue;
            };
            if self
                .directory
                .social_domains
                .iter()
                .any(|domain| host_matches(&href, domain))
            {
                lead.push_social_link(&href);
            }
        }

        Some(lead)
    }

    fn detail_phone<'a, D: DocumentAdapter>(&self, doc: &'a D, panel: D::Node<'a>) -> String {
        let sel = &self.selectors.detail;
        if let Some(button) = doc.query(panel, &sel.phone) {
            let phone = first_non_empty([
                extract_phone(Some(&doc.text(button))),
                extract_phone(attr_of(doc, Some(button), "aria-label").as_deref()),
            ]);
            if !phone.is_empty() {
                return phone;
            }
        }
        doc.query_all(panel, &sel.phone_fallback)
            .into_iter()
            .map(|button| {
                first_non_empty([
                    extract_phone(attr_of(doc, Some(button), "aria-label").as_deref()),
                    extract_phone(Some(&doc.text(button))),
                ])
            })
            .find(|phone| !phone.is_empty())
            .unwrap_or_default()
    }

    fn detail_website<'a, D: DocumentAdapter>(&self, doc: &'a D, panel: D::Node<'a>) -> String {
        let sel = &self.selectors.detail;
        doc.query(panel, &sel.website)
            .into_iter()
            .chain(doc.query_all(panel, &sel.website_fallback))
            .map(|a| {
                first_non_empty([
                    attr_of(doc, Some(a), "href").unwrap_or_default(),
                    text_of(doc, Some(a)),
                ])
            })
            .find(|href| !href.is_empty() && self.is_external(href))
            .unwrap_or_default()
    }

    fn detail_address<'a, D: DocumentAdapter>(&self, doc: &'a D, panel: D::Node<'a>) -> String {
        let sel = &self.selectors.detail;
        if let Some(el) = doc.query(panel, &sel.address) {
            let address = first_non_empty([text_of(doc, Some(el)), strip_address_label(doc, el)]);
            if !address.is_empty() {
                return address;
            }
        }
        doc.query_all(panel, &sel.address_fallback)
            .into_iter()
            .map(|button| {
                first_non_empty([strip_address_label(doc, button), text_of(doc, Some(button))])
            })
            .find(|address| !address.is_empty())
            .unwrap_or_default()
    }

    /// Links back into the hosting directory are not business websites.
    fn is_external(&self, href: &str) -> bool {
        !host_matches(href, &self.directory.host_domain)
    }
}

fn text_of<'a, D: DocumentAdapter>(doc: &'a D, node: Option<D::Node<'a>>) -> String {
    node.map(|n| doc.text(n).trim().to_string())
        .unwrap_or_default()
}

fn attr_of<'a, D: DocumentAdapter>(
    doc: &'a D,
    node: Option<D::Node<'a>>,
    name: &str,
) -> Option<String> {
    node.and_then(|n| doc.attr(n, name))
}

fn fields_of<'a, D: DocumentAdapter>(
    doc: &'a D,
    node: Option<D::Node<'a>>,
) -> Option<ElementFields> {
    node.map(|n| ElementFields::capture(doc, n))
}

fn strip_address_label<'a, D: DocumentAdapter>(doc: &'a D, node: D::Node<'a>) -> String {
    let label = attr_of(doc, Some(node), "aria-label").unwrap_or_default();
    ADDRESS_PREFIX_RE.replace(label.trim(), "").into_owned()
}

fn non_empty(value: impl Into<Option<String>>) -> Option<String> {
    value
        .into()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn first_non_empty<const N: usize>(values: [String; N]) -> String {
    values
        .into_iter()
        .find_map(non_empty)
        .unwrap_or_default()
}

/// Short free text that is not a price, a count or an opening status.
fn is_category(text: &str) -> bool {
    !text.is_empty()
        && text.chars().count() < MAX_CATEGORY_CHARS
        && !text.chars().any(|c| c.is_ascii_digit())
        && !text.contains('$')
        && !STATUS_RE.is_match(text)
}
