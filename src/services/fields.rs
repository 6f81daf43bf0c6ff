// src/services/fields.rs

//! Field extractors.
//!
//! Each extractor accepts absent input and never fails; a miss yields an
//! empty string or an empty list.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::dom::DocumentAdapter;

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}|\+\d{1,3}[-.\s]?\d{1,4}[-.\s]?\d{1,4}[-.\s]?\d{1,9}",
    )
    .expect("valid phone regex")
});
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}").expect("valid email regex")
});
static RATING_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d.]+)\s*star").expect("valid rating regex"));
static REVIEW_COUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?([\d,]+)\)?").expect("valid review count regex"));

/// Text content and accessible label captured from one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFields {
    pub text: String,
    pub aria_label: String,
}

impl ElementFields {
    pub fn new(text: impl Into<String>, aria_label: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            aria_label: aria_label.into(),
        }
    }

    /// Snapshot a document node.
    pub fn capture<'a, D: DocumentAdapter>(doc: &'a D, node: D::Node<'a>) -> Self {
        Self {
            text: doc.text(node),
            aria_label: doc.attr(node, "aria-label").unwrap_or_default(),
        }
    }
}

/// First phone number in `text`, or an empty string.
pub fn extract_phone(text: Option<&str>) -> String {
    text.and_then(|t| PHONE_RE.find(t))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Distinct email addresses in `text`, in order of first appearance.
pub fn extract_emails(text: Option<&str>) -> Vec<String> {
    let Some(text) = text else {
        return Vec::new();
    };
    let mut seen = HashSet::new();
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect()
}

/// Rating from a "4.5 stars" label, else the element's trimmed text.
pub fn extract_rating(el: Option<&ElementFields>) -> String {
    let Some(el) = el else {
        return String::new();
    };
    if let Some(caps) = RATING_LABEL_RE.captures(&el.aria_label) {
        return caps[1].to_string();
    }
    el.text.trim().to_string()
}

/// Digits of a review count such as "(1,234)", or an empty string.
pub fn extract_review_count(el: Option<&ElementFields>) -> String {
    el.and_then(|el| REVIEW_COUNT_RE.captures(el.text.trim()))
        .map(|caps| caps[1].replace(',', ""))
        .unwrap_or_default()
}
