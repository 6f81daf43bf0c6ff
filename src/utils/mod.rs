//! Utility functions and helpers.

pub mod http;

use url::Url;

/// Extract the lowercase host from a URL string.
pub fn get_domain(url_str: &str) -> Option<String> {
    Url::parse(url_str)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Whether `href` points at `domain` or one of its subdomains.
///
/// Hrefs that do not parse as absolute URLs fall back to a substring test.
pub fn host_matches(href: &str, domain: &str) -> bool {
    let domain = domain.trim().to_lowercase();
    if domain.is_empty() {
        return false;
    }
    match get_domain(href) {
        Some(host) => host == domain || host.ends_with(&format!(".{domain}")),
        None => href.to_lowercase().contains(&domain),
    }
}

/// Prefix `https://` to URLs that carry no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.starts_with("http") {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

/// Decode a possibly truncated UTF-8 body.
///
/// A character cut off at the end is dropped; other invalid bytes are
/// replaced.
pub fn utf8_prefix(mut bytes: Vec<u8>) -> String {
    if let Err(e) = std::str::from_utf8(&bytes) {
        if e.error_len().is_none() {
            bytes.truncate(e.valid_up_to());
        }
    }
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}
