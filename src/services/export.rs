//! CSV export and email listing.

use std::collections::HashSet;
use std::io;

use chrono::{NaiveDate, SecondsFormat};
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::Lead;

/// Separator used to flatten social links into one column.
const SOCIAL_SEPARATOR: &str = "; ";

/// Column titles, in [`LeadRow`] field order.
pub const HEADERS: [&str; 11] = [
    "Business Name",
    "Address",
    "Phone",
    "Website",
    "Email",
    "Rating",
    "Reviews",
    "Category",
    "Hours",
    "Social Links",
    "Scraped At",
];

#[derive(Serialize)]
struct LeadRow<'a> {
    name: &'a str,
    address: &'a str,
    phone: &'a str,
    website: &'a str,
    email: &'a str,
    rating: &'a str,
    review_count: &'a str,
    category: &'a str,
    hours: &'a str,
    social_links: String,
    scraped_at: String,
}

impl<'a> From<&'a Lead> for LeadRow<'a> {
    fn from(lead: &'a Lead) -> Self {
        Self {
            name: &lead.name,
            address: &lead.address,
            phone: &lead.phone,
            website: &lead.website,
            email: &lead.email,
            rating: &lead.rating,
            review_count: &lead.review_count,
            category: &lead.category,
            hours: &lead.hours,
            social_links: lead.social_links.join(SOCIAL_SEPARATOR),
            scraped_at: lead.scraped_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }
}

/// Write a header row plus one row per lead.
///
/// The header is written even when there are no leads. Fields containing a
/// comma, a double quote or a line break are quoted.
pub fn write_csv<W: io::Write>(writer: W, leads: &[Lead]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(HEADERS)?;
    for lead in leads {
        wtr.serialize(LeadRow::from(lead))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Render the CSV document in memory.
pub fn to_csv_string(leads: &[Lead]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, leads)?;
    String::from_utf8(buf).map_err(|e| AppError::validation(format!("CSV is not UTF-8: {e}")))
}

/// Download name for an export made on `date`.
pub fn default_file_name(date: NaiveDate) -> String {
    format!("leadharvest-{}.csv", date.format("%Y-%m-%d"))
}

/// Distinct non-empty emails in lead order.
pub fn unique_emails(leads: &[Lead]) -> Vec<String> {
    let mut seen = HashSet::new();
    leads
        .iter()
        .map(|lead| lead.email.as_str())
        .filter(|email| !email.is_empty() && seen.insert(*email))
        .map(str::to_string)
        .collect()
}
