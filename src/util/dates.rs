//! Total parsers for sitemap timestamps and priorities.
//!
//! Sitemaps in the wild carry every imaginable date format, so parsing is
//! two-stage: the strict RFC 3339 path first, then progressively more
//! permissive fallbacks. A value nothing can make sense of yields `None`
//! (dates) or the default (priority); parse failures never propagate.

use crate::model::SITEMAP_PAGE_DEFAULT_PRIORITY;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

/// Naive datetime formats tried after the structured parsers give up.
const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parses a timestamp as found in `<lastmod>`, `<pubDate>`, `<updated>` and
/// friends.
///
/// Tries, in order: RFC 3339 (e.g. `2018-01-12T21:57:27Z`), a bare date
/// (`2018-01-12`, midnight UTC), RFC 2822 (`Tue, 10 Aug 2010 20:43:53
/// -0000`), and a few naive datetime formats assumed to be UTC.
///
/// # Returns
///
/// The parsed timestamp, or `None` if no format matched.
pub fn parse_date(date_string: &str) -> Option<DateTime<FixedOffset>> {
    let value = date_string.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date);
    }

    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|datetime| datetime.and_utc().fixed_offset());
    }

    if let Ok(date) = DateTime::parse_from_rfc2822(value) {
        return Some(date);
    }

    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(value, format) {
            return Some(datetime.and_utc().fixed_offset());
        }
    }

    tracing::debug!("Unparseable date: {value}");
    None
}

/// Parses a `<priority>` value.
///
/// Anything that is not a number within \[0, 1\] falls back to the default
/// of 0.5 with a warning.
pub fn parse_priority(value: &str) -> f64 {
    match value.trim().parse::<f64>() {
        Ok(priority) if (0.0..=1.0).contains(&priority) => priority,
        Ok(priority) => {
            tracing::warn!("Priority is not within 0 and 1: {priority}");
            SITEMAP_PAGE_DEFAULT_PRIORITY
        }
        Err(_) => {
            tracing::warn!("Invalid priority: {value}");
            SITEMAP_PAGE_DEFAULT_PRIORITY
        }
    }
}
