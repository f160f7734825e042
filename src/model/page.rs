//! Page records produced by page sitemap parsers.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default page priority, used when a sitemap omits the value or supplies an
/// unparseable one.
pub const SITEMAP_PAGE_DEFAULT_PRIORITY: f64 = 0.5;

/// Change frequency of a sitemap URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeFrequency {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFrequency {
    /// Parses a change frequency value as it appears in a sitemap.
    ///
    /// Matching is case-insensitive; unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "always" => Some(Self::Always),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }

    /// Returns the lowercase wire representation of the value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for ChangeFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single story derived from the Google News sitemap extension.
///
/// Publication name and language are required for the extension to be kept on
/// a page; the remaining properties are populated when present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapNewsStory {
    pub title: Option<String>,
    pub publish_date: Option<DateTime<FixedOffset>>,
    pub publication_name: String,
    pub publication_language: String,
    pub access: Option<String>,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub stock_tickers: Vec<String>,
}

/// Single image derived from the Google Image sitemap extension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapImage {
    /// URL of the image. The only required property.
    pub loc: String,
    pub caption: Option<String>,
    pub geo_location: Option<String>,
    pub title: Option<String>,
    pub license: Option<String>,
}

/// Alternate-language link (`<xhtml:link rel="alternate">`) of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapAlternate {
    pub href: String,
    pub hreflang: String,
}

/// Single sitemap-derived page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapPage {
    /// Page URL as declared in the sitemap.
    pub url: String,

    /// Priority of this URL relative to other URLs on the site, within
    /// \[0, 1\].
    pub priority: f64,

    /// Date of last modification of the URL.
    pub last_modified: Option<DateTime<FixedOffset>>,

    /// Change frequency of the URL.
    pub change_frequency: Option<ChangeFrequency>,

    /// Google News story attached to the URL.
    pub news_story: Option<SitemapNewsStory>,

    /// Google Image records attached to the URL, in declaration order.
    pub images: Vec<SitemapImage>,

    /// Alternate-language links of the URL, in declaration order.
    pub alternates: Vec<SitemapAlternate>,
}

impl SitemapPage {
    /// Creates a page with the given URL and defaults for everything else.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            priority: SITEMAP_PAGE_DEFAULT_PRIORITY,
            last_modified: None,
            change_frequency: None,
            news_story: None,
            images: Vec::new(),
            alternates: Vec::new(),
        }
    }
}
