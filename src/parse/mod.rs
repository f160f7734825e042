//! Format-specific sitemap parsers.
//!
//! The fetch layer classifies a response body and hands it to one of these:
//! robots.txt directive extraction, plain text URL lists, or the streaming
//! XML family (sitemap index, urlset, RSS, Atom).

pub(crate) mod plain_text;
pub(crate) mod robots;
pub(crate) mod xml;

/// Content-based XML detection.
///
/// Content types served for sitemaps are unpredictable, so the body is
/// inspected instead: a document whose first non-whitespace byte is `<`
/// goes to the XML dispatcher.
pub(crate) fn looks_like_xml(content: &str) -> bool {
    content.trim_start().starts_with('<')
}
