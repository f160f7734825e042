//! Plain text sitemap parsing: one page URL per line.

use crate::util::is_http_url;

/// Extracts page URLs from a plain text sitemap body.
///
/// Each non-empty line is trimmed and kept iff it is an absolute HTTP(S)
/// URL with a non-empty host. Order is preserved; duplicates within the
/// file are dropped (first occurrence wins).
pub fn page_urls_from_text(content: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if !is_http_url(line) {
            tracing::debug!("Line {line} doesn't look like an URL, skipping");
            continue;
        }

        if urls.iter().any(|existing| existing == line) {
            continue;
        }
        urls.push(line.to_string());
    }

    urls
}
