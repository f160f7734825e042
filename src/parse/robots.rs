//! robots.txt parsing, restricted to `Sitemap:` directives.
//!
//! Everything else in the file (User-agent groups, Allow/Disallow rules,
//! comments) is ignored: this crate discovers sitemaps, it does not decide
//! what may be crawled.

use crate::util::is_http_url;

/// Extracts sitemap URLs declared in robots.txt content.
///
/// Both `Sitemap:` and the occasionally-seen `Site-map:` key are accepted,
/// case-insensitively. URLs are returned in declaration order with their
/// original case; duplicates and values that are not absolute HTTP(S) URLs
/// are dropped.
pub fn sitemap_urls_from_robots_txt(content: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once(':') else {
            continue;
        };

        let key = key.trim();
        if !(key.eq_ignore_ascii_case("sitemap") || key.eq_ignore_ascii_case("site-map")) {
            continue;
        }

        let sitemap_url = value.trim();
        if !is_http_url(sitemap_url) {
            tracing::warn!("Sitemap URL {sitemap_url} doesn't look like an URL, skipping");
            continue;
        }

        if urls.iter().any(|existing| existing == sitemap_url) {
            continue;
        }
        urls.push(sitemap_url.to_string());
    }

    urls
}
