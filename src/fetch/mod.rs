//! Sitemap fetching, classification and recursion control.
//!
//! [`fetch_sitemap`] handles one recursion frame: enforce the depth bound
//! and cycle checks, fetch the URL with retries, classify the body (robots,
//! XML, plain text), parse it, and for index documents re-enter itself for
//! every declared child. Failures never propagate; every failing node
//! becomes an [`InvalidSitemap`] so siblings keep parsing.

use crate::client::{ErrorResponse, SuccessResponse, WebClient};
use crate::model::{IndexSitemap, InvalidSitemap, PagesSitemap, Sitemap, SitemapPage};
use crate::parse::xml::{parse_xml, XmlOutcome, XmlPagesKind};
use crate::parse::{looks_like_xml, plain_text, robots};
use crate::tree::TreeOptions;
use crate::util::{decode_body, maybe_gunzip};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

/// Maximum sitemap nesting depth below the synthetic root.
const MAX_RECURSION_DEPTH: u32 = 10;

/// How many times a retryable fetch is attempted before giving up.
const MAX_FETCH_ATTEMPTS: u32 = 5;

/// Pause between retries.
const RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Invariant state shared by every frame of one tree build.
pub(crate) struct FetchContext<'a> {
    pub client: &'a dyn WebClient,
    pub options: &'a TreeOptions,
}

/// A fetched (or failed) sitemap plus the HTTP status of the failure, which
/// the orchestrator uses to silence 404s on well-known path probes.
pub(crate) struct FetchedSitemap {
    pub sitemap: Sitemap,
    pub error_status: Option<u16>,
}

impl FetchedSitemap {
    fn ok(sitemap: Sitemap) -> Self {
        Self {
            sitemap,
            error_status: None,
        }
    }

    fn invalid(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            sitemap: Sitemap::Invalid(InvalidSitemap {
                url: url.into(),
                reason: reason.into(),
            }),
            error_status: None,
        }
    }
}

/// Fetches and parses the sitemap at `url`, recursing into sub-sitemaps.
///
/// `level` is the node's depth below the synthetic root (direct children of
/// the root are level 1); `ancestors` holds the final URLs of every
/// enclosing sitemap, including the root's homepage URL.
pub(crate) async fn fetch_sitemap(
    ctx: &FetchContext<'_>,
    url: &str,
    level: u32,
    ancestors: &HashSet<String>,
) -> FetchedSitemap {
    if level > MAX_RECURSION_DEPTH {
        tracing::warn!("Not fetching {url}: recursion depth exceeded");
        return FetchedSitemap::invalid(url, "recursion depth exceeded");
    }

    if ancestors.contains(url) {
        tracing::warn!("Not fetching {url}: recursive sitemap");
        return FetchedSitemap::invalid(url, "recursive sitemap");
    }

    tracing::info!("Fetching level {level} sitemap from {url}");
    let response = match get_with_retries(ctx.client, url).await {
        Ok(response) => response,
        Err(error) => {
            return FetchedSitemap {
                sitemap: Sitemap::Invalid(InvalidSitemap {
                    url: url.to_string(),
                    reason: format!("Unable to fetch sitemap from {url}: {error}"),
                }),
                error_status: error.status,
            };
        }
    };

    let final_url = response.final_url.clone();
    if final_url != url && ancestors.contains(&final_url) {
        tracing::warn!("Not parsing {url}: redirects to ancestor {final_url}");
        return FetchedSitemap::invalid(final_url, "recursive sitemap");
    }

    let content = response_content(&response);

    tracing::info!("Parsing sitemap from URL {final_url}");
    if is_robots_txt_url(url) || is_robots_txt_url(&final_url) {
        let child_urls = robots::sitemap_urls_from_robots_txt(&content);
        let sub_sitemaps = fetch_children(ctx, &final_url, child_urls, level, ancestors).await;
        return FetchedSitemap::ok(Sitemap::IndexRobotsTxt(IndexSitemap {
            url: final_url,
            sub_sitemaps,
        }));
    }

    if looks_like_xml(&content) {
        return match parse_xml(&final_url, &content) {
            XmlOutcome::Index(child_urls) => {
                let sub_sitemaps =
                    fetch_children(ctx, &final_url, child_urls, level, ancestors).await;
                FetchedSitemap::ok(Sitemap::IndexXml(IndexSitemap {
                    url: final_url,
                    sub_sitemaps,
                }))
            }
            XmlOutcome::Pages(kind, pages) => {
                FetchedSitemap::ok(pages_entity(final_url, kind, pages))
            }
            XmlOutcome::Unsupported(reason) => FetchedSitemap::invalid(
                final_url.clone(),
                format!("No parsers support sitemap from {final_url}: {reason}"),
            ),
        };
    }

    // Not XML and not robots.txt: plain text is the last resort. A body
    // yielding zero URLs still produces an (empty) page sitemap.
    let pages = plain_text::page_urls_from_text(&content)
        .into_iter()
        .map(SitemapPage::new)
        .collect();
    FetchedSitemap::ok(text_pages_entity(final_url, pages))
}

/// Fetches every child of an index sitemap, applying the caller's filters
/// and extending the ancestor set with the parent's final URL.
async fn fetch_children(
    ctx: &FetchContext<'_>,
    parent_final_url: &str,
    child_urls: Vec<String>,
    parent_level: u32,
    ancestors: &HashSet<String>,
) -> Vec<Sitemap> {
    let mut child_ancestors = ancestors.clone();
    child_ancestors.insert(parent_final_url.to_string());
    let child_level = parent_level + 1;

    let mut urls = child_urls;
    if let Some(list_filter) = &ctx.options.list_filter {
        urls = list_filter(urls, child_level, &child_ancestors);
    }

    let mut sub_sitemaps: Vec<Sitemap> = Vec::new();
    let mut attached_urls: HashSet<String> = HashSet::new();

    for child_url in urls {
        if let Some(url_filter) = &ctx.options.url_filter {
            if !url_filter(&child_url, child_level, &child_ancestors) {
                tracing::debug!("Child sitemap {child_url} dropped by filter");
                continue;
            }
        }

        let child = Box::pin(fetch_sitemap(ctx, &child_url, child_level, &child_ancestors)).await;

        // Two declared URLs can redirect to the same sitemap; keep the
        // first.
        if !attached_urls.insert(child.sitemap.url().to_string()) {
            tracing::debug!(
                "Duplicate child sitemap {} under {parent_final_url}, keeping the first",
                child.sitemap.url()
            );
            continue;
        }
        sub_sitemaps.push(child.sitemap);
    }

    sub_sitemaps
}

/// Fetches a URL, retrying retryable failures a few times.
async fn get_with_retries(
    client: &dyn WebClient,
    url: &str,
) -> Result<SuccessResponse, ErrorResponse> {
    let mut attempt = 0;
    loop {
        match client.get(url).await {
            Ok(response) => return Ok(response),
            Err(error) => {
                attempt += 1;
                tracing::warn!("Request for URL {url} failed: {error}");
                if !error.retryable || attempt >= MAX_FETCH_ATTEMPTS {
                    return Err(error);
                }
                tracing::info!("Retrying URL {url} in {}s", RETRY_PAUSE.as_secs());
                tokio::time::sleep(RETRY_PAUSE).await;
            }
        }
    }
}

/// Decompresses (when needed) and decodes a response body.
fn response_content(response: &SuccessResponse) -> String {
    let body = maybe_gunzip(
        &response.final_url,
        response.header("content-type"),
        response.header("content-encoding"),
        response.body.clone(),
    );
    decode_body(&body)
}

/// Returns true if the URL path names a robots.txt file.
fn is_robots_txt_url(url: &str) -> bool {
    Url::parse(url)
        .map(|u| u.path().to_lowercase().ends_with("robots.txt"))
        .unwrap_or(false)
}

fn pages_entity(url: String, kind: XmlPagesKind, pages: Vec<SitemapPage>) -> Sitemap {
    match PagesSitemap::new(url.clone(), pages) {
        Ok(sitemap) => match kind {
            XmlPagesKind::Urlset => Sitemap::PagesXml(sitemap),
            XmlPagesKind::Rss => Sitemap::PagesRss(sitemap),
            XmlPagesKind::Atom => Sitemap::PagesAtom(sitemap),
        },
        Err(e) => store_failure(url, e),
    }
}

fn text_pages_entity(url: String, pages: Vec<SitemapPage>) -> Sitemap {
    match PagesSitemap::new(url.clone(), pages) {
        Ok(sitemap) => Sitemap::PagesText(sitemap),
        Err(e) => store_failure(url, e),
    }
}

fn store_failure(url: String, error: std::io::Error) -> Sitemap {
    tracing::error!("Unable to store pages of sitemap {url}: {error}");
    Sitemap::Invalid(InvalidSitemap {
        reason: format!("Unable to store pages of sitemap {url}: {error}"),
        url,
    })
}
