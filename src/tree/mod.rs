//! Top-level sitemap tree discovery.
//!
//! Builds the tree for a website's homepage by mining robots.txt for
//! `Sitemap:` directives and probing a handful of well-known paths, then
//! mounting everything under a synthetic root node.

use crate::client::{ReqwestWebClient, WebClient};
use crate::fetch::{fetch_sitemap, FetchContext};
use crate::model::{IndexSitemap, InvalidSitemap, PagesSitemap, Sitemap, SitemapPage};
use crate::parse::xml::{parse_xml, XmlOutcome, XmlPagesKind};
use crate::parse::{looks_like_xml, plain_text};
use crate::util::{is_http_url, strip_url_to_homepage};
use crate::{Result, SitemapError};
use std::collections::HashSet;

/// Well-known paths probed for sitemaps that robots.txt doesn't mention.
pub const DEFAULT_KNOWN_SITEMAP_PATHS: &[&str] = &[
    "sitemap.xml",
    "sitemap_index.xml",
    "sitemap-index.xml",
    "sitemap.xml.gz",
    "sitemap_news.xml",
];

/// URL assigned to sitemaps parsed from a string, where no real URL exists.
const LOCAL_CONTENT_URL: &str = "http://usp-local-content.invalid/";

/// Per-URL filter: keep a candidate sub-sitemap URL?
///
/// Receives the URL, the recursion level it would be fetched at, and the
/// final URLs of every enclosing sitemap.
pub type UrlFilter = Box<dyn Fn(&str, u32, &HashSet<String>) -> bool + Send + Sync>;

/// List filter: replaces an index's declared child URL list with a
/// (possibly re-ordered) subset before the per-URL filter runs.
pub type UrlListFilter = Box<dyn Fn(Vec<String>, u32, &HashSet<String>) -> Vec<String> + Send + Sync>;

/// Options controlling tree discovery.
pub struct TreeOptions {
    /// Discover sitemaps through robots.txt `Sitemap:` directives.
    pub use_robots_txt: bool,

    /// Probe the well-known sitemap paths.
    pub use_known_paths: bool,

    /// Extra paths (relative to the homepage) probed after the defaults.
    pub extra_known_paths: Vec<String>,

    /// Per-URL filter applied to every candidate sub-sitemap URL.
    pub url_filter: Option<UrlFilter>,

    /// List filter applied to an index's declared children, before the
    /// per-URL filter.
    pub list_filter: Option<UrlListFilter>,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            use_robots_txt: true,
            use_known_paths: true,
            extra_known_paths: Vec::new(),
            url_filter: None,
            list_filter: None,
        }
    }
}

impl std::fmt::Debug for TreeOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeOptions")
            .field("use_robots_txt", &self.use_robots_txt)
            .field("use_known_paths", &self.use_known_paths)
            .field("extra_known_paths", &self.extra_known_paths)
            .field("url_filter", &self.url_filter.is_some())
            .field("list_filter", &self.list_filter.is_some())
            .finish()
    }
}

/// Fetches the sitemap tree for a website using the default web client and
/// options.
///
/// # Example
///
/// ```no_run
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let tree = usp::sitemap_tree_for_homepage("https://www.example.com/").await?;
/// for page in tree.all_pages() {
///     println!("{}", page.url);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn sitemap_tree_for_homepage(homepage_url: &str) -> Result<Sitemap> {
    sitemap_tree_for_homepage_with(homepage_url, None, TreeOptions::default()).await
}

/// Fetches the sitemap tree for a website.
///
/// The homepage URL is stripped to its root (scheme, host, port); anything
/// else in the input is discarded with a warning. A `None` web client means
/// the default [`ReqwestWebClient`].
///
/// # Errors
///
/// Only misuse errors are returned: a homepage URL that is not HTTP(S), or
/// a default web client that cannot be constructed. Every failure during
/// discovery is localised to an [`InvalidSitemap`] node inside the tree.
pub async fn sitemap_tree_for_homepage_with(
    homepage_url: &str,
    web_client: Option<&dyn WebClient>,
    options: TreeOptions,
) -> Result<Sitemap> {
    if !is_http_url(homepage_url) {
        return Err(SitemapError::NotHttpUrl(homepage_url.to_string()));
    }

    let homepage = strip_url_to_homepage(homepage_url)?;
    if homepage != homepage_url {
        tracing::warn!("Assuming that the homepage of {homepage_url} is {homepage}");
    }

    let fallback_client;
    let client: &dyn WebClient = match web_client {
        Some(client) => client,
        None => {
            fallback_client = ReqwestWebClient::new()?;
            &fallback_client
        }
    };
    let ctx = FetchContext {
        client,
        options: &options,
    };

    // The root is an enclosing sitemap too: a robots.txt declaring the
    // homepage itself as a sitemap is a cycle.
    let mut root_ancestors = HashSet::new();
    root_ancestors.insert(homepage.clone());

    let mut sub_sitemaps: Vec<Sitemap> = Vec::new();
    let mut attached_urls: HashSet<String> = HashSet::new();
    let mut robots_seen: HashSet<String> = HashSet::new();

    if options.use_robots_txt {
        let robots_url = format!("{homepage}robots.txt");
        let fetched = fetch_sitemap(&ctx, &robots_url, 1, &root_ancestors).await;
        match fetched.sitemap {
            Sitemap::Invalid(invalid) => {
                tracing::info!(
                    "No usable robots.txt at {}: {}",
                    invalid.url,
                    invalid.reason
                );
            }
            robots_sitemap => {
                for descendant in robots_sitemap.all_sitemaps() {
                    robots_seen.insert(descendant.url().to_string());
                }
                attached_urls.insert(robots_sitemap.url().to_string());
                sub_sitemaps.push(robots_sitemap);
            }
        }
    }

    if options.use_known_paths {
        let paths = DEFAULT_KNOWN_SITEMAP_PATHS
            .iter()
            .map(|path| (*path).to_string())
            .chain(options.extra_known_paths.iter().cloned());

        for path in paths {
            let candidate_url = format!("{homepage}{path}");

            // Don't refetch URLs already discovered through robots.txt.
            if robots_seen.contains(&candidate_url) {
                tracing::debug!("Not re-fetching {candidate_url}, found in robots.txt");
                continue;
            }

            let fetched = fetch_sitemap(&ctx, &candidate_url, 1, &root_ancestors).await;
            let sitemap_url = fetched.sitemap.url().to_string();

            if robots_seen.contains(&sitemap_url) {
                tracing::debug!("Not attaching {sitemap_url}, found in robots.txt");
                continue;
            }

            if fetched.sitemap.is_invalid() && fetched.error_status == Some(404) {
                tracing::debug!("No sitemap at {candidate_url}");
                continue;
            }

            if !attached_urls.insert(sitemap_url.clone()) {
                tracing::debug!("Duplicate root child {sitemap_url}, keeping the first");
                continue;
            }
            sub_sitemaps.push(fetched.sitemap);
        }
    }

    Ok(Sitemap::IndexWebsite(IndexSitemap {
        url: homepage,
        sub_sitemaps,
    }))
}

/// Parses a single sitemap document from a string, without any network
/// access.
///
/// XML index documents yield an [`Sitemap::IndexXml`] whose children are
/// [`InvalidSitemap`] placeholders, since sub-sitemaps cannot be fetched.
/// Non-XML content is parsed as a plain text sitemap.
pub fn sitemap_from_str(content: &str) -> Sitemap {
    if looks_like_xml(content) {
        return match parse_xml(LOCAL_CONTENT_URL, content) {
            XmlOutcome::Index(child_urls) => {
                let sub_sitemaps = child_urls
                    .into_iter()
                    .map(|url| {
                        Sitemap::Invalid(InvalidSitemap {
                            url,
                            reason: "Un-fetched child sitemap".to_string(),
                        })
                    })
                    .collect();
                Sitemap::IndexXml(IndexSitemap {
                    url: LOCAL_CONTENT_URL.to_string(),
                    sub_sitemaps,
                })
            }
            XmlOutcome::Pages(kind, pages) => match PagesSitemap::new(LOCAL_CONTENT_URL, pages) {
                Ok(sitemap) => match kind {
                    XmlPagesKind::Urlset => Sitemap::PagesXml(sitemap),
                    XmlPagesKind::Rss => Sitemap::PagesRss(sitemap),
                    XmlPagesKind::Atom => Sitemap::PagesAtom(sitemap),
                },
                Err(e) => Sitemap::Invalid(InvalidSitemap {
                    url: LOCAL_CONTENT_URL.to_string(),
                    reason: format!("Unable to store pages: {e}"),
                }),
            },
            XmlOutcome::Unsupported(reason) => Sitemap::Invalid(InvalidSitemap {
                url: LOCAL_CONTENT_URL.to_string(),
                reason,
            }),
        };
    }

    let pages: Vec<SitemapPage> = plain_text::page_urls_from_text(content)
        .into_iter()
        .map(SitemapPage::new)
        .collect();
    match PagesSitemap::new(LOCAL_CONTENT_URL, pages) {
        Ok(sitemap) => Sitemap::PagesText(sitemap),
        Err(e) => Sitemap::Invalid(InvalidSitemap {
            url: LOCAL_CONTENT_URL.to_string(),
            reason: format!("Unable to store pages: {e}"),
        }),
    }
}
