//! usp: sitemap discovery and parsing.
//!
//! Given a website's homepage URL, this crate discovers the site's sitemaps
//! through robots.txt and well-known paths, fetches and parses them
//! (XML sitemap index, XML urlset with Google News / Google Image
//! extensions, plain text, RSS 2.0, Atom 0.3/1.0) and assembles the result
//! into a tree whose leaves carry page records.
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tree = usp::sitemap_tree_for_homepage("https://www.example.com/").await?;
//!
//! for sitemap in tree.all_sitemaps() {
//!     println!("sitemap: {}", sitemap.url());
//! }
//! for page in tree.all_pages() {
//!     println!("page: {}", page.url);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Failures while building the tree (unreachable hosts, HTTP errors,
//! unparseable documents, recursion cycles) never abort the build; the
//! failing node becomes an [`InvalidSitemap`] and its siblings are still
//! parsed.

pub mod client;
mod fetch;
pub mod model;
mod parse;
pub mod tree;
pub mod util;

use thiserror::Error;

pub use client::{
    ErrorResponse, ReqwestWebClient, ReqwestWebClientBuilder, SuccessResponse, WebClient,
    RETRYABLE_HTTP_STATUS_CODES,
};
pub use model::{
    ChangeFrequency, IndexSitemap, InvalidSitemap, PagesSitemap, Sitemap, SitemapAlternate,
    SitemapImage, SitemapNewsStory, SitemapPage, SITEMAP_PAGE_DEFAULT_PRIORITY,
};
pub use tree::{
    sitemap_from_str, sitemap_tree_for_homepage, sitemap_tree_for_homepage_with, TreeOptions,
    UrlFilter, UrlListFilter, DEFAULT_KNOWN_SITEMAP_PATHS,
};

/// Errors surfaced by the public API.
///
/// These cover misuse and local-environment problems only; failures while
/// fetching or parsing individual sitemaps are reported as
/// [`InvalidSitemap`] nodes within the returned tree.
#[derive(Debug, Error)]
pub enum SitemapError {
    #[error("URL {0} is not an HTTP(s) URL")]
    NotHttpUrl(String),

    #[error("Unable to determine homepage of URL {url}: {message}")]
    InvalidHomepage { url: String, message: String },

    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for usp operations.
pub type Result<T> = std::result::Result<T, SitemapError>;
