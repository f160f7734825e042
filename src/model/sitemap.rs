//! Sitemap tree entities.
//!
//! A fetched sitemap tree is a [`Sitemap`] value: interior nodes are index
//! sitemaps (the synthetic website root, robots.txt, XML `<sitemapindex>`)
//! and leaves are page sitemaps (XML urlset, plain text, RSS, Atom) or
//! invalid placeholders. All variants share one accessor surface, so
//! traversal code never needs to branch on the concrete kind.

use crate::model::page::SitemapPage;
use crate::model::page_store::PageStore;
use serde::{Deserialize, Serialize};
use std::io;

/// One node of a sitemap tree.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub enum Sitemap {
    /// Synthetic root created for a website's homepage; its children are the
    /// robots.txt sitemap and any sitemaps found at well-known paths.
    IndexWebsite(IndexSitemap),

    /// robots.txt whose children are the sitemaps it declares.
    IndexRobotsTxt(IndexSitemap),

    /// XML `<sitemapindex>` whose children are the declared sub-sitemaps.
    IndexXml(IndexSitemap),

    /// XML `<urlset>` page sitemap.
    PagesXml(PagesSitemap),

    /// Plain text page sitemap, one URL per line.
    PagesText(PagesSitemap),

    /// RSS 2.0 feed treated as a page sitemap.
    PagesRss(PagesSitemap),

    /// Atom 0.3 / 1.0 feed treated as a page sitemap.
    PagesAtom(PagesSitemap),

    /// Placeholder for a sitemap that could not be fetched or parsed.
    Invalid(InvalidSitemap),
}

impl Sitemap {
    /// URL of this sitemap (final URL after redirects for fetched nodes).
    pub fn url(&self) -> &str {
        match self {
            Self::IndexWebsite(s) | Self::IndexRobotsTxt(s) | Self::IndexXml(s) => &s.url,
            Self::PagesXml(s) | Self::PagesText(s) | Self::PagesRss(s) | Self::PagesAtom(s) => {
                &s.url
            }
            Self::Invalid(s) => &s.url,
        }
    }

    /// Direct sub-sitemaps of this node, empty for page and invalid nodes.
    pub fn sub_sitemaps(&self) -> &[Sitemap] {
        match self {
            Self::IndexWebsite(s) | Self::IndexRobotsTxt(s) | Self::IndexXml(s) => &s.sub_sitemaps,
            _ => &[],
        }
    }

    /// Pages of this node, reloaded from the page store on every call.
    ///
    /// Empty for index and invalid nodes.
    pub fn pages(&self) -> Vec<SitemapPage> {
        match self {
            Self::PagesXml(s) | Self::PagesText(s) | Self::PagesRss(s) | Self::PagesAtom(s) => {
                s.pages()
            }
            _ => Vec::new(),
        }
    }

    /// Reason a sitemap was deemed invalid, `None` for valid nodes.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Invalid(s) => Some(&s.reason),
            _ => None,
        }
    }

    /// Returns true for the invalid placeholder variant.
    pub fn is_invalid(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    /// Depth-first pre-order iterator over all descendant sitemaps.
    ///
    /// The node itself is not yielded.
    pub fn all_sitemaps(&self) -> AllSitemaps<'_> {
        let mut stack: Vec<&Sitemap> = self.sub_sitemaps().iter().collect();
        stack.reverse();
        AllSitemaps { stack }
    }

    /// Iterator over the pages of this node and all descendants, in
    /// depth-first pre-order.
    ///
    /// Page lists are loaded one leaf at a time and released before the
    /// iterator advances to the next leaf, so resident memory stays bounded
    /// by the largest single sitemap.
    pub fn all_pages(&self) -> AllPages<'_> {
        AllPages {
            stack: vec![self],
            current: Vec::new().into_iter(),
        }
    }
}

/// Index sitemap payload: a URL plus the fetched children in declaration
/// order.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexSitemap {
    pub url: String,
    pub sub_sitemaps: Vec<Sitemap>,
}

/// Invalid sitemap payload: the URL plus a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidSitemap {
    pub url: String,
    pub reason: String,
}

/// Page sitemap payload. The page list lives in a scratch file owned by the
/// node; `pages()` reloads it on every call.
#[derive(Debug)]
pub struct PagesSitemap {
    url: String,
    store: PageStore,
}

impl PagesSitemap {
    /// Creates a page sitemap, spilling `pages` to a fresh scratch file.
    pub fn new(url: impl Into<String>, pages: Vec<SitemapPage>) -> io::Result<Self> {
        let store = PageStore::new(&pages)?;
        Ok(Self {
            url: url.into(),
            store,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reloads the page list from the scratch file.
    ///
    /// A reload failure is logged and yields an empty list so that tree
    /// traversal can continue.
    pub fn pages(&self) -> Vec<SitemapPage> {
        match self.store.load() {
            Ok(pages) => pages,
            Err(e) => {
                tracing::error!("Failed to reload pages for sitemap {}: {}", self.url, e);
                Vec::new()
            }
        }
    }
}

impl PartialEq for PagesSitemap {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url && self.pages() == other.pages()
    }
}

#[derive(Serialize)]
struct PagesSitemapRepr<'a> {
    url: &'a str,
    pages: Vec<SitemapPage>,
}

#[derive(Deserialize)]
struct PagesSitemapData {
    url: String,
    pages: Vec<SitemapPage>,
}

// Whole-object persistence inlines the page data; deserialising re-spills it
// to a fresh scratch file.
impl Serialize for PagesSitemap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        PagesSitemapRepr {
            url: &self.url,
            pages: self.pages(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PagesSitemap {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let data = PagesSitemapData::deserialize(deserializer)?;
        PagesSitemap::new(data.url, data.pages).map_err(serde::de::Error::custom)
    }
}

/// Depth-first pre-order iterator over descendant sitemaps.
pub struct AllSitemaps<'a> {
    stack: Vec<&'a Sitemap>,
}

impl<'a> Iterator for AllSitemaps<'a> {
    type Item = &'a Sitemap;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        let children = node.sub_sitemaps();
        for child in children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

/// Lazy depth-first iterator over all descendant pages.
pub struct AllPages<'a> {
    stack: Vec<&'a Sitemap>,
    current: std::vec::IntoIter<SitemapPage>,
}

impl Iterator for AllPages<'_> {
    type Item = SitemapPage;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(page) = self.current.next() {
                return Some(page);
            }

            let node = self.stack.pop()?;
            if node.sub_sitemaps().is_empty() {
                // Leaf: load its pages, replacing (and thereby releasing)
                // the previous leaf's list.
                self.current = node.pages().into_iter();
            } else {
                for child in node.sub_sitemaps().iter().rev() {
                    self.stack.push(child);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages_sitemap(url: &str, page_urls: &[&str]) -> Sitemap {
        let pages = page_urls.iter().map(|u| SitemapPage::new(*u)).collect();
        Sitemap::PagesXml(PagesSitemap::new(url, pages).unwrap())
    }

    fn sample_tree() -> Sitemap {
        Sitemap::IndexWebsite(IndexSitemap {
            url: "https://example.com/".to_string(),
            sub_sitemaps: vec![
                Sitemap::IndexRobotsTxt(IndexSitemap {
                    url: "https://example.com/robots.txt".to_string(),
                    sub_sitemaps: vec![
                        pages_sitemap(
                            "https://example.com/sitemap_a.xml",
                            &["https://example.com/1", "https://example.com/2"],
                        ),
                        Sitemap::Invalid(InvalidSitemap {
                            url: "https://example.com/broken.xml".to_string(),
                            reason: "HTTP 500".to_string(),
                        }),
                    ],
                }),
                pages_sitemap("https://example.com/sitemap_b.xml", &["https://example.com/3"]),
            ],
        })
    }

    #[test]
    fn test_accessors_never_branch() {
        let tree = sample_tree();
        assert_eq!(tree.url(), "https://example.com/");
        assert_eq!(tree.sub_sitemaps().len(), 2);
        assert!(tree.pages().is_empty());
        assert!(tree.reason().is_none());

        let invalid = Sitemap::Invalid(InvalidSitemap {
            url: "https://example.com/x".to_string(),
            reason: "nope".to_string(),
        });
        assert!(invalid.sub_sitemaps().is_empty());
        assert!(invalid.pages().is_empty());
        assert_eq!(invalid.reason(), Some("nope"));
    }

    #[test]
    fn test_all_sitemaps_depth_first_pre_order() {
        let tree = sample_tree();
        let urls: Vec<&str> = tree.all_sitemaps().map(|s| s.url()).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/robots.txt",
                "https://example.com/sitemap_a.xml",
                "https://example.com/broken.xml",
                "https://example.com/sitemap_b.xml",
            ]
        );
    }

    #[test]
    fn test_all_pages_concatenates_leaves_in_order() {
        let tree = sample_tree();
        let urls: Vec<String> = tree.all_pages().map(|p| p.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://example.com/1",
                "https://example.com/2",
                "https://example.com/3",
            ]
        );
    }

    #[test]
    fn test_all_pages_on_leaf_root() {
        let leaf = pages_sitemap("https://example.com/sitemap.xml", &["https://example.com/1"]);
        let urls: Vec<String> = leaf.all_pages().map(|p| p.url).collect();
        assert_eq!(urls, vec!["https://example.com/1"]);
    }

    #[test]
    fn test_serde_round_trip_inlines_pages() {
        let tree = sample_tree();
        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("https://example.com/1"), "pages are inlined");

        let restored: Sitemap = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, restored);

        // The restored tree owns a fresh scratch file and reloads from it.
        let urls: Vec<String> = restored.all_pages().map(|p| p.url).collect();
        assert_eq!(urls.len(), 3);
    }

    #[test]
    fn test_pages_sitemap_equality_is_by_url_and_pages() {
        let a = pages_sitemap("https://example.com/s.xml", &["https://example.com/1"]);
        let b = pages_sitemap("https://example.com/s.xml", &["https://example.com/1"]);
        let c = pages_sitemap("https://example.com/s.xml", &["https://example.com/2"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
