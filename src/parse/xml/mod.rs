//! Streaming XML sitemap parsing.
//!
//! A single event loop over the document identifies the root element and
//! routes the remaining events to a concrete handler: sitemap index, urlset,
//! RSS 2.0 or Atom. Namespaces are resolved into coarse buckets so that
//! extension elements (Google News, Google Image, XHTML alternate links) are
//! recognised while elements from unknown namespaces are ignored. Documents
//! without any namespace declarations still parse by local name.
//!
//! Malformed or truncated documents are parsed as far as possible; whatever
//! was collected up to the error is kept.

mod feeds;
mod urlset;

use crate::model::SitemapPage;
use crate::util::clean_text;
use feeds::{AtomHandler, RssHandler};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::reader::NsReader;
use std::collections::HashSet;
use urlset::UrlsetHandler;

/// Kind of page sitemap an XML document turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum XmlPagesKind {
    Urlset,
    Rss,
    Atom,
}

/// Result of parsing one XML document.
#[derive(Debug)]
pub(crate) enum XmlOutcome {
    /// `<sitemapindex>`: child sitemap URLs in declaration order.
    Index(Vec<String>),

    /// A page-bearing document and its parsed pages.
    Pages(XmlPagesKind, Vec<SitemapPage>),

    /// The root element is not a sitemap format this crate knows.
    Unsupported(String),
}

/// Coarse namespace bucket of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum XmlNs {
    /// Sitemaps core namespace (`.../schemas/sitemap/...`).
    Sitemap,
    /// Google News extension (`.../schemas/sitemap-news/...`).
    News,
    /// Google Image extension (`.../schemas/sitemap-image/...`).
    Image,
    /// XHTML, used by alternate-language links.
    Xhtml,
    /// No namespace in scope.
    None,
    /// Anything else; elements here are ignored.
    Other,
}

/// Element name resolved to a namespace bucket plus local name.
#[derive(Debug)]
pub(super) struct ElementName {
    pub ns: XmlNs,
    pub local: String,
}

impl ElementName {
    /// Matches a sitemap-core element, tolerating missing namespace
    /// declarations.
    pub fn is_sitemap(&self, local: &str) -> bool {
        matches!(self.ns, XmlNs::Sitemap | XmlNs::None) && self.local == local
    }

    pub fn is_news(&self, local: &str) -> bool {
        self.ns == XmlNs::News && self.local == local
    }

    pub fn is_image(&self, local: &str) -> bool {
        self.ns == XmlNs::Image && self.local == local
    }

    pub fn is_xhtml(&self, local: &str) -> bool {
        self.ns == XmlNs::Xhtml && self.local == local
    }

    /// Matches by local name alone, namespace ignored. Used by the feed
    /// handlers, whose documents use whatever namespace the feed flavour
    /// prescribes.
    pub fn is_local(&self, local: &str) -> bool {
        self.local == local
    }
}

/// Handler for one concrete XML sitemap format.
pub(super) trait XmlHandler {
    fn element_start(&mut self, name: &ElementName, attrs: &[(String, String)]);

    /// Called at the end of an element with the accumulated character data
    /// (entity-decoded, trimmed, `None` when empty).
    fn element_end(&mut self, name: &ElementName, text: Option<String>);

    /// Consumes the collected state into the parse outcome.
    fn outcome(&mut self) -> XmlOutcome;
}

/// Parses an XML sitemap document.
///
/// `url` is used only for log messages.
pub(crate) fn parse_xml(url: &str, content: &str) -> XmlOutcome {
    let mut reader = NsReader::from_str(content);
    reader.config_mut().trim_text(true);

    let mut handler: Option<Box<dyn XmlHandler>> = None;
    let mut text_buf = String::new();

    loop {
        match reader.read_resolved_event() {
            Ok((resolve, Event::Start(e))) => {
                let name = element_name(resolve, &e);
                let attrs = collect_attrs(&e);
                text_buf.clear();
                match handler.as_mut() {
                    Some(h) => h.element_start(&name, &attrs),
                    None => match select_handler(&name) {
                        Some(h) => handler = Some(h),
                        None => {
                            return XmlOutcome::Unsupported(format!(
                                "Unsupported root element '{}'",
                                name.local
                            ));
                        }
                    },
                }
            }
            Ok((resolve, Event::Empty(e))) => {
                let name = element_name(resolve, &e);
                let attrs = collect_attrs(&e);
                text_buf.clear();
                match handler.as_mut() {
                    Some(h) => {
                        h.element_start(&name, &attrs);
                        h.element_end(&name, None);
                    }
                    None => {
                        // A self-closing root can't contain anything useful,
                        // but it still identifies the document type.
                        match select_handler(&name) {
                            Some(h) => handler = Some(h),
                            None => {
                                return XmlOutcome::Unsupported(format!(
                                    "Unsupported root element '{}'",
                                    name.local
                                ));
                            }
                        }
                    }
                }
            }
            Ok((resolve, Event::End(e))) => {
                if let Some(h) = handler.as_mut() {
                    let name = ElementName {
                        ns: resolve_ns_bytes(resolve),
                        local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                    };
                    let text = clean_text(&text_buf);
                    h.element_end(&name, text);
                }
                text_buf.clear();
            }
            Ok((_, Event::Text(e))) => match e.unescape() {
                Ok(text) => text_buf.push_str(&text),
                Err(err) => {
                    tracing::debug!("Undecodable character data in {url}: {err}");
                }
            },
            Ok((_, Event::CData(e))) => {
                text_buf.push_str(&String::from_utf8_lossy(&e.into_inner()));
            }
            Ok((_, Event::Eof)) => break,
            Ok(_) => {}
            Err(err) => {
                // Webservers time out mid-sitemap often enough; keep what was
                // collected instead of discarding the whole document.
                tracing::warn!("Parsing sitemap from URL {url} failed: {err}");
                break;
            }
        }
    }

    match handler {
        Some(mut h) => h.outcome(),
        None => XmlOutcome::Unsupported("Document has no root element".to_string()),
    }
}

fn select_handler(name: &ElementName) -> Option<Box<dyn XmlHandler>> {
    if name.is_sitemap("urlset") {
        Some(Box::new(UrlsetHandler::new()))
    } else if name.is_sitemap("sitemapindex") {
        Some(Box::new(IndexXmlHandler::new()))
    } else if name.is_local("rss") {
        Some(Box::new(RssHandler::new()))
    } else if name.is_local("feed") {
        Some(Box::new(AtomHandler::new()))
    } else {
        None
    }
}

fn element_name(resolve: ResolveResult, e: &BytesStart) -> ElementName {
    ElementName {
        ns: resolve_ns_bytes(resolve),
        local: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
    }
}

fn resolve_ns_bytes(resolve: ResolveResult) -> XmlNs {
    match resolve {
        ResolveResult::Bound(ns) => namespace_bucket(ns.0),
        ResolveResult::Unbound => XmlNs::None,
        // An undeclared prefix still tells us what the author meant.
        ResolveResult::Unknown(prefix) => prefix_bucket(&prefix),
    }
}

fn namespace_bucket(ns: &[u8]) -> XmlNs {
    let ns = String::from_utf8_lossy(ns).to_lowercase();
    if ns.contains("/sitemap/") {
        XmlNs::Sitemap
    } else if ns.contains("/sitemap-news/") {
        XmlNs::News
    } else if ns.contains("/sitemap-image/") {
        XmlNs::Image
    } else if ns.contains("xhtml") {
        XmlNs::Xhtml
    } else {
        XmlNs::Other
    }
}

fn prefix_bucket(prefix: &[u8]) -> XmlNs {
    if prefix.eq_ignore_ascii_case(b"news") {
        XmlNs::News
    } else if prefix.eq_ignore_ascii_case(b"image") {
        XmlNs::Image
    } else if prefix.eq_ignore_ascii_case(b"xhtml") {
        XmlNs::Xhtml
    } else {
        XmlNs::Other
    }
}

fn collect_attrs(e: &BytesStart) -> Vec<(String, String)> {
    e.attributes()
        .filter_map(|attr| attr.ok())
        .map(|attr| {
            let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            (name, value)
        })
        .collect()
}

/// Returns the value of an attribute by local name.
pub(super) fn attr_value<'a>(attrs: &'a [(String, String)], name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(attr_name, _)| attr_name == name)
        .map(|(_, value)| value.as_str())
}

/// `<sitemapindex>` handler: collects child sitemap URLs.
struct IndexXmlHandler {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl IndexXmlHandler {
    fn new() -> Self {
        Self {
            urls: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl XmlHandler for IndexXmlHandler {
    fn element_start(&mut self, _name: &ElementName, _attrs: &[(String, String)]) {}

    fn element_end(&mut self, name: &ElementName, text: Option<String>) {
        if !name.is_sitemap("loc") {
            return;
        }
        let Some(sub_sitemap_url) = text else {
            return;
        };

        if !crate::util::is_http_url(&sub_sitemap_url) {
            tracing::warn!("Sub-sitemap URL does not look like one: {sub_sitemap_url}");
            return;
        }
        if self.seen.insert(sub_sitemap_url.clone()) {
            self.urls.push(sub_sitemap_url);
        }
    }

    fn outcome(&mut self) -> XmlOutcome {
        XmlOutcome::Index(std::mem::take(&mut self.urls))
    }
}
