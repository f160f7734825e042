//! RSS 2.0 and Atom 0.3/1.0 feed handlers.
//!
//! News sites frequently publish their sitemap as a feed, so both formats
//! are accepted as page sitemaps. Matching is by local name: feed flavours
//! disagree on namespaces and many documents in the wild declare none.

use crate::model::SitemapPage;
use crate::parse::xml::{attr_value, ElementName, XmlHandler, XmlOutcome, XmlPagesKind};
use crate::util::parse_date;
use std::collections::HashSet;

/// Raw properties of one RSS `<item>`.
#[derive(Default)]
struct RssItemRow {
    link: Option<String>,
    title: Option<String>,
    description: Option<String>,
    publication_date: Option<String>,
}

/// RSS 2.0 handler. One page per `<item>` that carries a link, title and
/// description; `<pubDate>` supplies the modification time.
pub(super) struct RssHandler {
    pages: Vec<SitemapPage>,
    seen_links: HashSet<String>,
    current_item: Option<RssItemRow>,
}

impl RssHandler {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            seen_links: HashSet::new(),
            current_item: None,
        }
    }
}

impl XmlHandler for RssHandler {
    fn element_start(&mut self, name: &ElementName, _attrs: &[(String, String)]) {
        if name.is_local("item") {
            self.current_item = Some(RssItemRow::default());
        }
    }

    fn element_end(&mut self, name: &ElementName, text: Option<String>) {
        if name.is_local("item") {
            let Some(row) = self.current_item.take() else {
                return;
            };
            let (Some(link), Some(_title), Some(_description)) =
                (row.link, row.title, row.description)
            else {
                tracing::debug!("Dropping RSS item without link, title and description");
                return;
            };

            if self.seen_links.insert(link.clone()) {
                let mut page = SitemapPage::new(link);
                page.last_modified = row.publication_date.as_deref().and_then(parse_date);
                self.pages.push(page);
            }
            return;
        }

        let Some(item) = self.current_item.as_mut() else {
            // Channel-level title/link/description are ignored.
            return;
        };

        if name.is_local("link") {
            if text.is_some() {
                item.link = text;
            }
        } else if name.is_local("title") {
            if text.is_some() {
                item.title = text;
            }
        } else if name.is_local("description") {
            if text.is_some() {
                item.description = text;
            }
        } else if name.is_local("pubDate") {
            item.publication_date = text;
        }
    }

    fn outcome(&mut self) -> XmlOutcome {
        XmlOutcome::Pages(XmlPagesKind::Rss, std::mem::take(&mut self.pages))
    }
}

/// Raw properties of one Atom `<entry>`.
#[derive(Default)]
struct AtomEntryRow {
    alternate_link: Option<String>,
    plain_link: Option<String>,
    updated: Option<String>,
    modified: Option<String>,
    issued: Option<String>,
}

/// Atom 0.3 / 1.0 handler. The two versions differ in their timestamp
/// element (`issued`/`modified` vs `updated`) but are otherwise close enough
/// to share a parser; the version is not distinguished.
pub(super) struct AtomHandler {
    pages: Vec<SitemapPage>,
    seen_links: HashSet<String>,
    current_entry: Option<AtomEntryRow>,
}

impl AtomHandler {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            seen_links: HashSet::new(),
            current_entry: None,
        }
    }
}

impl XmlHandler for AtomHandler {
    fn element_start(&mut self, name: &ElementName, attrs: &[(String, String)]) {
        if name.is_local("entry") {
            self.current_entry = Some(AtomEntryRow::default());
            return;
        }

        if name.is_local("link") {
            let Some(entry) = self.current_entry.as_mut() else {
                return;
            };
            let Some(href) = attr_value(attrs, "href") else {
                return;
            };

            match attr_value(attrs, "rel") {
                Some(rel) if rel.eq_ignore_ascii_case("alternate") => {
                    if entry.alternate_link.is_none() {
                        entry.alternate_link = Some(href.to_string());
                    }
                }
                None => {
                    if entry.plain_link.is_none() {
                        entry.plain_link = Some(href.to_string());
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn element_end(&mut self, name: &ElementName, text: Option<String>) {
        if name.is_local("entry") {
            let Some(row) = self.current_entry.take() else {
                return;
            };
            let Some(link) = row.alternate_link.or(row.plain_link) else {
                tracing::debug!("Dropping Atom entry without a usable link");
                return;
            };

            if self.seen_links.insert(link.clone()) {
                let mut page = SitemapPage::new(link);
                page.last_modified = row
                    .updated
                    .or(row.modified)
                    .or(row.issued)
                    .as_deref()
                    .and_then(parse_date);
                self.pages.push(page);
            }
            return;
        }

        let Some(entry) = self.current_entry.as_mut() else {
            return;
        };

        if name.is_local("updated") {
            entry.updated = text;
        } else if name.is_local("modified") {
            entry.modified = text;
        } else if name.is_local("issued") {
            entry.issued = text;
        }
    }

    fn outcome(&mut self) -> XmlOutcome {
        XmlOutcome::Pages(XmlPagesKind::Atom, std::mem::take(&mut self.pages))
    }
}
