//! `<urlset>` page sitemap handler, including the Google News and Google
//! Image extensions and XHTML alternate links.

use crate::model::{
    ChangeFrequency, SitemapAlternate, SitemapImage, SitemapNewsStory, SitemapPage,
    SITEMAP_PAGE_DEFAULT_PRIORITY,
};
use crate::parse::xml::{attr_value, ElementName, XmlHandler, XmlOutcome, XmlPagesKind};
use crate::util::{parse_date, parse_priority};
use std::collections::HashSet;

/// Raw properties of one `<url>` entry, collected while parsing.
#[derive(Default)]
struct PageRow {
    loc: Option<String>,
    last_modified: Option<String>,
    change_frequency: Option<String>,
    priority: Option<String>,
    news_title: Option<String>,
    news_publish_date: Option<String>,
    news_publication_name: Option<String>,
    news_publication_language: Option<String>,
    news_access: Option<String>,
    news_genres: Option<String>,
    news_keywords: Option<String>,
    news_stock_tickers: Option<String>,
    images: Vec<SitemapImage>,
    alternates: Vec<SitemapAlternate>,
}

impl PageRow {
    /// Builds the finished page, or `None` when `<loc>` was missing.
    fn build(self) -> Option<SitemapPage> {
        let Some(url) = self.loc else {
            tracing::error!("URL is unset");
            return None;
        };

        let priority = self
            .priority
            .as_deref()
            .map(parse_priority)
            .unwrap_or(SITEMAP_PAGE_DEFAULT_PRIORITY);

        let last_modified = self.last_modified.as_deref().and_then(parse_date);

        let change_frequency = self.change_frequency.as_deref().map(|value| {
            ChangeFrequency::parse(value).unwrap_or_else(|| {
                tracing::warn!("Invalid change frequency '{value}', defaulting to 'always'");
                ChangeFrequency::Always
            })
        });

        // The extension spec marks more properties as required, but in
        // practice publication name and language are the ones websites
        // reliably provide; without those the story is useless.
        let news_story = match (self.news_publication_name, self.news_publication_language) {
            (Some(publication_name), Some(publication_language)) => Some(SitemapNewsStory {
                title: self.news_title,
                publish_date: self.news_publish_date.as_deref().and_then(parse_date),
                publication_name,
                publication_language,
                access: self.news_access,
                genres: split_comma_list(self.news_genres),
                keywords: split_comma_list(self.news_keywords),
                stock_tickers: split_comma_list(self.news_stock_tickers),
            }),
            _ => None,
        };

        Some(SitemapPage {
            url,
            priority,
            last_modified,
            change_frequency,
            news_story,
            images: self.images,
            alternates: self.alternates,
        })
    }
}

fn split_comma_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|item| item.trim().to_string())
                .filter(|item| !item.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Raw properties of one `<image:image>` entry.
#[derive(Default)]
struct ImageRow {
    loc: Option<String>,
    caption: Option<String>,
    geo_location: Option<String>,
    title: Option<String>,
    license: Option<String>,
}

impl ImageRow {
    fn build(self) -> Option<SitemapImage> {
        let loc = self.loc?;
        Some(SitemapImage {
            loc,
            caption: self.caption,
            geo_location: self.geo_location,
            title: self.title,
            license: self.license,
        })
    }
}

/// `<urlset>` handler.
pub(super) struct UrlsetHandler {
    pages: Vec<SitemapPage>,
    seen_urls: HashSet<String>,
    current_page: Option<PageRow>,
    current_image: Option<ImageRow>,
}

impl UrlsetHandler {
    pub fn new() -> Self {
        Self {
            pages: Vec::new(),
            seen_urls: HashSet::new(),
            current_page: None,
            current_image: None,
        }
    }
}

impl XmlHandler for UrlsetHandler {
    fn element_start(&mut self, name: &ElementName, attrs: &[(String, String)]) {
        if name.is_sitemap("url") {
            if self.current_page.is_some() {
                tracing::debug!("Nested <url> element, restarting entry");
            }
            self.current_page = Some(PageRow::default());
        } else if name.is_image("image") && self.current_page.is_some() {
            self.current_image = Some(ImageRow::default());
        } else if name.is_xhtml("link") {
            let Some(page) = self.current_page.as_mut() else {
                return;
            };
            let rel = attr_value(attrs, "rel").unwrap_or_default();
            if !rel.eq_ignore_ascii_case("alternate") {
                return;
            }
            if let (Some(href), Some(hreflang)) =
                (attr_value(attrs, "href"), attr_value(attrs, "hreflang"))
            {
                page.alternates.push(SitemapAlternate {
                    href: href.to_string(),
                    hreflang: hreflang.to_string(),
                });
            }
        }
    }

    fn element_end(&mut self, name: &ElementName, text: Option<String>) {
        if name.is_sitemap("url") {
            if let Some(row) = self.current_page.take() {
                if let Some(page) = row.build() {
                    if self.seen_urls.insert(page.url.clone()) {
                        self.pages.push(page);
                    }
                }
            }
            self.current_image = None;
            return;
        }

        if name.is_image("image") {
            if let (Some(page), Some(image_row)) =
                (self.current_page.as_mut(), self.current_image.take())
            {
                if let Some(image) = image_row.build() {
                    page.images.push(image);
                }
            }
            return;
        }

        if let Some(image) = self.current_image.as_mut() {
            if name.is_image("loc") {
                image.loc = text;
                return;
            } else if name.is_image("caption") {
                image.caption = text;
                return;
            } else if name.is_image("geo_location") {
                image.geo_location = text;
                return;
            } else if name.is_image("title") {
                image.title = text;
                return;
            } else if name.is_image("license") {
                image.license = text;
                return;
            }
        }

        let Some(page) = self.current_page.as_mut() else {
            return;
        };

        if name.is_sitemap("loc") {
            if text.is_some() {
                page.loc = text;
            }
        } else if name.is_sitemap("lastmod") {
            page.last_modified = text;
        } else if name.is_sitemap("changefreq") {
            page.change_frequency = text;
        } else if name.is_sitemap("priority") {
            page.priority = text;
        } else if name.is_news("name") {
            page.news_publication_name = text;
        } else if name.is_news("language") {
            page.news_publication_language = text;
        } else if name.is_news("publication_date") {
            page.news_publish_date = text;
        } else if name.is_news("title") {
            if text.is_some() {
                page.news_title = text;
            }
        } else if name.is_news("access") {
            page.news_access = text;
        } else if name.is_news("genres") {
            page.news_genres = text;
        } else if name.is_news("keywords") {
            page.news_keywords = text;
        } else if name.is_news("stock_tickers") {
            page.news_stock_tickers = text;
        }
    }

    fn outcome(&mut self) -> XmlOutcome {
        XmlOutcome::Pages(XmlPagesKind::Urlset, std::mem::take(&mut self.pages))
    }
}
