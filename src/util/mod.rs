//! URL, text and compression helpers shared across the crate.

mod dates;

pub use dates::{parse_date, parse_priority};

use crate::SitemapError;
use flate2::read::GzDecoder;
use std::io::{self, Read};
use url::Url;

/// Magic bytes at the start of a gzip stream.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// UTF-8 byte order mark.
const UTF8_BOM: [u8; 3] = [0xef, 0xbb, 0xbf];

/// Returns true if `url` is an absolute HTTP(S) URL with a non-empty host.
pub fn is_http_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return false,
    };

    matches!(parsed.scheme(), "http" | "https")
        && parsed.host_str().is_some_and(|host| !host.is_empty())
}

/// Strips a URL down to its homepage: scheme, host, optional port, `/` path.
///
/// # Example
///
/// ```
/// use usp::util::strip_url_to_homepage;
///
/// let homepage = strip_url_to_homepage("https://www.example.com/news/article.html").unwrap();
/// assert_eq!(homepage, "https://www.example.com/");
/// ```
pub fn strip_url_to_homepage(url: &str) -> Result<String, SitemapError> {
    let parsed = Url::parse(url).map_err(|e| SitemapError::InvalidHomepage {
        url: url.to_string(),
        message: e.to_string(),
    })?;

    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(SitemapError::NotHttpUrl(url.to_string()));
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| SitemapError::InvalidHomepage {
            url: url.to_string(),
            message: "URL has no host".to_string(),
        })?;

    let mut homepage = format!("{}://{}", parsed.scheme(), host);
    if let Some(port) = parsed.port() {
        homepage.push(':');
        homepage.push_str(&port.to_string());
    }
    homepage.push('/');
    Ok(homepage)
}

/// Trims a text value, returning `None` when nothing remains.
///
/// XML character data arrives entity-decoded from the reader; what is left
/// to normalise here is surrounding whitespace.
pub fn clean_text(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Decompresses a gzip stream.
pub fn gunzip(data: &[u8]) -> io::Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder.read_to_end(&mut decompressed)?;
    Ok(decompressed)
}

/// Decompresses a response body when it looks gzipped.
///
/// A body is considered gzipped when it carries the gzip magic bytes, the URL
/// path ends in `.gz`, or the content type / content encoding mention gzip.
/// If decompression fails the original bytes are returned unchanged with a
/// warning; sitemaps with a `.gz` extension but uncompressed content are
/// common enough.
pub fn maybe_gunzip(
    url: &str,
    content_type: Option<&str>,
    content_encoding: Option<&str>,
    body: Vec<u8>,
) -> Vec<u8> {
    let has_signature = body.starts_with(&GZIP_MAGIC);

    let path_hints_gzip = Url::parse(url)
        .map(|u| u.path().to_lowercase().ends_with(".gz"))
        .unwrap_or(false);
    let header_hints_gzip = content_type
        .map(|v| v.to_lowercase().contains("gzip"))
        .unwrap_or(false)
        || content_encoding
            .map(|v| v.to_lowercase().contains("gzip"))
            .unwrap_or(false);

    if !(has_signature || path_hints_gzip || header_hints_gzip) {
        return body;
    }

    match gunzip(&body) {
        Ok(decompressed) => decompressed,
        Err(e) => {
            tracing::warn!(
                "Unable to gunzip response from {url}, assuming it is not actually gzipped: {e}"
            );
            body
        }
    }
}

/// Decodes response bytes to a string, stripping a UTF-8 BOM and replacing
/// invalid sequences.
pub fn decode_body(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM.as_slice()).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}
