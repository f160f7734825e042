//! Pluggable web client used by the sitemap fetcher.
//!
//! The fetcher only needs one operation: GET a URL and report either the
//! final (post-redirect) URL, status, headers and body, or a typed error
//! with a retryability flag. Implementations must follow redirects
//! themselves and must not panic on connection errors.

mod reqwest_client;

pub use reqwest_client::{ReqwestWebClient, ReqwestWebClientBuilder};

use async_trait::async_trait;

/// HTTP status codes on which a request is worth retrying.
pub const RETRYABLE_HTTP_STATUS_CODES: &[u16] = &[429, 500, 502, 503, 504];

/// Returns true if a request that received `status` should be retried.
pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_HTTP_STATUS_CODES.contains(&status)
}

/// Successful HTTP response.
#[derive(Debug, Clone)]
pub struct SuccessResponse {
    /// URL the response was finally served from, after following redirects.
    pub final_url: String,

    /// HTTP status code, e.g. 200.
    pub status: u16,

    /// Raw response body, possibly truncated to the client's size cap.
    pub body: Vec<u8>,

    headers: Vec<(String, String)>,
}

impl SuccessResponse {
    /// Creates a response; header names are normalised to lowercase.
    pub fn new(
        final_url: impl Into<String>,
        status: u16,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Self {
        let headers = headers
            .into_iter()
            .map(|(name, value)| (name.to_lowercase(), value))
            .collect();
        Self {
            final_url: final_url.into(),
            status,
            body,
            headers,
        }
    }

    /// Returns a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_lowercase();
        self.headers
            .iter()
            .find(|(header_name, _)| *header_name == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Failed HTTP request: either a network-level error or a non-2xx response.
#[derive(Debug, Clone)]
pub struct ErrorResponse {
    /// HTTP status code when the failure was an HTTP error response.
    pub status: Option<u16>,

    /// Message describing what went wrong.
    pub message: String,

    /// True if the request should be retried.
    pub retryable: bool,
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

/// Web client used by the sitemap fetcher.
///
/// `get` must not return `Err` by panicking on connection problems; every
/// failure mode is reported through [`ErrorResponse`].
#[async_trait]
pub trait WebClient: Send + Sync {
    /// Fetches a URL, following redirects.
    async fn get(&self, url: &str) -> Result<SuccessResponse, ErrorResponse>;
}
