//! Default [`WebClient`] implementation backed by reqwest.

use crate::client::{is_retryable_status, ErrorResponse, SuccessResponse, WebClient};
use crate::SitemapError;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;

/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(9050);

/// Default read timeout. Some webservers generate huge sitemaps on the fly,
/// hence the generous value.
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum body size fetched by default. The sitemap spec caps files at
/// 50 MB; doubled to be safe.
const DEFAULT_MAX_RESPONSE_SIZE: usize = 100 * 1024 * 1024;

const DEFAULT_USER_AGENT: &str = concat!("usp/", env!("CARGO_PKG_VERSION"));

/// Builder for [`ReqwestWebClient`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use usp::ReqwestWebClientBuilder;
///
/// let client = ReqwestWebClientBuilder::default()
///     .request_delay(Duration::from_millis(500))
///     .delay_jitter(Duration::from_millis(250))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ReqwestWebClientBuilder {
    connect_timeout: Duration,
    read_timeout: Duration,
    proxy: Option<String>,
    request_delay: Option<Duration>,
    delay_jitter: Option<Duration>,
    max_response_size: usize,
    user_agent: String,
}

impl Default for ReqwestWebClientBuilder {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            proxy: None,
            request_delay: None,
            delay_jitter: None,
            max_response_size: DEFAULT_MAX_RESPONSE_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ReqwestWebClientBuilder {
    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the read timeout.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Routes all requests through the given proxy URL.
    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.proxy = Some(proxy_url.into());
        self
    }

    /// Sleeps for the given duration before every request.
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = Some(delay);
        self
    }

    /// Adds a uniformly random extra delay in `[0, jitter]` on top of the
    /// request delay.
    pub fn delay_jitter(mut self, jitter: Duration) -> Self {
        self.delay_jitter = Some(jitter);
        self
    }

    /// Caps the number of body bytes kept per response.
    pub fn max_response_size(mut self, bytes: usize) -> Self {
        self.max_response_size = bytes;
        self
    }

    /// Overrides the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Builds the client.
    pub fn build(self) -> Result<ReqwestWebClient, SitemapError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(&self.user_agent)
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout)
            .gzip(true);

        if let Some(proxy_url) = &self.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        Ok(ReqwestWebClient {
            client: builder.build()?,
            request_delay: self.request_delay,
            delay_jitter: self.delay_jitter,
            max_response_size: self.max_response_size,
        })
    }
}

/// reqwest-based web client.
///
/// Follows redirects (reporting the final URL), transparently decodes
/// `Content-Encoding: gzip`, and classifies failures into retryable and
/// permanent ones.
#[derive(Debug, Clone)]
pub struct ReqwestWebClient {
    client: reqwest::Client,
    request_delay: Option<Duration>,
    delay_jitter: Option<Duration>,
    max_response_size: usize,
}

impl ReqwestWebClient {
    /// Creates a client with default settings.
    pub fn new() -> Result<Self, SitemapError> {
        ReqwestWebClientBuilder::default().build()
    }

    /// Returns a builder for customised settings.
    pub fn builder() -> ReqwestWebClientBuilder {
        ReqwestWebClientBuilder::default()
    }

    async fn pause_before_request(&self) {
        let Some(delay) = self.request_delay else {
            return;
        };

        let mut wait = delay;
        if let Some(jitter) = self.delay_jitter {
            let jitter_ms = jitter.as_millis() as u64;
            if jitter_ms > 0 {
                let extra = rand::thread_rng().gen_range(0..=jitter_ms);
                wait += Duration::from_millis(extra);
            }
        }
        tokio::time::sleep(wait).await;
    }
}

#[async_trait]
impl WebClient for ReqwestWebClient {
    async fn get(&self, url: &str) -> Result<SuccessResponse, ErrorResponse> {
        self.pause_before_request().await;

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                // Timeouts and connection failures are worth retrying;
                // anything else (TLS, too many redirects, invalid URL) is
                // permanent.
                let retryable = e.is_timeout() || e.is_connect();
                return Err(ErrorResponse {
                    status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                    retryable,
                });
            }
        };

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            let message = format!(
                "{} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("HTTP error")
            );
            return Err(ErrorResponse {
                status: Some(status.as_u16()),
                message,
                retryable: is_retryable_status(status.as_u16()),
            });
        }

        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        match response.bytes().await {
            Ok(bytes) => {
                let mut body = bytes.to_vec();
                if body.len() > self.max_response_size {
                    tracing::warn!(
                        "Response from {final_url} exceeds {} bytes, truncating",
                        self.max_response_size
                    );
                    body.truncate(self.max_response_size);
                }
                Ok(SuccessResponse::new(
                    final_url,
                    status.as_u16(),
                    headers,
                    body,
                ))
            }
            Err(e) => Err(ErrorResponse {
                status: None,
                message: format!("Failed to read response body: {e}"),
                retryable: true,
            }),
        }
    }
}
