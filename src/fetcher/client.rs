use crate::fetcher::{
    Fetch,
    backoff::{backoff_delay, max_backoff_delay},
    errors::{FetchError, ensure_success},
    pipeline::decode_page,
    types::RawPage,
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::{instrument, warn};
use url::Url;

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
pub const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/122.0.0.0 Safari/537.36";
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Plain HTTP fetcher. Sees server-rendered markup only.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    max_retries: u32,
    base_backoff: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .default_headers({
                let mut headers = header::HeaderMap::new();
                headers.insert(
                    header::ACCEPT,
                    header::HeaderValue::from_static(
                        "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                    ),
                );
                headers.insert(
                    header::ACCEPT_LANGUAGE,
                    header::HeaderValue::from_static("en-US,en;q=0.9"),
                );
                headers
            })
            .build()
            .map_err(|e| FetchError::Unknown(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_retries: DEFAULT_MAX_RETRIES,
            base_backoff: DEFAULT_BASE_BACKOFF,
        })
    }

    pub fn with_retry(mut self, max_retries: u32, base_backoff: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_backoff = base_backoff;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    async fn fetch_once(&self, url: &Url, timeout: Duration) -> Result<RawPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest_error(e, timeout))?;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let final_url = response.url().clone();
        let status = response.status();

        ensure_success(status)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !content_type.contains("text/html") && !content_type.contains("application/xhtml") {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_reqwest_error(e, timeout))?;

        // Check body size after download (in case Content-Length was missing)
        if body_bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
        }

        Ok(decode_page(final_url, status, &body_bytes, &content_type))
    }
}

pub(crate) fn check_scheme(url: &Url) -> Result<(), FetchError> {
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(FetchError::UnsupportedScheme(other.to_string())),
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RawPage, FetchError> {
        check_scheme(url)?;

        let mut attempt = 0;
        loop {
            match self.fetch_once(url, timeout).await {
                Ok(page) => return Ok(page),
                Err(e) if e.should_retry() && attempt < self.max_retries => {
                    let delay = backoff_delay(attempt, self.base_backoff);
                    warn!(
                        error = %e,
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Every attempt at `timeout` plus the longest backoff between them.
    fn deadline(&self, timeout: Duration) -> Duration {
        (0..self.max_retries).fold(
            timeout.saturating_mul(self.max_retries.saturating_add(1)),
            |total, attempt| total.saturating_add(max_backoff_delay(attempt, self.base_backoff)),
        )
    }
}
