use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use url::Url;

/// Markup as returned by a fetcher, already decoded to UTF-8.
#[derive(Debug, Clone)]
pub struct RawPage {
    /// URL after redirects. Relative links on the page resolve against this.
    pub url_final: Url,
    /// `None` when the page came from a browser that does not expose it.
    pub status: Option<StatusCode>,
    pub markup: String,
    /// Name of the encoding the body was decoded from, e.g. `UTF-8`.
    pub charset: String,
    pub fetched_at: DateTime<Utc>,
}

impl RawPage {
    pub fn new(url_final: Url, status: Option<StatusCode>, markup: String, charset: &str) -> Self {
        Self {
            url_final,
            status,
            markup,
            charset: charset.to_string(),
            fetched_at: Utc::now(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.markup.trim().is_empty()
    }
}
