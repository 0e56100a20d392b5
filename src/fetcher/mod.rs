pub mod backoff;
#[cfg(feature = "browser")]
pub mod browser;
pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

#[cfg(feature = "browser")]
pub use browser::BrowserFetcher;
pub use client::HttpFetcher;
pub use errors::FetchError;
pub use types::RawPage;

/// Retrieves the markup behind a URL.
///
/// `timeout` bounds a single attempt. Fetchers that retry report the
/// wall-clock bound of a whole call through [`Fetch::deadline`].
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url, timeout: Duration) -> Result<RawPage, FetchError>;

    fn deadline(&self, timeout: Duration) -> Duration {
        timeout
    }
}
