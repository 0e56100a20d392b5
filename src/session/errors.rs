use thiserror::Error;
use url::Url;

use crate::fetcher::FetchError;
use crate::inference::InferenceError;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("failed to fetch {url}: {source}")]
    Fetch { url: Url, source: FetchError },

    #[error("inference failed for {url}: {source}")]
    Inference { url: Url, source: InferenceError },

    #[error("cancelled")]
    Cancelled,
}

impl SessionError {
    /// Page the session was working on when it failed.
    pub fn url(&self) -> Option<&Url> {
        match self {
            Self::Fetch { url, .. } | Self::Inference { url, .. } => Some(url),
            Self::Cancelled => None,
        }
    }
}
