use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("model endpoint returned {}: {message}", .status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    Http { status: Option<u16>, message: String },

    #[error("inference timed out after {0:?}")]
    Timeout(Duration),

    #[error("model returned an empty response")]
    EmptyResponse,

    #[error("model response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("answer field `{field}` {reason}")]
    Schema { field: &'static str, reason: String },
}

impl InferenceError {
    pub(crate) fn schema(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Schema {
            field,
            reason: reason.into(),
        }
    }

    pub(crate) fn from_reqwest_error(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Http {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }
}
