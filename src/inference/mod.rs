pub mod client;
pub mod errors;
pub mod prompt;
pub mod schema;

use async_trait::async_trait;

use crate::model::ExtractionResult;

pub use client::OpenAiClient;
pub use errors::InferenceError;
pub use schema::parse_answer;

/// Turns reduced page text into exactly one [`ExtractionResult`].
#[async_trait]
pub trait Infer: Send + Sync {
    async fn infer(
        &self,
        text: &str,
        current_time_hint: &str,
    ) -> Result<ExtractionResult, InferenceError>;
}
