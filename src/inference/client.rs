use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::config::Config;
use crate::inference::{
    Infer,
    errors::InferenceError,
    prompt::{SYSTEM_PROMPT, user_prompt},
    schema::parse_answer,
};
use crate::model::ExtractionResult;

/// Longest error body kept in an [`InferenceError::Http`] message.
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for any OpenAI-compatible `/chat/completions` endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenAiClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.2,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, InferenceError> {
        let api_key = config
            .openai_api_key()
            .ok_or(InferenceError::MissingApiKey)?;

        Ok(
            Self::new(api_key, config.openai_base_url(), config.model())
                .with_temperature(config.temperature())
                .with_timeout(config.inference_timeout()),
        )
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, user_message: &str) -> Result<String, InferenceError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: user_message,
                },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::from_reqwest_error(e, self.timeout))?;

        let status = resp.status();
        if !status.is_success() {
            let mut message = resp.text().await.unwrap_or_default();
            if message.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !message.is_char_boundary(cut) {
                    cut -= 1;
                }
                message.truncate(cut);
            }
            return Err(InferenceError::Http {
                status: Some(status.as_u16()),
                message,
            });
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| InferenceError::from_reqwest_error(e, self.timeout))?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(InferenceError::EmptyResponse)
    }
}

#[async_trait]
impl Infer for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model, chars = text.len()))]
    async fn infer(
        &self,
        text: &str,
        current_time_hint: &str,
    ) -> Result<ExtractionResult, InferenceError> {
        let content = self.complete(&user_prompt(text, current_time_hint)).await?;
        debug!(response = %content, "model answered");
        parse_answer(&content)
    }
}
