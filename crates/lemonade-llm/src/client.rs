//! Chat-completion client.
//!
//! [`OpenAiClient`] speaks the OpenAI `/chat/completions` wire format, which
//! also covers OpenAI-compatible gateways via a custom base URL. When no API
//! key is configured the service wires in [`DisabledLlm`] so every call site
//! takes its "LLM unavailable" path.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Cost/quality class of a request. Each tier maps to a configured model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Standard,
    Premium,
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub tier: ModelTier,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    /// Ask the provider for a JSON object response.
    pub json: bool,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one chat completion.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] when no provider is configured,
    /// [`LlmError::Http`]/[`LlmError::Api`] on transport or provider failure,
    /// and [`LlmError::EmptyResponse`] when the provider sent no content.
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, LlmError>;
}

/// Stand-in used when no API key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLlm;

#[async_trait]
impl LlmClient for DisabledLlm {
    async fn complete(&self, _request: &ChatRequest) -> Result<Completion, LlmError> {
        Err(LlmError::Unavailable)
    }
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub fast_model: String,
    pub standard_model: String,
    pub premium_model: String,
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    /// Build from application config. Returns `None` when no API key is set.
    #[must_use]
    pub fn from_app_config(config: &lemonade_core::AppConfig) -> Option<Self> {
        let api_key = config.openai_api_key.clone()?;
        Some(Self {
            api_key,
            base_url: config.llm_base_url.clone(),
            fast_model: config.llm_fast_model.clone(),
            standard_model: config.llm_standard_model.clone(),
            premium_model: config.llm_premium_model.clone(),
            timeout_secs: config.http_timeout_secs.max(60),
        })
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            fast_model: "gpt-4o-mini".to_string(),
            standard_model: "gpt-4o-mini".to_string(),
            premium_model: "gpt-4o".to_string(),
            timeout_secs: 60,
        }
    }
}

pub struct OpenAiClient {
    client: reqwest::Client,
    config: OpenAiConfig,
    endpoint: String,
}

#[derive(Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: [WireMessage<'a>; 2],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Unavailable`] for an empty API key and
    /// [`LlmError::Http`] if the HTTP client cannot be built.
    pub fn new(config: OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Unavailable);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            config,
            endpoint,
        })
    }

    #[must_use]
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.config.fast_model,
            ModelTier::Standard => &self.config.standard_model,
            ModelTier::Premium => &self.config.premium_model,
        }
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, LlmError> {
        let model = self.model_for(request.tier);
        let body = ChatCompletionBody {
            model,
            messages: [
                WireMessage {
                    role: "system",
                    content: &request.system,
                },
                WireMessage {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            response_format: request.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body: text.chars().take(300).collect(),
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::EmptyResponse {
                call: model.to_string(),
            })?;

        tracing::debug!(model, chars = content.len(), "LLM completion received");

        Ok(Completion {
            content,
            model: parsed.model.unwrap_or_else(|| model.to_string()),
        })
    }
}
