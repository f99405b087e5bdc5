//! JSON-contract LLM calls.
//!
//! One helper for every call site that sends a prompt and expects a JSON
//! document back: it builds the request, extracts the JSON body from the
//! reply, and deserialises it into the caller's type. Each caller decides
//! whether a failure is fatal or falls back.

use serde::de::DeserializeOwned;

use crate::client::{ChatRequest, LlmClient, ModelTier};
use crate::error::LlmError;

/// A prompt plus the parameters of one structured call.
#[derive(Debug, Clone)]
pub struct StructuredCall {
    /// Short label used in errors and logs.
    pub name: &'static str,
    pub tier: ModelTier,
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct Structured<T> {
    pub value: T,
    pub model: String,
}

/// Run `call` and parse the reply as `T`.
///
/// # Errors
///
/// Propagates client errors and returns [`LlmError::InvalidJson`] when the
/// reply does not deserialise into `T`.
pub async fn call_json<T: DeserializeOwned>(
    llm: &dyn LlmClient,
    call: StructuredCall,
) -> Result<Structured<T>, LlmError> {
    let request = ChatRequest {
        tier: call.tier,
        system: call.system,
        user: call.user,
        temperature: call.temperature,
        json: true,
        max_tokens: call.max_tokens,
    };

    let completion = llm.complete(&request).await?;
    let body = extract_json(&completion.content);
    if body.is_empty() {
        return Err(LlmError::EmptyResponse {
            call: call.name.to_string(),
        });
    }

    let value = serde_json::from_str::<T>(body).map_err(|source| LlmError::InvalidJson {
        call: call.name.to_string(),
        source,
    })?;

    Ok(Structured {
        value,
        model: completion.model,
    })
}

/// Pull the JSON document out of a model reply.
///
/// Handles fenced code blocks and leading/trailing prose; falls back to the
/// trimmed input when no object delimiters are present.
#[must_use]
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map_or(trimmed, str::trim);

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => &unfenced[start..=end],
        _ => unfenced,
    }
}
