use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM provider is not configured")]
    Unavailable,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM returned no content for {call}")]
    EmptyResponse { call: String },

    #[error("LLM returned invalid JSON for {call}: {source}")]
    InvalidJson {
        call: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("LLM response for {call} broke its contract: {reason}")]
    Contract { call: String, reason: String },
}
