use thiserror::Error;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{source_name} returned status {status}")]
    Status { source_name: &'static str, status: u16 },

    #[error("{source_name} response parse error: {reason}")]
    Parse {
        source_name: &'static str,
        reason: String,
    },
}
