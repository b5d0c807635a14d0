use thiserror::Error;

/// Failure of one upstream API call.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The response decoded but lacks data the adapter relies on.
    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

impl ClientError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
