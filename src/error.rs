/// Error type surfaced by the store and its collaborators.
///
/// A missing credential is deliberately not an error: the store treats it as
/// local/offline mode and skips reconciliation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    // Transport-level failures from the REST collaborator
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // Non-success responses from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    // Payloads that could not be decoded into the wire model
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    // Responses that decoded but are missing required fields (e.g. no id)
    #[error("Malformed response: {0}")]
    Malformed(String),

    // Local persistence failures
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0} not found")]
    NotFound(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
