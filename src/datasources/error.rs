use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Transport failure, non-2xx status or a body that is not JSON.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The body parsed as JSON but lacks the expected shape.
    #[error("invalid data: {0}")]
    InvalidData(String),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::InvalidData(err.to_string())
    }
}
