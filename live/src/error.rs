//! Live stream errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LiveError {
    #[error("malformed live message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}
