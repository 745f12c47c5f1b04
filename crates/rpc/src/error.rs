//! JSON-RPC error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to parse message: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported JSON-RPC version: {0}")]
    Version(String),
}

pub type Result<T> = std::result::Result<T, Error>;
