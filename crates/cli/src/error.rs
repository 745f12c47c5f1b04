//! CLI error types.

use thiserror::Error;

use crate::config::ConfigError;

/// CLI errors.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The permissions file could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The request is not a valid JSON-RPC request.
    #[error("invalid request: {0}")]
    Request(#[from] rpc::Error),

    /// The `--result` argument or output could not be (de)serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
