//! Caveat error types.

use rpc::{RpcError, codes};
use thiserror::Error;

use crate::Discriminator;

/// Caveat errors.
///
/// Everything except [`Error::Unauthorized`] and [`Error::Rejected`] is raised
/// while attaching a caveat, and leaves the permission untouched. Those two are
/// raised when a caveat rejects a live request.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No value was supplied where one is required.
    #[error("caveat value is missing; use null for an explicitly empty value")]
    InvalidValue,

    /// The caveat type is not registered.
    #[error("invalid caveat type: {0:?}")]
    InvalidType(String),

    /// The subType or validator of a caveat failed validation.
    #[error("invalid caveat options: {0}")]
    InvalidOptions(String),

    /// The permission already has a caveat with the same discriminator.
    #[error("permission already has caveat of {0}")]
    DuplicateCaveat(Discriminator),

    /// The permission has a caveat whose type excludes the requested one.
    #[error("caveat of type {requested:?} is incompatible with existing caveat of type {existing:?}")]
    IncompatibleCaveat { requested: String, existing: String },

    /// A caveat rejected the request.
    #[error("unauthorized call to {method:?}")]
    Unauthorized { method: String },

    /// A caveat ended the request with an error other than unauthorized.
    #[error("request rejected: {0}")]
    Rejected(RpcError),
}

impl Error {
    /// The JSON-RPC error reported to the caller of a restricted method.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            Error::Unauthorized { method } => RpcError::new(
                codes::UNAUTHORIZED,
                "The requested account and/or method has not been authorized by the user.",
            )
            .with_data(serde_json::json!({ "method": method })),
            Error::Rejected(error) => error.clone(),
            other => RpcError::invalid_params(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
