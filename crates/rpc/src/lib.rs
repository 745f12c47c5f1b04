//! JSON-RPC 2.0 message types shared by caveats and their callers.
//!
//! Caveats inspect a [`Request`] before a restricted method runs and may
//! rewrite the [`Response`] it produces.
//!
//! # Example
//!
//! ```
//! use rpc::{Request, Response};
//!
//! let request = Request::new(1i64, "eth_accounts");
//! let response = Response::success(request.id.clone(), serde_json::json!(["0xabc"]));
//! assert_eq!(response.into_result().unwrap(), serde_json::json!(["0xabc"]));
//! ```

mod error;
mod protocol;

pub use error::{Error, Result};
pub use protocol::{codes, Request, RequestId, Response, RpcError, VERSION};
