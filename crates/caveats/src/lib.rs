//! Caveats: typed restrictions on permissions to call restricted methods.
//!
//! A [`Permission`] grants a caller the right to invoke one JSON-RPC method.
//! Caveats attached to it can reject a request, answer it with a fixed value,
//! or filter its params and result.
//!
//! # Core Concepts
//!
//! - [`Registry`]: the known caveat kinds ([`CaveatKind`]) and which kinds
//!   exclude each other. It validates [`CaveatOptions`] and attaches the
//!   resulting [`Caveat`].
//! - [`Caveat`]: an immutable record of type, optional subType, value and the
//!   bound [`CaveatFunction`]. Compared with [`caveat_equal`].
//! - [`Chain`]: runs a permission's caveats around the restricted method.
//! - [`sort_caveats`]: canonical ordering of [`SerializedCaveat`]s.
//!
//! Built-in kinds (see [`kinds`]): `static`, `fixedParams`, `condition`,
//! `filterParams`, `filterResponse`. `static` and `fixedParams` are mutually
//! exclusive.
//!
//! # Example
//!
//! ```
//! use caveats::{CaveatOptions, Chain, Discriminator, Permission, add_caveat, kinds};
//! use rpc::Request;
//! use serde_json::json;
//!
//! let mut permission = Permission::new("eth_accounts");
//! add_caveat(
//!     &mut permission,
//!     CaveatOptions::new(kinds::FILTER_RESPONSE).value(json!(["0xa"])),
//! )?;
//!
//! let response = Chain::new(&permission)
//!     .run(Request::new(1i64, "eth_accounts"), |_| Ok(json!(["0xa", "0xb"])));
//! assert_eq!(response.result, Some(json!(["0xa"])));
//!
//! let removed = permission.remove_caveat(&Discriminator::new(kinds::FILTER_RESPONSE));
//! assert!(removed.is_some());
//! # Ok::<(), caveats::Error>(())
//! ```

mod caveat;
mod chain;
mod error;
mod function;
pub mod kinds;
mod permission;
mod registry;
mod sort;
mod validator;
mod value;

pub use caveat::{Caveat, Discriminator, caveat_equal};
pub use chain::Chain;
pub use error::{Error, Result};
pub use function::{CaveatFunction, Step};
pub use permission::{Permission, remove_caveat};
pub use registry::{CaveatKind, CaveatOptions, Registry, add_caveat};
pub use sort::{SerializedCaveat, sort_caveats, sort_caveats_json};
pub use validator::Validator;
pub use value::{Input, ParamSlot, normalize_fixed_params, slots_to_value};
