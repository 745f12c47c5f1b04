//! Attached caveat records.

use std::fmt;
use std::sync::Arc;

use rpc::{Request, Response};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::function::{CaveatFunction, Step};
use crate::sort::SerializedCaveat;
use crate::validator::Validator;

/// The key caveats are told apart by: the type, plus the subType for
/// composite kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
}

impl Discriminator {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_type: None,
        }
    }

    pub fn composite(kind: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_type: Some(sub_type.into()),
        }
    }
}

impl fmt::Display for Discriminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub_type {
            Some(sub_type) => write!(f, "type {:?} (subType {sub_type:?})", self.kind),
            None => write!(f, "type {:?}", self.kind),
        }
    }
}

/// A caveat attached to a permission.
///
/// Caveats are immutable: the payload is owned by the caveat and only exposed
/// by reference. To change one, remove it and add a new one. Clones share the
/// payload and the bound behavior.
#[derive(Clone)]
pub struct Caveat {
    kind: String,
    sub_type: Option<String>,
    value: Arc<Value>,
    validator: Option<Validator>,
    function: Arc<dyn CaveatFunction>,
}

impl Caveat {
    pub(crate) fn new(
        kind: String,
        sub_type: Option<String>,
        value: Value,
        validator: Option<Validator>,
        function: Arc<dyn CaveatFunction>,
    ) -> Self {
        Self {
            kind,
            sub_type,
            value: Arc::new(value),
            validator,
            function,
        }
    }

    /// The caveat's type key.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.sub_type.as_deref()
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn validator(&self) -> Option<&Validator> {
        self.validator.as_ref()
    }

    pub fn discriminator(&self) -> Discriminator {
        Discriminator {
            kind: self.kind.clone(),
            sub_type: self.sub_type.clone(),
        }
    }

    /// Whether this caveat is identified by `discriminator`.
    pub fn matches(&self, discriminator: &Discriminator) -> bool {
        self.kind == discriminator.kind && self.sub_type == discriminator.sub_type
    }

    /// Run the validator against `request` and the stored value.
    ///
    /// Caveats without a validator accept every request here; their checks
    /// live in [`Caveat::before`].
    pub fn validate(&self, request: &Request) -> bool {
        self.validator
            .as_ref()
            .is_none_or(|validator| validator.call(request, &self.value))
    }

    pub fn before(&self, request: &mut Request, response: &mut Response) -> Step {
        self.function.before(request, response)
    }

    pub fn after(&self, response: &mut Response) {
        self.function.after(response)
    }

    pub fn to_serialized(&self) -> SerializedCaveat {
        SerializedCaveat {
            kind: self.kind.clone(),
            sub_type: self.sub_type.clone(),
            value: Some(Value::clone(&self.value)),
        }
    }
}

impl fmt::Debug for Caveat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Caveat")
            .field("kind", &self.kind)
            .field("sub_type", &self.sub_type)
            .field("value", &self.value)
            .field("validator", &self.validator)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Caveat {
    fn eq(&self, other: &Self) -> bool {
        caveat_equal(self, other)
    }
}

impl Serialize for Caveat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_serialized().serialize(serializer)
    }
}

/// Check whether two caveats are equivalent.
///
/// Types, subTypes and values must match, and validators must have identical
/// source text (see [`Validator`] for what that does and does not imply).
pub fn caveat_equal(a: &Caveat, b: &Caveat) -> bool {
    a.kind == b.kind
        && a.sub_type == b.sub_type
        && a.value == b.value
        && a.validator == b.validator
}
