//! Caller-supplied predicates for condition caveats.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use rpc::Request;
use serde_json::Value;

type Check = dyn Fn(&Request, &Value) -> bool + Send + Sync;

/// A two-argument predicate over `(request, comparison value)`, kept together
/// with its source text.
///
/// Two validators are equal when their source text is identical. Closures
/// that behave the same but are written differently compare unequal, and
/// identical text compares equal even if the captured environment differs.
/// Use [`validator!`](crate::validator) to capture the text automatically.
#[derive(Clone)]
pub struct Validator {
    source: Cow<'static, str>,
    check: Arc<Check>,
}

impl Validator {
    pub fn new<F>(source: impl Into<Cow<'static, str>>, check: F) -> Self
    where
        F: Fn(&Request, &Value) -> bool + Send + Sync + 'static,
    {
        Self {
            source: source.into(),
            check: Arc::new(check),
        }
    }

    /// The source text this validator is compared by.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn call(&self, request: &Request, value: &Value) -> bool {
        (self.check)(request, value)
    }
}

impl PartialEq for Validator {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Validator").field(&self.source).finish()
    }
}

/// Build a [`Validator`] from a closure, using the closure's tokens as its
/// source text.
///
/// ```
/// use caveats::validator;
///
/// let v = validator!(|req, val| req.params.as_ref() == Some(val));
/// assert!(v.source().contains("req.params"));
/// ```
#[macro_export]
macro_rules! validator {
    ($check:expr) => {
        $crate::Validator::new(stringify!($check), $check)
    };
}
