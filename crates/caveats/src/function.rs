//! The behavior a caveat contributes to a restricted method call.

use rpc::{Request, Response};

/// Whether the call continues after a caveat's pre-check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Continue with the next caveat, then the restricted method.
    Next,
    /// Stop here; `response` already holds the answer or the error.
    End,
}

/// Request/response hooks bound to one caveat.
///
/// Implementations must not keep mutable state: one caveat may be invoked for
/// many requests at once.
pub trait CaveatFunction: Send + Sync {
    /// Runs before the restricted method. May rewrite `request`, or fill in
    /// `response` and return [`Step::End`].
    fn before(&self, request: &mut Request, response: &mut Response) -> Step;

    /// Runs after the restricted method produced `response`.
    fn after(&self, _response: &mut Response) {}
}
