//! Running a permission's caveats around a restricted method.

use rpc::{Request, Response, RpcError, codes};
use serde_json::Value;
use tracing::trace;

use crate::function::Step;
use crate::permission::Permission;
use crate::{Caveat, Error, Result};

/// Applies a permission's caveats, in order, to calls of its method.
///
/// Each caveat's pre-check runs in sequence until one ends the call. If none
/// does, the restricted method runs. The post-phases of the caveats that let
/// the call through then run in reverse order.
#[derive(Debug, Clone, Copy)]
pub struct Chain<'a> {
    method: &'a str,
    caveats: &'a [Caveat],
}

impl<'a> Chain<'a> {
    pub fn new(permission: &'a Permission) -> Self {
        Self {
            method: &permission.method,
            caveats: permission.caveats(),
        }
    }

    /// Handle `request`, calling `method` unless a caveat ends the call.
    pub fn run<F>(&self, mut request: Request, method: F) -> Response
    where
        F: FnOnce(&Request) -> std::result::Result<Value, RpcError>,
    {
        let mut response = Response::for_request(&request);
        if request.method != self.method {
            response.error = Some(RpcError::unauthorized(&request));
            return response;
        }

        let passed = self.pre_checks(&mut request, &mut response);
        if passed == self.caveats.len() {
            trace!(method = %request.method, "calling restricted method");
            match method(&request) {
                Ok(result) => response.result = Some(result),
                Err(error) => response.error = Some(error),
            }
        }

        for caveat in self.caveats[..passed].iter().rev() {
            caveat.after(&mut response);
        }
        response
    }

    /// Run only the pre-checks. A caveat that ends the call with the
    /// unauthorized code is reported as [`Error::Unauthorized`], any other
    /// error as [`Error::Rejected`].
    ///
    /// Caveats that answer in place of the method (such as `static`) count as
    /// authorized.
    pub fn authorize(&self, request: &Request) -> Result<()> {
        let unauthorized = || Error::Unauthorized {
            method: request.method.clone(),
        };
        if request.method != self.method {
            return Err(unauthorized());
        }

        let mut request = request.clone();
        let mut response = Response::for_request(&request);
        self.pre_checks(&mut request, &mut response);
        match response.error {
            Some(error) if error.code == codes::UNAUTHORIZED => Err(unauthorized()),
            Some(error) => Err(Error::Rejected(error)),
            None => Ok(()),
        }
    }

    /// Returns how many caveats let the call through.
    fn pre_checks(&self, request: &mut Request, response: &mut Response) -> usize {
        for (index, caveat) in self.caveats.iter().enumerate() {
            if caveat.before(request, response) == Step::End {
                trace!(method = %request.method, kind = caveat.kind(), "caveat ended call");
                return index;
            }
        }
        self.caveats.len()
    }
}
