//! Built-in caveat kinds.

use std::sync::Arc;

use rpc::{Request, Response, RpcError};
use serde_json::Value;
use tracing::debug;

use crate::function::{CaveatFunction, Step};
use crate::registry::CaveatKind;
use crate::validator::Validator;
use crate::value::{Input, ParamSlot, normalize_fixed_params, slots_to_value};
use crate::{Error, Result};

/// Always answers with the stored value.
pub const STATIC: &str = "static";
/// Pins positional parameters to stored values.
pub const FIXED_PARAMS: &str = "fixedParams";
/// Runs a caller-supplied validator against each request.
pub const CONDITION: &str = "condition";
/// Rejects requests whose params are not contained in the stored value.
pub const FILTER_PARAMS: &str = "filterParams";
/// Drops response elements missing from the stored allow-list.
pub const FILTER_RESPONSE: &str = "filterResponse";

fn reject(request: &Request, response: &mut Response, kind: &str) -> Step {
    debug!(method = %request.method, kind, "caveat rejected request");
    response.result = None;
    response.error = Some(RpcError::unauthorized(request));
    Step::End
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Static;

impl CaveatKind for Static {
    fn name(&self) -> &str {
        STATIC
    }

    fn bind(&self, value: &Value, _validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
        Ok(Arc::new(StaticResponse(value.clone())))
    }
}

struct StaticResponse(Value);

impl CaveatFunction for StaticResponse {
    fn before(&self, _request: &mut Request, response: &mut Response) -> Step {
        response.result = Some(self.0.clone());
        response.error = None;
        Step::End
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FixedParams;

impl CaveatKind for FixedParams {
    fn name(&self) -> &str {
        FIXED_PARAMS
    }

    fn normalize(&self, value: Input) -> Result<Value> {
        normalize_fixed_params(Some(value)).map(|slots| slots_to_value(&slots))
    }

    fn bind(&self, value: &Value, _validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
        let slots: Vec<ParamSlot> = serde_json::from_value(value.clone())
            .map_err(|e| Error::InvalidOptions(format!("malformed fixed params: {e}")))?;
        Ok(Arc::new(PinParams(slots)))
    }
}

struct PinParams(Vec<ParamSlot>);

impl CaveatFunction for PinParams {
    fn before(&self, request: &mut Request, response: &mut Response) -> Step {
        let mut params = match request.params.take() {
            None => Vec::new(),
            Some(Value::Array(params)) => params,
            Some(other) => {
                request.params = Some(other);
                response.error = Some(RpcError::invalid_params(
                    "fixed params require positional parameters",
                ));
                return Step::End;
            }
        };
        let pinned = self.0.iter().enumerate().filter_map(|(i, slot)| Some((i, slot.value()?)));
        for (index, value) in pinned {
            if params.len() <= index {
                params.resize(index + 1, Value::Null);
            }
            params[index] = value.clone();
        }
        request.params = Some(Value::Array(params));
        Step::Next
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Condition;

impl CaveatKind for Condition {
    fn name(&self) -> &str {
        CONDITION
    }

    fn composite(&self) -> bool {
        true
    }

    fn bind(&self, value: &Value, validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
        let validator = validator
            .cloned()
            .ok_or_else(|| Error::InvalidOptions("condition caveats require a validator".into()))?;
        Ok(Arc::new(Check {
            validator,
            value: value.clone(),
        }))
    }
}

struct Check {
    validator: Validator,
    value: Value,
}

impl CaveatFunction for Check {
    fn before(&self, request: &mut Request, response: &mut Response) -> Step {
        if self.validator.call(request, &self.value) {
            Step::Next
        } else {
            reject(request, response, CONDITION)
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterParams;

impl CaveatKind for FilterParams {
    fn name(&self) -> &str {
        FILTER_PARAMS
    }

    fn bind(&self, value: &Value, _validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
        Ok(Arc::new(ParamsWithin(value.clone())))
    }
}

struct ParamsWithin(Value);

impl CaveatFunction for ParamsWithin {
    fn before(&self, request: &mut Request, response: &mut Response) -> Step {
        if is_subset(request.params.as_ref(), &self.0) {
            Step::Next
        } else {
            reject(request, response, FILTER_PARAMS)
        }
    }
}

/// Shallow containment of `params` in `reference`.
///
/// Object params must map each key to the same value as `reference`;
/// sequence params must only hold elements of `reference`. Missing params are
/// contained in anything.
pub fn is_subset(params: Option<&Value>, reference: &Value) -> bool {
    match (params, reference) {
        (None, _) => true,
        (Some(Value::Object(params)), Value::Object(reference)) => params
            .iter()
            .all(|(key, value)| reference.get(key) == Some(value)),
        (Some(Value::Array(params)), Value::Array(reference)) => {
            params.iter().all(|value| reference.contains(value))
        }
        (Some(params), reference) => params == reference,
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FilterResponse;

impl CaveatKind for FilterResponse {
    fn name(&self) -> &str {
        FILTER_RESPONSE
    }

    fn bind(&self, value: &Value, _validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
        Ok(Arc::new(AllowList(value.clone())))
    }
}

struct AllowList(Value);

impl AllowList {
    fn allows(&self, item: &Value) -> bool {
        match &self.0 {
            Value::Array(allowed) => allowed.contains(item),
            single => single == item,
        }
    }
}

impl CaveatFunction for AllowList {
    fn before(&self, _request: &mut Request, _response: &mut Response) -> Step {
        Step::Next
    }

    fn after(&self, response: &mut Response) {
        if let Some(Value::Array(items)) = response.result.as_mut() {
            items.retain(|item| self.allows(item));
        }
    }
}
