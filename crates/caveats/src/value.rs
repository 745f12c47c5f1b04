//! Caveat payloads as supplied by callers, and the fixed-params slot model.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Value, json};

use crate::{Error, Result};

/// A caveat value as supplied by a caller.
///
/// A missing value is `None` at the option level; JSON `null` is a real value.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// A concrete JSON value.
    Value(Value),
    /// An ordered sequence in which some slots may be absent.
    Slots(Vec<Option<Value>>),
}

impl Input {
    /// Convert to a concrete value. Absent slots are rejected.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Input::Value(value) => Ok(value),
            Input::Slots(slots) => slots
                .into_iter()
                .map(|slot| slot.ok_or(Error::InvalidValue))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl From<Value> for Input {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}

impl From<Vec<Option<Value>>> for Input {
    fn from(slots: Vec<Option<Value>>) -> Self {
        Self::Slots(slots)
    }
}

/// One positional parameter of a fixed-params caveat.
///
/// Serialized as `{"fixed": true, "value": ...}` or `{"fixed": false}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SlotRecord", into = "SlotRecord")]
pub enum ParamSlot {
    /// The parameter is pinned to this value.
    Fixed(Value),
    /// The caller's parameter passes through.
    Open,
}

impl ParamSlot {
    /// The pinned value, if any.
    pub fn value(&self) -> Option<&Value> {
        match self {
            ParamSlot::Fixed(value) => Some(value),
            ParamSlot::Open => None,
        }
    }

    fn to_value(&self) -> Value {
        match self {
            ParamSlot::Fixed(value) => json!({ "fixed": true, "value": value }),
            ParamSlot::Open => json!({ "fixed": false }),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct SlotRecord {
    fixed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    value: Option<Value>,
}

impl TryFrom<SlotRecord> for ParamSlot {
    type Error = String;

    fn try_from(record: SlotRecord) -> std::result::Result<Self, Self::Error> {
        match (record.fixed, record.value) {
            (true, Some(value)) => Ok(ParamSlot::Fixed(value)),
            (true, None) => Err("fixed slot has no value".to_string()),
            (false, _) => Ok(ParamSlot::Open),
        }
    }
}

impl From<ParamSlot> for SlotRecord {
    fn from(slot: ParamSlot) -> Self {
        match slot {
            ParamSlot::Fixed(value) => SlotRecord {
                fixed: true,
                value: Some(value),
            },
            ParamSlot::Open => SlotRecord {
                fixed: false,
                value: None,
            },
        }
    }
}

/// Deserialize a field that is known to be present, keeping `null` as a value.
pub(crate) fn present<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Normalize a fixed-params value into slot records.
///
/// A sequence fixes each present element and leaves absent ones open; any
/// other single value fixes the first parameter.
pub fn normalize_fixed_params(value: Option<Input>) -> Result<Vec<ParamSlot>> {
    let slots = match value.ok_or(Error::InvalidValue)? {
        Input::Value(Value::Array(items)) => items.into_iter().map(ParamSlot::Fixed).collect(),
        Input::Value(single) => vec![ParamSlot::Fixed(single)],
        Input::Slots(slots) => slots
            .into_iter()
            .map(|slot| slot.map_or(ParamSlot::Open, ParamSlot::Fixed))
            .collect(),
    };
    Ok(slots)
}

/// The stored JSON form of a slot sequence.
pub fn slots_to_value(slots: &[ParamSlot]) -> Value {
    Value::Array(slots.iter().map(ParamSlot::to_value).collect())
}
