//! Canonical ordering of serialized caveats.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// The serialized form of a caveat: `{"type", "subType"?, "value"?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializedCaveat {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_type: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "crate::value::present"
    )]
    pub value: Option<Value>,
}

impl SerializedCaveat {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_type: None,
            value: None,
        }
    }

    pub fn with_sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }
}

/// Sort caveats into canonical order, in place.
///
/// Caveats are ordered by type, then by the JSON text of their value (no value
/// first). Sequence values are then sorted by the JSON text of their elements.
pub fn sort_caveats(caveats: &mut [SerializedCaveat]) {
    caveats.sort_by(compare_caveats);
    for caveat in caveats.iter_mut() {
        if let Some(Value::Array(items)) = caveat.value.as_mut() {
            items.sort_by_cached_key(Value::to_string);
        }
    }
}

/// [`sort_caveats`] over raw JSON, in place. Fields other than `type` and
/// `value` are kept. Anything but a sequence of caveat objects is left as is.
pub fn sort_caveats_json(caveats: &mut Value) {
    let Some(items) = caveats.as_array_mut() else {
        return;
    };
    if !items.iter().all(|item| sort_key(item).is_some()) {
        debug!("not a caveat sequence, leaving unsorted");
        return;
    }
    items.sort_by(|a, b| match (sort_key(a), sort_key(b)) {
        (Some((a_kind, a_value)), Some((b_kind, b_value))) => {
            compare_keys(a_kind, a_value, b_kind, b_value)
        }
        _ => Ordering::Equal,
    });
    for item in items.iter_mut() {
        if let Some(Value::Array(values)) = item.get_mut("value") {
            values.sort_by_cached_key(Value::to_string);
        }
    }
}

fn sort_key(caveat: &Value) -> Option<(&str, Option<&Value>)> {
    let object = caveat.as_object()?;
    let kind = object.get("type")?.as_str()?;
    Some((kind, object.get("value")))
}

fn compare_caveats(a: &SerializedCaveat, b: &SerializedCaveat) -> Ordering {
    compare_keys(&a.kind, a.value.as_ref(), &b.kind, b.value.as_ref())
}

fn compare_keys(a_kind: &str, a_value: Option<&Value>, b_kind: &str, b_value: Option<&Value>) -> Ordering {
    locale_cmp(a_kind, b_kind).then_with(|| match (a_value, b_value) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => locale_cmp(&x.to_string(), &y.to_string()),
    })
}

/// English collation approximation: case-insensitive first, then lowercase
/// before uppercase at the first differing character.
pub(crate) fn locale_cmp(a: &str, b: &str) -> Ordering {
    let folded = |s: &str| s.chars().flat_map(char::to_lowercase).collect::<String>();
    folded(a)
        .cmp(&folded(b))
        .then_with(|| a.chars().map(collation_key).cmp(b.chars().map(collation_key)))
}

/// Per-character tie-break key: folded form, then lowercase first, then the
/// character itself.
fn collation_key(c: char) -> (String, bool, char) {
    (c.to_lowercase().collect(), !c.is_lowercase(), c)
}
