//! Caveat kinds and the registry that builds and attaches caveats.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::caveat::Caveat;
use crate::function::CaveatFunction;
use crate::kinds::{self, Condition, FilterParams, FilterResponse, FixedParams, Static};
use crate::permission::Permission;
use crate::validator::Validator;
use crate::value::Input;
use crate::{Error, Result};

/// A kind of caveat: how its value is normalized and what it does to calls.
pub trait CaveatKind: Send + Sync {
    /// The type key caveats of this kind carry.
    fn name(&self) -> &str;

    /// Composite kinds are told apart by subType as well as type, and carry
    /// a validator.
    fn composite(&self) -> bool {
        false
    }

    /// Turn the caller's value into the stored payload.
    fn normalize(&self, value: Input) -> Result<Value> {
        value.into_value()
    }

    /// Bind the request/response behavior for a caveat storing `value`.
    fn bind(
        &self,
        value: &Value,
        validator: Option<&Validator>,
    ) -> Result<Arc<dyn CaveatFunction>>;
}

/// Options describing a caveat to attach.
#[derive(Debug, Clone)]
pub struct CaveatOptions {
    pub kind: String,
    pub sub_type: Option<String>,
    pub value: Option<Input>,
    pub validator: Option<Validator>,
}

impl CaveatOptions {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sub_type: None,
            value: None,
            validator: None,
        }
    }

    pub fn value(mut self, value: impl Into<Value>) -> Self {
        self.value = Some(Input::Value(value.into()));
        self
    }

    /// A sequence value in which `None` slots are absent.
    pub fn slots(mut self, slots: Vec<Option<Value>>) -> Self {
        self.value = Some(Input::Slots(slots));
        self
    }

    pub fn sub_type(mut self, sub_type: impl Into<String>) -> Self {
        self.sub_type = Some(sub_type.into());
        self
    }

    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }
}

/// The set of known caveat kinds and the exclusivity rules between them.
#[derive(Clone)]
pub struct Registry {
    kinds: BTreeMap<String, Arc<dyn CaveatKind>>,
    exclusions: Vec<(String, String)>,
}

impl Registry {
    /// A registry with no kinds.
    pub fn new() -> Self {
        Self {
            kinds: BTreeMap::new(),
            exclusions: Vec::new(),
        }
    }

    /// The built-in kinds; `static` and `fixedParams` exclude each other.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(Static)
            .register(FixedParams)
            .register(Condition)
            .register(FilterParams)
            .register(FilterResponse)
            .exclusive(kinds::STATIC, kinds::FIXED_PARAMS);
        registry
    }

    /// Add a kind, replacing any kind with the same name.
    pub fn register(&mut self, kind: impl CaveatKind + 'static) -> &mut Self {
        self.kinds.insert(kind.name().to_string(), Arc::new(kind));
        self
    }

    /// Forbid caveats of types `a` and `b` on the same permission.
    pub fn exclusive(&mut self, a: impl Into<String>, b: impl Into<String>) -> &mut Self {
        self.exclusions.push((a.into(), b.into()));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn CaveatKind> {
        self.kinds.get(name).map(|kind| kind.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.kinds.contains_key(name)
    }

    fn excluded_by<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.exclusions.iter().filter_map(move |(a, b)| {
            if a == kind {
                Some(b.as_str())
            } else if b == kind {
                Some(a.as_str())
            } else {
                None
            }
        })
    }

    /// Validate `options` and build the caveat they describe.
    pub fn create(&self, options: CaveatOptions) -> Result<Caveat> {
        let CaveatOptions {
            kind: name,
            sub_type,
            value,
            validator,
        } = options;

        let value = value.ok_or(Error::InvalidValue)?;
        let kind = self
            .get(&name)
            .ok_or_else(|| Error::InvalidType(name.clone()))?;

        let (sub_type, validator) = if kind.composite() {
            let sub_type = sub_type
                .filter(|s| !s.is_empty())
                .ok_or_else(|| Error::InvalidOptions(format!("{name:?} caveats require a subType")))?;
            let validator = validator
                .ok_or_else(|| Error::InvalidOptions(format!("{name:?} caveats require a validator")))?;
            (Some(sub_type), Some(validator))
        } else {
            if sub_type.is_some() || validator.is_some() {
                debug!(kind = %name, "ignoring subType/validator on non-composite caveat");
            }
            (None, None)
        };

        let value = kind.normalize(value)?;
        let function = kind.bind(&value, validator.as_ref())?;
        Ok(Caveat::new(name, sub_type, value, validator, function))
    }

    /// Build a caveat from `options` and append it to `permission`.
    ///
    /// On error the permission is left unchanged.
    pub fn add_caveat(&self, permission: &mut Permission, options: CaveatOptions) -> Result<()> {
        let caveat = self.create(options)?;

        let discriminator = caveat.discriminator();
        if permission.has_caveat(&discriminator) {
            return Err(Error::DuplicateCaveat(discriminator));
        }

        for excluded in self.excluded_by(caveat.kind()) {
            if let Some(existing) = permission.caveats().iter().find(|c| c.kind() == excluded) {
                return Err(Error::IncompatibleCaveat {
                    requested: caveat.kind().to_string(),
                    existing: existing.kind().to_string(),
                });
            }
        }

        debug!(
            method = %permission.method,
            kind = %caveat.kind(),
            sub_type = ?caveat.sub_type(),
            "attaching caveat"
        );
        permission.attach(caveat);
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kinds", &self.kinds.keys().collect::<Vec<_>>())
            .field("exclusions", &self.exclusions)
            .finish()
    }
}

/// Attach a caveat using the built-in registry.
pub fn add_caveat(permission: &mut Permission, options: CaveatOptions) -> Result<()> {
    Registry::builtin().add_caveat(permission, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::Step;
    use crate::validator;
    use rpc::{Request, Response};
    use serde_json::json;

    struct Tag;

    struct Noop;

    impl CaveatFunction for Noop {
        fn before(&self, _request: &mut Request, _response: &mut Response) -> Step {
            Step::Next
        }
    }

    impl CaveatKind for Tag {
        fn name(&self) -> &str {
            "tag"
        }

        fn bind(&self, _value: &Value, _validator: Option<&Validator>) -> Result<Arc<dyn CaveatFunction>> {
            Ok(Arc::new(Noop))
        }
    }

    fn perm() -> Permission {
        Permission::new("restrictedMethodName")
    }

    #[test]
    fn builtin_kinds_are_registered() {
        let registry = Registry::builtin();
        for name in [
            kinds::STATIC,
            kinds::FIXED_PARAMS,
            kinds::CONDITION,
            kinds::FILTER_PARAMS,
            kinds::FILTER_RESPONSE,
        ] {
            assert!(registry.contains(name), "{name} missing");
        }
        assert!(registry.get(kinds::CONDITION).unwrap().composite());
        assert!(!registry.get(kinds::STATIC).unwrap().composite());
    }

    #[test]
    fn missing_value_checked_before_type() {
        let mut p = perm();
        let err = add_caveat(&mut p, CaveatOptions::new("foo")).unwrap_err();
        assert!(matches!(err, Error::InvalidValue));
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut p = perm();
        let err = add_caveat(&mut p, CaveatOptions::new("foo").value(1)).unwrap_err();
        assert!(matches!(err, Error::InvalidType(t) if t == "foo"));
        assert!(p.caveats().is_empty());
    }

    #[test]
    fn condition_requires_sub_type_and_validator() {
        let mut p = perm();
        let no_sub = CaveatOptions::new(kinds::CONDITION)
            .value("foo")
            .validator(validator!(|_req, _val| true));
        assert!(matches!(add_caveat(&mut p, no_sub), Err(Error::InvalidOptions(_))));

        let empty_sub = CaveatOptions::new(kinds::CONDITION)
            .value("foo")
            .sub_type("")
            .validator(validator!(|_req, _val| true));
        assert!(matches!(add_caveat(&mut p, empty_sub), Err(Error::InvalidOptions(_))));

        let no_validator = CaveatOptions::new(kinds::CONDITION).value("foo").sub_type("1");
        assert!(matches!(add_caveat(&mut p, no_validator), Err(Error::InvalidOptions(_))));
        assert!(p.caveats().is_empty());
    }

    #[test]
    fn non_composite_drops_sub_type() {
        let mut p = perm();
        add_caveat(
            &mut p,
            CaveatOptions::new(kinds::STATIC).value("x").sub_type("ignored"),
        )
        .unwrap();
        assert_eq!(p.caveats()[0].sub_type(), None);
    }

    #[test]
    fn custom_kind_can_be_registered() {
        let mut registry = Registry::builtin();
        registry.register(Tag).exclusive("tag", kinds::FILTER_PARAMS);

        let mut p = perm();
        registry
            .add_caveat(&mut p, CaveatOptions::new("tag").value(json!({"a": 1})))
            .unwrap();
        let err = registry
            .add_caveat(&mut p, CaveatOptions::new(kinds::FILTER_PARAMS).value(json!({})))
            .unwrap_err();
        assert!(matches!(
            err,
            Error::IncompatibleCaveat { ref requested, ref existing }
                if requested == "filterParams" && existing == "tag"
        ));
    }

    #[test]
    fn empty_registry_knows_nothing() {
        let registry = Registry::new();
        let mut p = perm();
        let err = registry
            .add_caveat(&mut p, CaveatOptions::new(kinds::STATIC).value(1))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidType(_)));
    }

    #[test]
    fn debug_lists_kind_names() {
        let text = format!("{:?}", Registry::builtin());
        assert!(text.contains("fixedParams"));
        assert!(text.contains("exclusions"));
    }
}
