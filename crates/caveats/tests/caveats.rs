use std::thread;

use caveats::{
    Caveat, CaveatOptions, Chain, Discriminator, Error, Permission, Registry, SerializedCaveat,
    Validator, add_caveat, caveat_equal, kinds, remove_caveat, sort_caveats, validator,
};
use chrono::DateTime;
use rpc::Request;
use serde_json::json;
use uuid::Uuid;

fn perm1() -> Permission {
    Permission::new("restrictedMethodName")
        .with_id(Uuid::parse_str("63b225d0-414e-4a2d-8067-c34499c984c7").unwrap())
        .with_date(DateTime::from_timestamp(0, 0).unwrap())
}

fn condition(sub_type: &str, value: &str) -> CaveatOptions {
    CaveatOptions::new(kinds::CONDITION)
        .sub_type(sub_type)
        .value(value)
        .validator(validator!(|req, val| req.params.as_ref() == Some(val)))
}

#[test]
fn rejected_add_leaves_permission_unchanged() {
    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value("Always this!")).unwrap();
    let snapshot = perm.clone();

    let attempts = [
        CaveatOptions::new("foo").value(1),
        CaveatOptions::new(kinds::FILTER_PARAMS),
        CaveatOptions::new(kinds::CONDITION).value("foo"),
        CaveatOptions::new(kinds::STATIC).value("Always this other thing!"),
        CaveatOptions::new(kinds::FIXED_PARAMS).value(json!(["foo"])),
    ];
    for options in attempts {
        assert!(add_caveat(&mut perm, options).is_err());
        assert_eq!(perm, snapshot);
    }
}

#[test]
fn invalid_type_is_reported() {
    let mut perm = perm1();
    let err = add_caveat(&mut perm, CaveatOptions::new("foo").value(json!({}))).unwrap_err();
    assert!(matches!(err, Error::InvalidType(t) if t == "foo"));
    assert_eq!(perm, perm1());
}

#[test]
fn static_and_fixed_params_exclude_each_other() {
    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::FIXED_PARAMS).value(json!(["a"]))).unwrap();
    let err = add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value("x")).unwrap_err();
    assert!(matches!(
        err,
        Error::IncompatibleCaveat { ref requested, ref existing }
            if requested == "static" && existing == "fixedParams"
    ));

    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value("x")).unwrap();
    let err = add_caveat(&mut perm, CaveatOptions::new(kinds::FIXED_PARAMS).value(json!(["a"]))).unwrap_err();
    assert!(matches!(
        err,
        Error::IncompatibleCaveat { ref requested, ref existing }
            if requested == "fixedParams" && existing == "static"
    ));
}

#[test]
fn static_caveat_is_stored() {
    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value("Always this!")).unwrap();
    assert_eq!(
        perm.caveats()[0].to_serialized(),
        SerializedCaveat::new("static").with_value(json!("Always this!"))
    );
}

#[test]
fn duplicate_discriminator_is_rejected() {
    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value("Always this!")).unwrap();
    let err = add_caveat(
        &mut perm,
        CaveatOptions::new(kinds::STATIC).value("Always this other thing!"),
    )
    .unwrap_err();
    assert!(matches!(err, Error::DuplicateCaveat(ref d) if *d == Discriminator::new("static")));

    add_caveat(&mut perm, condition("1", "foo")).unwrap();
    let err = add_caveat(&mut perm, condition("1", "bar")).unwrap_err();
    assert!(matches!(err, Error::DuplicateCaveat(ref d) if *d == Discriminator::composite("condition", "1")));
}

#[test]
fn distinct_discriminators_keep_insertion_order() {
    let mut perm = perm1();
    add_caveat(&mut perm, condition("2", "foo")).unwrap();
    add_caveat(&mut perm, condition("1", "foo")).unwrap();
    add_caveat(&mut perm, CaveatOptions::new(kinds::FILTER_RESPONSE).value(json!([]))).unwrap();

    let order: Vec<_> = perm.caveats().iter().map(|c| c.discriminator()).collect();
    assert_eq!(
        order,
        [
            Discriminator::composite("condition", "2"),
            Discriminator::composite("condition", "1"),
            Discriminator::new("filterResponse"),
        ]
    );
}

#[test]
fn fixed_params_are_normalized() {
    let mut perm = perm1();
    add_caveat(
        &mut perm,
        CaveatOptions::new(kinds::FIXED_PARAMS).slots(vec![Some(json!("foo")), None, Some(json!("bar"))]),
    )
    .unwrap();
    assert_eq!(
        perm.caveats()[0].value(),
        &json!([
            {"fixed": true, "value": "foo"},
            {"fixed": false},
            {"fixed": true, "value": "bar"}
        ])
    );
}

#[test]
fn absent_slots_only_allowed_for_fixed_params() {
    let mut perm = perm1();
    let err = add_caveat(
        &mut perm,
        CaveatOptions::new(kinds::FILTER_RESPONSE).slots(vec![Some(json!("a")), None]),
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidValue));
}

#[test]
fn condition_caveat_validates_requests() {
    let mut perm = perm1();
    add_caveat(&mut perm, condition("1", "foo")).unwrap();

    let caveat = &perm.caveats()[0];
    assert_eq!(caveat.kind(), "condition");
    assert_eq!(caveat.sub_type(), Some("1"));
    assert_eq!(caveat.value(), &json!("foo"));
    assert!(caveat.validate(&Request::new(1i64, "restrictedMethodName").with_params(json!("foo"))));
    assert!(!caveat.validate(&Request::new(1i64, "restrictedMethodName").with_params(json!("bar"))));
}

#[test]
fn remove_then_readd_appends() {
    let mut perm = perm1();
    add_caveat(&mut perm, condition("1", "foo")).unwrap();
    add_caveat(&mut perm, CaveatOptions::new(kinds::FILTER_RESPONSE).value(json!(["0xa"]))).unwrap();
    add_caveat(&mut perm, condition("2", "foo")).unwrap();
    let len = perm.caveats().len();

    let removed = remove_caveat(&mut perm, &Discriminator::composite("condition", "1")).unwrap();
    assert_eq!(removed.value(), &json!("foo"));
    add_caveat(&mut perm, condition("1", "baz")).unwrap();

    assert_eq!(perm.caveats().len(), len);
    let last = perm.caveats().last().unwrap();
    assert_eq!(last.discriminator(), Discriminator::composite("condition", "1"));
    assert_eq!(last.value(), &json!("baz"));
    assert_eq!(perm.caveats()[0].kind(), "filterResponse");
    assert_eq!(perm.caveats()[1].sub_type(), Some("2"));
}

#[test]
fn removing_missing_caveat_changes_nothing() {
    let mut perm = perm1();
    add_caveat(&mut perm, CaveatOptions::new(kinds::STATIC).value(1)).unwrap();
    let snapshot = perm.clone();
    assert!(remove_caveat(&mut perm, &Discriminator::new(kinds::FILTER_PARAMS)).is_none());
    assert!(remove_caveat(&mut perm, &Discriminator::composite(kinds::STATIC, "1")).is_none());
    assert_eq!(perm, snapshot);
}

#[test]
fn equality_of_built_caveats() {
    let build = |options: CaveatOptions| {
        let mut perm = perm1();
        add_caveat(&mut perm, options).unwrap();
        perm.caveats()[0].clone()
    };

    let a = build(condition("1", "foo"));
    let b = build(condition("1", "foo"));
    assert!(caveat_equal(&a, &b));

    let other_value = build(condition("1", "bar"));
    assert!(!caveat_equal(&a, &other_value));

    let rewritten = build(
        CaveatOptions::new(kinds::CONDITION)
            .sub_type("1")
            .value("foo")
            .validator(validator!(|req, val| Some(val) == req.params.as_ref())),
    );
    assert!(!caveat_equal(&a, &rewritten));
}

#[test]
fn sort_orders_type_then_value() {
    let mut caveats = vec![
        SerializedCaveat::new("b"),
        SerializedCaveat::new("a").with_value(json!(2)),
        SerializedCaveat::new("a").with_value(json!(1)),
    ];
    sort_caveats(&mut caveats);
    let keys: Vec<_> = caveats.iter().map(|c| (c.kind.as_str(), c.value.clone())).collect();
    assert_eq!(
        keys,
        [("a", Some(json!(1))), ("a", Some(json!(2))), ("b", None)]
    );
}

fn assert_send_sync<T: Send + Sync>() {}

#[test]
fn caveat_types_are_shareable() {
    assert_send_sync::<Caveat>();
    assert_send_sync::<Validator>();
    assert_send_sync::<Permission>();
    assert_send_sync::<Registry>();

    let mut p = perm1();
    add_caveat(&mut p, condition("1", "foo")).unwrap();
    let snapshot = p.clone();
    let handle = thread::spawn(move || {
        let request = Request::new(1i64, "restrictedMethodName").with_params(json!("foo"));
        Chain::new(&snapshot).authorize(&request).is_ok()
    });
    add_caveat(&mut p, CaveatOptions::new(kinds::FILTER_RESPONSE).value(json!([]))).unwrap();
    assert!(handle.join().unwrap());
    assert_eq!(p.caveats().len(), 2);
}
