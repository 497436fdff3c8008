use pretty_assertions::assert_eq;

use super::*;
use crate::abstraction::types;
use crate::errors::EvalErrorKind;
use crate::function::{native, Prototype};

fn n(text: &str) -> Name {
    Name::intern(text)
}

/// Guard: `x <= y` whenever both are present.
fn ordered_guard() -> Callable {
    let proto = Prototype::builder()
        .param("fields", types::hash())
        .returns(types::bool())
        .build()
        .unwrap();
    native("ordered", proto, |args| {
        let fields = args[0].as_hash().cloned().unwrap_or_default();
        let x = fields.get(&n("x")).and_then(Value::as_float);
        let y = fields.get(&n("y")).and_then(Value::as_float);
        Ok(Value::Bool(match (x, y) {
            (Some(x), Some(y)) => x <= y,
            _ => true,
        }))
    })
}

fn point() -> Schema {
    SchemaBuilder::new("Point")
        .field("x", types::number())
        .field("y", types::number())
        .default("y", Value::int(0))
        .build()
        .unwrap()
}

#[test]
fn test_create_applies_defaults() {
    let p = point().create([(n("x"), Value::int(3))]).unwrap();
    assert_eq!(p.get(n("x")).unwrap(), Value::int(3));
    assert_eq!(p.get(n("y")).unwrap(), Value::int(0));
    assert_eq!(p.to_string(), "Point { x: 3, y: 0 }");
}

#[test]
fn test_create_reports_missing_field() {
    let err = point().create([]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::SchemaFieldMissing { field: n("x") });
}

#[test]
fn test_create_reports_invalid_field() {
    let err = point()
        .create([(n("x"), Value::string("three"))])
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::SchemaFieldInvalid { field: n("x") });
}

#[test]
fn test_check_all_reports_applied_defaults() {
    let schema = point();
    let mut record = FxHashMap::default();
    record.insert(n("x"), Value::int(1));
    assert_eq!(
        schema.check_all(&mut record),
        SchemaCheck::DefaultsApplied(vec![n("y")])
    );
    assert_eq!(record.get(&n("y")), Some(&Value::int(0)));
    assert_eq!(schema.check_all(&mut record), SchemaCheck::Ok);
}

#[test]
fn test_set_rejects_invalid_value_and_keeps_old_one() {
    let p = point().create([(n("x"), Value::int(3))]).unwrap();
    let err = p.set(n("x"), Value::string("s")).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::SchemaFieldInvalid { field: n("x") });
    assert!(!err.is_fatal());
    assert_eq!(p.get(n("x")).unwrap(), Value::int(3));
}

#[test]
fn test_unknown_field_access() {
    let p = point().create([(n("x"), Value::int(3))]).unwrap();
    assert!(!p.has(n("z")));
    let err = p.get(n("z")).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::StructFieldMissing { field: n("z") });
    assert!(p.set(n("z"), Value::Nil).is_err());
}

#[test]
fn test_invalid_default_is_rejected() {
    let err = SchemaBuilder::new("Bad")
        .field("x", types::int())
        .default("x", Value::string("no"))
        .build()
        .err()
        .unwrap();
    assert_eq!(err.kind, EvalErrorKind::SchemaInvalidDefault { field: n("x") });

    let err = SchemaBuilder::new("Bad")
        .default("ghost", Value::int(1))
        .build()
        .err()
        .unwrap();
    assert_eq!(err.kind, EvalErrorKind::SchemaUnknownDefault { field: n("ghost") });
}

#[test]
fn test_guard_rejects_creation() {
    let schema = SchemaBuilder::new("Range")
        .field("x", types::number())
        .field("y", types::number())
        .guard(ordered_guard())
        .build()
        .unwrap();
    let err = schema
        .create([(n("x"), Value::int(5)), (n("y"), Value::int(1))])
        .unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::SchemaGuardRejected { schema: n("Range") });
    assert!(!err.is_fatal());
}

#[test]
fn test_guard_violation_after_set_is_fatal() {
    let schema = SchemaBuilder::new("Range")
        .field("x", types::number())
        .field("y", types::number())
        .guard(ordered_guard())
        .build()
        .unwrap();
    let range = schema
        .create([(n("x"), Value::int(1)), (n("y"), Value::int(5))])
        .unwrap();
    range.set(n("x"), Value::int(2)).unwrap();
    let err = range.set(n("x"), Value::int(9)).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.kind, EvalErrorKind::StructGuardViolated { schema: n("Range") });
}

#[test]
fn test_guard_must_return_bool() {
    let proto = Prototype::builder().param("fields", types::hash()).build().unwrap();
    let schema = SchemaBuilder::new("Odd")
        .field("x", types::int())
        .guard(native("nil_guard", proto, |_| Ok(Value::Nil)))
        .build()
        .unwrap();
    let err = schema.create([(n("x"), Value::int(1))]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::GuardNotBool { .. }));
}

#[test]
fn test_contains_composes_fields() {
    let point3 = SchemaBuilder::new("Point3")
        .contains(&point())
        .field("z", types::number())
        .build()
        .unwrap();
    let names: Vec<Name> = point3.fields().map(|(name, _)| name).collect();
    assert_eq!(names, vec![n("x"), n("y"), n("z")]);
    let p = point3
        .create([(n("x"), Value::int(1)), (n("z"), Value::int(2))])
        .unwrap();
    assert_eq!(p.get(n("y")).unwrap(), Value::int(0));
}

#[test]
fn test_contains_field_conflict() {
    let err = SchemaBuilder::new("Twice")
        .contains(&point())
        .field("x", types::int())
        .build()
        .err()
        .unwrap();
    assert_eq!(err.kind, EvalErrorKind::SchemaFieldConflict { field: n("x") });
}

#[test]
fn test_schema_membership_is_by_schema_identity() {
    let a = point();
    let b = point();
    let p = a.create([(n("x"), Value::int(1))]).unwrap();
    assert!(Abstraction::from(a).contains(&Value::from(p.clone())));
    assert!(!Abstraction::from(b).contains(&Value::from(p)));
}

#[test]
fn test_extra_entries_are_dropped() {
    let p = point()
        .create([(n("x"), Value::int(1)), (n("w"), Value::int(9))])
        .unwrap();
    assert_eq!(p.snapshot().len(), 2);
}

#[test]
fn test_struct_debug_names_schema() {
    let p = point().create([(n("x"), Value::int(3))]).unwrap();
    assert_eq!(
        format!("{p:?}"),
        "StructValue { schema: Name(\"Point\"), fields: 2, .. }"
    );
}
