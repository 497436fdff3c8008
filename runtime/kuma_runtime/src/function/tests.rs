use pretty_assertions::assert_eq;

use super::*;
use crate::abstraction::{types, SchemaBuilder};
use crate::composition::ClassBuilder;
use crate::config::{configure, RuntimeConfig};
use crate::errors::{ArgumentFailure, EvalErrorKind};

fn number_proto(params: &[&str]) -> Prototype {
    params
        .iter()
        .fold(Prototype::builder(), |builder, name| {
            builder.param(name, types::number())
        })
        .returns(types::number())
        .build()
        .unwrap()
}

fn add() -> Callable {
    native("add", number_proto(&["a", "b"]), |args| {
        Ok(Value::float(
            args[0].as_float().unwrap_or_default() + args[1].as_float().unwrap_or_default(),
        ))
    })
}

// Prototypes

#[test]
fn test_prototype_description() {
    assert_eq!(number_proto(&["x"]).to_string(), "(x: Number) -> Number");
}

#[test]
fn test_prototype_rejects_duplicate_parameters() {
    let err = Prototype::builder()
        .param("x", types::int())
        .param("x", types::int())
        .build()
        .err()
        .unwrap();
    assert_eq!(
        err.kind,
        EvalErrorKind::DuplicateParameter {
            name: Name::intern("x")
        }
    );
}

#[test]
fn test_check_args_reports_first_failure() {
    let proto = number_proto(&["a", "b"]);
    assert_eq!(
        proto.check_args(&[Value::int(1)]),
        Err(ArgumentFailure::Arity {
            expected: 2,
            got: 1
        })
    );
    assert_eq!(
        proto.check_args(&[Value::int(1), Value::Nil]),
        Err(ArgumentFailure::Type {
            param: Name::intern("b"),
            expected: "Number".to_string(),
            got: "Nil".to_string(),
        })
    );
    assert_eq!(proto.check_args(&[Value::int(1), Value::int(2)]), Ok(()));
}

// Invocation

#[test]
fn test_call_native() {
    assert_eq!(
        call(&add(), &[Value::int(1), Value::float(0.5)]).unwrap(),
        Value::float(1.5)
    );
}

#[test]
fn test_call_checks_arity_and_types() {
    let err = call(&add(), &[Value::int(1)]).unwrap_err();
    assert!(matches!(
        err.kind,
        EvalErrorKind::ArityMismatch {
            expected: 2,
            got: 1,
            ..
        }
    ));
    let err = call(&add(), &[Value::int(1), Value::string("2")]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ArgumentTypeMismatch { .. }));
}

#[test]
fn test_call_checks_return_value() {
    let liar = native("liar", number_proto(&[]), |_| Ok(Value::string("nope")));
    let err = call(&liar, &[]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::ReturnTypeMismatch { .. }));
}

#[test]
fn test_body_sees_parameters_and_captured_scope() {
    let outer = Scope::root();
    outer.declare_fixed("offset", Value::int(10)).unwrap();
    let shifted = wrap(&outer, "shifted", number_proto(&["x"]), |frame| {
        let x = frame.arg("x")?.as_int().unwrap_or_default();
        let offset = frame.arg("offset")?.as_int().unwrap_or_default();
        Ok(Value::int(x + offset))
    });
    assert_eq!(call(&shifted, &[Value::int(5)]).unwrap(), Value::int(15));
    // The call scope is discarded afterwards.
    assert!(!outer.has("x"));
}

#[test]
fn test_reassignable_parameters() {
    let proto = Prototype::builder()
        .param("x", types::int())
        .mode(ParamMode::Reassignable)
        .build()
        .unwrap();
    let bump = wrap(&Scope::root(), "bump", proto, |frame| {
        frame.scope().reset("x", Value::int(2))?;
        let rejected = frame.scope().reset("x", Value::string("s")).is_err();
        Ok(Value::Bool(rejected && frame.arg("x")? == Value::int(2)))
    });
    assert_eq!(call(&bump, &[Value::int(1)]).unwrap(), Value::Bool(true));
}

#[test]
fn test_fixed_parameters_cannot_be_reset() {
    let proto = Prototype::builder().param("x", types::int()).build().unwrap();
    let f = wrap(&Scope::root(), "f", proto, |frame| {
        frame.scope().reset("x", Value::int(2))?;
        Ok(Value::Void)
    });
    let err = call(&f, &[Value::int(1)]).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::NotReassignable { .. }));
}

#[test]
fn test_mount_outside_initializer() {
    let init = native("init", Prototype::builder().build().unwrap(), |_| Ok(Value::Void));
    let class = ClassBuilder::new("class Dummy", &init).build().unwrap();
    let instance = class.create(&[]).unwrap();
    let f = wrap(&Scope::root(), "f", number_proto(&[]), move |frame| {
        assert!(frame.receiver().is_none());
        Err(frame.mount(&instance).unwrap_err())
    });
    let err = call(&f, &[]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::InvalidMount);
}

// Overloads

fn area_overload() -> (Callable, Callable) {
    let circle = SchemaBuilder::new("Circle")
        .field("r", types::number())
        .build()
        .unwrap();
    let square = SchemaBuilder::new("Square")
        .field("a", types::number())
        .build()
        .unwrap();
    let circle_area = native(
        "area",
        Prototype::builder()
            .param("c", circle)
            .returns(types::number())
            .build()
            .unwrap(),
        |_| Ok(Value::string("circle")),
    );
    let square_area = native(
        "area",
        Prototype::builder()
            .param("s", square)
            .returns(types::any())
            .build()
            .unwrap(),
        |_| Ok(Value::string("square")),
    );
    (circle_area, square_area)
}

#[test]
fn test_overload_reports_every_candidate() {
    let (circle_area, square_area) = area_overload();
    let area = overload("area", &[circle_area, square_area]);
    let err = call(&area, &[Value::int(42)]).unwrap_err();
    let EvalErrorKind::NoMatchingOverload { name, candidates } = &err.kind else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(name, "area");
    assert_eq!(candidates.len(), 2);
    // Newest first.
    assert!(candidates[0].candidate.contains("s: Square"));
    assert!(candidates[1].candidate.contains("c: Circle"));
}

#[test]
fn test_overload_prefers_newest_candidate() {
    let older = native("pick", Prototype::builder().param("x", types::number()).build().unwrap(), |_| {
        Ok(Value::string("number"))
    });
    let newer = native("pick", Prototype::builder().param("x", types::int()).build().unwrap(), |_| {
        Ok(Value::string("int"))
    });
    let pick = overload_added(&older, &newer);
    assert_eq!(call(&pick, &[Value::int(1)]).unwrap(), Value::string("int"));
    assert_eq!(call(&pick, &[Value::float(1.5)]).unwrap(), Value::string("number"));
    assert!(pick.is_overload());
    assert_eq!(pick.prototypes().len(), 2);
}

#[test]
fn test_overload_concat_flattens() {
    let (circle_area, square_area) = area_overload();
    let a = overload("area", &[circle_area]);
    let b = overload("area", &[square_area]);
    let both = overload_concat(&[a, b]);
    assert_eq!(both.prototypes().len(), 2);
    assert_eq!(both.describe(), "area");
}

#[test]
fn test_candidate_body_errors_are_not_retried() {
    let fallback = native("f", Prototype::builder().build().unwrap(), |_| Ok(Value::Nil));
    let failing = native("f", Prototype::builder().build().unwrap(), |_| {
        Err(EvalError::new("boom"))
    });
    let f = overload("f", &[fallback, failing]);
    assert_eq!(call(&f, &[]).unwrap_err().message, "boom");
}

// Bindings

#[test]
fn test_bind_context_replaces_scope() {
    let first = Scope::root();
    first.declare_fixed("v", Value::int(1)).unwrap();
    let second = Scope::root();
    second.declare_fixed("v", Value::int(2)).unwrap();

    let read = wrap(&first, "read", Prototype::builder().build().unwrap(), |frame| {
        frame.arg("v")
    });
    let bound = bind_context(&read, &second);
    assert!(bound.is_binding());
    assert_eq!(call(&bound, &[]).unwrap(), Value::int(2));
    assert_eq!(call(&cancel_binding(&bound), &[]).unwrap(), Value::int(1));

    // Rebinding never nests.
    let rebound = bind_context(&bound, &first);
    assert!(cancel_binding(&rebound).ptr_eq(&read));
}

// Call stack

#[test]
fn test_errors_carry_backtrace() {
    let inner = native("inner", Prototype::builder().build().unwrap(), |_| {
        Err(EvalError::new("boom"))
    });
    let outer = native("outer", Prototype::builder().build().unwrap(), move |_| {
        call(&inner, &[])
    });
    let err = call(&outer, &[]).unwrap_err();
    let frames: Vec<String> = err
        .backtrace
        .unwrap()
        .frames()
        .iter()
        .map(|frame| frame.name.clone())
        .collect();
    assert_eq!(frames, vec!["inner".to_string(), "outer".to_string()]);
    assert_eq!(call_depth(), 0);
}

#[test]
fn test_max_call_depth() {
    configure(RuntimeConfig {
        max_call_depth: Some(8),
        ..RuntimeConfig::default()
    });
    let scope = Scope::root();
    let recurse = wrap(&scope, "recurse", Prototype::builder().build().unwrap(), |frame| {
        let me = frame.arg("recurse")?;
        call_value(&me, &[])
    });
    scope
        .declare_fixed("recurse", Value::Callable(recurse.clone()))
        .unwrap();
    let err = call(&recurse, &[]).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::StackOverflow { depth: 8 });
    assert_eq!(call_depth(), 0);
    configure(RuntimeConfig::default());
}

#[test]
fn test_call_value_rejects_non_callables() {
    let err = call_value(&Value::int(1), &[]).unwrap_err();
    assert_eq!(
        err.kind,
        EvalErrorKind::NotCallable {
            type_name: "Int".to_string()
        }
    );
    assert!(call_value(&Value::abstraction(types::int()), &[]).is_err());
}
