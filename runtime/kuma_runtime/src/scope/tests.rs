use pretty_assertions::assert_eq;

use super::*;
use crate::abstraction::{types, Abstraction};
use crate::config::{configure, RuntimeConfig};
use crate::errors::EvalErrorKind;

fn n(text: &str) -> Name {
    Name::intern(text)
}

#[test]
fn test_declare_and_lookup() {
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    assert_eq!(root.lookup("x").unwrap(), Value::int(1));
    assert!(root.has("x"));
    assert!(!root.has("y"));
}

#[test]
fn test_lookup_walks_parents() {
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    let child = root.child().child();
    assert_eq!(child.lookup("x").unwrap(), Value::int(1));
    assert!(!child.has("x"));
    assert_eq!(child.depth(), 2);
}

#[test]
fn test_lookup_missing_variable() {
    let err = Scope::root().lookup("missing").unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::VariableNotFound { name: n("missing") });
    assert_eq!(Scope::root().lookup_opt("missing"), None);
}

#[test]
fn test_declare_twice_fails() {
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    let err = root.declare_fixed("x", Value::int(2)).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::AlreadyDeclared { name: n("x") });
    assert!(!root.try_declare("x", Value::int(3)));
    assert_eq!(root.lookup("x").unwrap(), Value::int(1));
}

#[test]
fn test_shadowing_in_child() {
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    let child = root.child();
    child.declare_fixed("x", Value::int(2)).unwrap();
    assert_eq!(child.lookup("x").unwrap(), Value::int(2));
    assert_eq!(root.lookup("x").unwrap(), Value::int(1));
}

#[test]
fn test_reset_reassignable() {
    let root = Scope::root();
    root.declare("x", Value::int(1), Mutability::Reassignable(types::number()))
        .unwrap();
    let child = root.child();
    child.reset("x", Value::float(2.5)).unwrap();
    assert_eq!(root.lookup("x").unwrap(), Value::float(2.5));
}

#[test]
fn test_reset_checks_type_and_keeps_old_value() {
    let root = Scope::root();
    root.declare("x", Value::int(1), Mutability::Reassignable(types::number()))
        .unwrap();
    let err = root.reset("x", Value::string("no")).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::VariableTypeMismatch { .. }));
    assert_eq!(root.lookup("x").unwrap(), Value::int(1));
}

#[test]
fn test_reset_predicate_may_read_the_owning_scope() {
    let root = Scope::root();
    root.declare_fixed("limit", Value::int(10)).unwrap();
    let weak = root.downgrade();
    let below_limit = Abstraction::atomic("BelowLimit", move |value| {
        let limit = weak
            .upgrade()
            .and_then(|scope| scope.lookup_opt("limit"))
            .and_then(|limit| limit.as_int());
        matches!((value.as_int(), limit), (Some(x), Some(limit)) if x < limit)
    });
    root.declare("x", Value::int(1), Mutability::Reassignable(below_limit))
        .unwrap();

    root.reset("x", Value::int(5)).unwrap();
    assert_eq!(root.lookup("x").unwrap(), Value::int(5));

    let err = root.reset("x", Value::int(50)).unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::VariableTypeMismatch { .. }));
    assert_eq!(root.lookup("x").unwrap(), Value::int(5));
}

#[test]
fn test_reset_fixed_fails() {
    let root = Scope::root();
    root.declare_fixed("pi", Value::float(2.5)).unwrap();
    let err = root.reset("pi", Value::float(3.0)).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::NotReassignable { name: n("pi") });
}

#[test]
fn test_reset_undeclared_fails() {
    let err = Scope::root().reset("ghost", Value::Nil).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::VariableNotDeclared { name: n("ghost") });
}

#[test]
fn test_declare_checks_initial_value() {
    let err = Scope::root()
        .declare("x", Value::string("s"), Mutability::Reassignable(types::int()))
        .unwrap_err();
    assert!(matches!(err.kind, EvalErrorKind::VariableTypeMismatch { .. }));
}

#[test]
fn test_read_only_scope_rejects_mutation() {
    let frozen = Scope::read_only(None, [(n("x"), Value::int(1))]);
    assert!(frozen.is_read_only());
    assert_eq!(frozen.lookup("x").unwrap(), Value::int(1));

    let err = frozen.declare_fixed("y", Value::Nil).unwrap_err();
    assert_eq!(err.kind, EvalErrorKind::ScopeReadOnly { name: n("y") });

    // Children of a read-only scope are ordinary scopes.
    let child = frozen.child();
    child.declare_fixed("y", Value::Nil).unwrap();
    assert_eq!(child.lookup("x").unwrap(), Value::int(1));
}

#[test]
fn test_deep_lookup_is_cached_and_invalidated_by_shadowing() {
    configure(RuntimeConfig {
        lookup_cache_depth: 1,
        ..RuntimeConfig::default()
    });
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    let middle = root.child();
    let leaf = middle.child().child();

    // Resolved three levels up: cached on `leaf`.
    assert_eq!(leaf.lookup("x").unwrap(), Value::int(1));
    assert_eq!(leaf.0.cache.borrow().len(), 1);
    assert_eq!(leaf.lookup("x").unwrap(), Value::int(1));

    // A later declaration in between must win over the cache.
    middle.declare_fixed("x", Value::int(2)).unwrap();
    assert_eq!(leaf.lookup("x").unwrap(), Value::int(2));

    configure(RuntimeConfig::default());
}

#[test]
fn test_shallow_lookup_is_not_cached() {
    let root = Scope::root();
    root.declare_fixed("x", Value::int(1)).unwrap();
    let child = root.child();
    assert_eq!(child.lookup("x").unwrap(), Value::int(1));
    assert!(child.0.cache.borrow().is_empty());
}

#[test]
fn test_weak_scope_upgrade() {
    let scope = Scope::root();
    let weak = scope.downgrade();
    assert!(weak.upgrade().is_some_and(|s| s.ptr_eq(&scope)));
    drop(scope);
    assert!(weak.upgrade().is_none());
}
