use super::*;
use crate::abstraction::{category, complement, intersect, types, union, wrap};
use crate::config::{configure, RuntimeConfig};
use kuma_ir::Name;

fn atom(desc: &str) -> Abstraction {
    Abstraction::atomic(desc, |_| true)
}

#[test]
fn test_identity_is_equivalent() {
    let a = atom("A");
    assert!(type_equivalent(&a, &a));
    assert!(type_equivalent(&a, &wrap(&a)));
}

#[test]
fn test_distinct_atoms_are_not_equivalent() {
    // Same predicate, different identity.
    assert!(!type_equivalent(&atom("A"), &atom("A")));
}

#[test]
fn test_de_morgan() {
    let a = atom("A");
    let b = atom("B");
    let lhs = complement(&union([a.clone(), b.clone()]));
    let rhs = intersect([complement(&a), complement(&b)]);
    assert!(type_equivalent(&lhs, &rhs));
}

#[test]
fn test_distributivity() {
    let a = atom("A");
    let b = atom("B");
    let c = atom("C");
    let lhs = intersect([a.clone(), union([b.clone(), c.clone()])]);
    let rhs = union([intersect([a.clone(), b]), intersect([a, c])]);
    assert!(type_equivalent(&lhs, &rhs));
}

#[test]
fn test_operand_order_is_irrelevant() {
    let a = atom("A");
    let b = atom("B");
    assert!(type_equivalent(
        &union([a.clone(), b.clone()]),
        &union([b.clone(), a.clone()])
    ));
    assert!(!type_equivalent(&union([a.clone(), b.clone()]), &intersect([a, b])));
}

#[test]
fn test_different_dependencies_are_not_equivalent() {
    let a = atom("A");
    let b = atom("B");
    // `A | (B & ~B)` simplifies to `A` only semantically.
    let tautology = union([a.clone(), intersect([b.clone(), complement(&b)])]);
    assert!(!type_equivalent(&a, &tautology));
}

#[test]
fn test_any_and_never() {
    assert!(type_equivalent(&types::any(), &types::any()));
    assert!(!type_equivalent(&types::any(), &types::never()));
    assert!(type_equivalent(&complement(&types::never()), &types::any()));
}

#[test]
fn test_category_is_compared_through_concept() {
    let a = atom("A");
    let b = atom("B");
    let pre = atom("Pre");
    let cat = category(&pre, [(Name::intern("A"), a.clone()), (Name::intern("B"), b.clone())])
        .ok();
    let concept = intersect([pre, union([a, b])]);
    assert!(cat.is_some_and(|cat| type_equivalent(&cat, &concept)));
}

#[test]
fn test_large_check_still_answers() {
    configure(RuntimeConfig {
        equivalence_warn_threshold: 2,
        ..RuntimeConfig::default()
    });
    let atoms: Vec<Abstraction> = (0..5).map(|i| atom(&format!("A{i}"))).collect();
    let lhs = union(atoms.iter().cloned());
    let rhs = complement(&intersect(atoms.iter().map(complement)));
    assert!(type_equivalent(&lhs, &rhs));
    configure(RuntimeConfig::default());
}
