//! Property-based tests for the type algebra and scope lookups.
//!
//! Random abstraction expressions are built over a small pool of builtin
//! types and checked against the boolean laws `type_equivalent` decides,
//! and against a direct evaluation of membership.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]
#![allow(
    clippy::needless_pass_by_value,
    reason = "Proptest macros generate code with these patterns"
)]

use kuma_runtime::{
    call, complement, intersect, native, overload, overload_added, type_equivalent, types, union,
    Abstraction, Callable, Mutability, Name, Prototype, Scope, Value,
};
use proptest::prelude::*;

// -- Expression Strategies --

#[derive(Clone, Debug)]
enum Expr {
    Leaf(usize),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

fn pool() -> [Abstraction; 4] {
    [types::int(), types::string(), types::bool(), types::nil()]
}

fn samples() -> Vec<Value> {
    vec![
        Value::int(1),
        Value::string("s"),
        Value::Bool(true),
        Value::Nil,
        Value::float(0.5),
    ]
}

fn expr_strategy() -> impl Strategy<Value = Expr> {
    let leaf = (0..4usize).prop_map(Expr::Leaf);
    leaf.prop_recursive(4, 16, 2, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::And(Box::new(a), Box::new(b))),
            (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::Or(Box::new(a), Box::new(b))),
            inner.prop_map(|a| Expr::Not(Box::new(a))),
        ]
    })
}

fn build(expr: &Expr, pool: &[Abstraction]) -> Abstraction {
    match expr {
        Expr::Leaf(i) => pool[*i].clone(),
        Expr::And(a, b) => intersect([build(a, pool), build(b, pool)]),
        Expr::Or(a, b) => union([build(a, pool), build(b, pool)]),
        Expr::Not(a) => complement(&build(a, pool)),
    }
}

fn holds(expr: &Expr, pool: &[Abstraction], value: &Value) -> bool {
    match expr {
        Expr::Leaf(i) => pool[*i].contains(value),
        Expr::And(a, b) => holds(a, pool, value) && holds(b, pool, value),
        Expr::Or(a, b) => holds(a, pool, value) || holds(b, pool, value),
        Expr::Not(a) => !holds(a, pool, value),
    }
}

// -- Algebra Properties --

proptest! {
    #[test]
    fn membership_matches_direct_evaluation(expr in expr_strategy()) {
        let pool = pool();
        let abstraction = build(&expr, &pool);
        for value in samples() {
            prop_assert_eq!(abstraction.contains(&value), holds(&expr, &pool, &value));
        }
    }

    #[test]
    fn de_morgan(a in expr_strategy(), b in expr_strategy()) {
        let pool = pool();
        let (a, b) = (build(&a, &pool), build(&b, &pool));
        let lhs = complement(&union([a.clone(), b.clone()]));
        let rhs = intersect([complement(&a), complement(&b)]);
        prop_assert!(type_equivalent(&lhs, &rhs));
    }

    #[test]
    fn union_and_intersection_commute(a in expr_strategy(), b in expr_strategy()) {
        let pool = pool();
        let (a, b) = (build(&a, &pool), build(&b, &pool));
        prop_assert!(type_equivalent(&union([a.clone(), b.clone()]), &union([b.clone(), a.clone()])));
        prop_assert!(type_equivalent(&intersect([a.clone(), b.clone()]), &intersect([b, a])));
    }

    #[test]
    fn double_complement_is_identity(a in expr_strategy()) {
        let a = build(&a, &pool());
        prop_assert!(type_equivalent(&complement(&complement(&a)), &a));
    }

    #[test]
    fn neutral_elements_are_dropped(a in expr_strategy()) {
        let a = build(&a, &pool());
        prop_assert!(union([a.clone(), types::never()]).ptr_eq(&a));
        prop_assert!(intersect([types::any(), a.clone()]).ptr_eq(&a));
        prop_assert!(union([a.clone(), types::any()]).is_any());
        prop_assert!(intersect([a, types::never()]).is_never());
    }

    #[test]
    fn intersection_distributes_over_union(
        a in expr_strategy(),
        b in expr_strategy(),
        c in expr_strategy(),
    ) {
        let pool = pool();
        let (a, b, c) = (build(&a, &pool), build(&b, &pool), build(&c, &pool));
        let lhs = intersect([a.clone(), union([b.clone(), c.clone()])]);
        let rhs = union([intersect([a.clone(), b]), intersect([a, c])]);
        prop_assert!(type_equivalent(&lhs, &rhs));
    }
}

// -- Scope Properties --

proptest! {
    /// Lookups from a deep scope see the innermost declaration, even after
    /// an earlier lookup was cached and a nearer scope shadowed the name.
    #[test]
    fn lookup_sees_nearest_declaration(
        depth in 1usize..12,
        declared_at in prop::collection::vec(0usize..12, 1..6),
    ) {
        let name = Name::intern("shadowed");
        let mut chain = vec![Scope::root()];
        for _ in 0..depth {
            let next = chain[chain.len() - 1].child();
            chain.push(next);
        }
        let deepest = chain[depth].clone();

        let mut nearest: Option<usize> = None;
        for level in declared_at {
            let level = level.min(depth);
            if !chain[level].try_declare(name, Value::int(i64::try_from(level).unwrap())) {
                continue;
            }
            if nearest < Some(level) {
                nearest = Some(level);
            }
            let expected = i64::try_from(nearest.unwrap()).unwrap();
            prop_assert_eq!(deepest.lookup_opt(name), Some(Value::int(expected)));
        }
    }

    #[test]
    fn reset_respects_declared_abstraction(start in any::<i64>(), next in any::<i64>()) {
        let scope = Scope::root();
        scope.declare("n", Value::int(start), Mutability::Reassignable(types::int())).unwrap();
        let child = scope.child();
        child.reset("n", Value::int(next)).unwrap();
        prop_assert_eq!(scope.lookup("n").unwrap(), Value::int(next));
        prop_assert!(child.reset("n", Value::string("x")).is_err());
        prop_assert_eq!(scope.lookup("n").unwrap(), Value::int(next));
    }
}

// -- Overload Properties --

fn tagged(tag: i64, param: Abstraction) -> Callable {
    let proto = Prototype::builder()
        .param("x", param)
        .returns(types::int())
        .build()
        .unwrap();
    native(format!("f{tag}"), proto, move |_| Ok(Value::int(tag)))
}

proptest! {
    /// The most recently registered applicable candidate wins.
    #[test]
    fn newest_applicable_candidate_wins(accepts_int in prop::collection::vec(any::<bool>(), 1..8)) {
        let candidates: Vec<Callable> = accepts_int
            .iter()
            .enumerate()
            .map(|(i, &int)| {
                let param = if int { types::number() } else { types::string() };
                tagged(i64::try_from(i).unwrap(), param)
            })
            .collect();
        let f = overload("f", &candidates);
        let result = call(&f, &[Value::int(0)]);

        match accepts_int.iter().rposition(|&int| int) {
            Some(newest) => {
                prop_assert_eq!(result.unwrap(), Value::int(i64::try_from(newest).unwrap()));
            }
            None => prop_assert!(result.is_err()),
        }

        let shadowing = overload_added(&f, &tagged(99, types::any()));
        prop_assert_eq!(call(&shadowing, &[Value::int(0)]).unwrap(), Value::int(99));
    }
}
