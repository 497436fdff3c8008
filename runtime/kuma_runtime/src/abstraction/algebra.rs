//! Set algebra over abstractions.
//!
//! Construction simplifies eagerly: `Any` operands vanish from
//! intersections, `Never` operands vanish from unions, absorbing operands
//! collapse the whole expression, and double complements cancel.

use std::fmt;
use std::ops::{BitAnd, BitOr, Not};

use smallvec::SmallVec;

use super::{normalize_dependencies, types, Abstraction, Node};
use crate::value::Value;

/// Operator of a compound abstraction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Intersect,
    Union,
    Complement,
    /// Wraps a single atomic operand so it can be treated as a tree.
    Identity,
}

pub(crate) struct Compound {
    op: Operator,
    operands: SmallVec<[Abstraction; 2]>,
    /// Atomic leaves of the tree, computed once at construction.
    dependencies: Vec<Abstraction>,
}

impl Compound {
    pub(crate) fn operator(&self) -> Operator {
        self.op
    }

    pub(crate) fn operands(&self) -> &[Abstraction] {
        &self.operands
    }

    pub(crate) fn dependencies(&self) -> &[Abstraction] {
        &self.dependencies
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        match self.op {
            Operator::Intersect => self.operands.iter().all(|a| a.contains(value)),
            Operator::Union => self.operands.iter().any(|a| a.contains(value)),
            Operator::Complement => self.operands.iter().all(|a| !a.contains(value)),
            Operator::Identity => self.operands.iter().all(|a| a.contains(value)),
        }
    }
}

impl fmt::Display for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let separator = match self.op {
            Operator::Complement => {
                return self
                    .operands
                    .iter()
                    .try_for_each(|operand| write!(f, "~{operand}"));
            }
            Operator::Identity => {
                return self
                    .operands
                    .iter()
                    .try_for_each(|operand| write!(f, "{operand}"));
            }
            Operator::Intersect => " & ",
            Operator::Union => " | ",
        };
        write!(f, "(")?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(separator)?;
            }
            write!(f, "{operand}")?;
        }
        write!(f, ")")
    }
}

/// Build a compound node without simplification.
pub(crate) fn compound(op: Operator, operands: SmallVec<[Abstraction; 2]>) -> Abstraction {
    let mut dependencies = Vec::new();
    for operand in &operands {
        operand.collect_dependencies(&mut dependencies);
    }
    normalize_dependencies(&mut dependencies);
    Abstraction::new(Node::Compound(Compound {
        op,
        operands,
        dependencies,
    }))
}

/// Shared shape of `intersect` and `union`: `neutral` operands are dropped,
/// an `absorbing` operand wins outright.
fn associative(
    op: Operator,
    operands: impl IntoIterator<Item = Abstraction>,
    is_neutral: fn(&Abstraction) -> bool,
    is_absorbing: fn(&Abstraction) -> bool,
    neutral: fn() -> Abstraction,
) -> Abstraction {
    let mut kept: SmallVec<[Abstraction; 2]> = SmallVec::new();
    for operand in operands {
        if is_absorbing(&operand) {
            return operand;
        }
        if is_neutral(&operand) || kept.iter().any(|k| k.ptr_eq(&operand)) {
            continue;
        }
        kept.push(operand);
    }
    match kept.len() {
        0 => neutral(),
        1 => kept.swap_remove(0),
        _ => compound(op, kept),
    }
}

/// Intersection of `operands`. Empty input yields `Any`.
pub fn intersect(operands: impl IntoIterator<Item = Abstraction>) -> Abstraction {
    associative(
        Operator::Intersect,
        operands,
        Abstraction::is_any,
        Abstraction::is_never,
        types::any,
    )
}

/// Union of `operands`. Empty input yields `Never`.
pub fn union(operands: impl IntoIterator<Item = Abstraction>) -> Abstraction {
    associative(
        Operator::Union,
        operands,
        Abstraction::is_never,
        Abstraction::is_any,
        types::never,
    )
}

/// Complement of `operand`.
pub fn complement(operand: &Abstraction) -> Abstraction {
    match operand.node() {
        Node::Universal => types::never(),
        Node::Empty => types::any(),
        Node::Compound(inner) if inner.operator() == Operator::Complement => {
            first_operand(inner, operand)
        }
        Node::Compound(inner) if inner.operator() == Operator::Identity => {
            complement(&first_operand(inner, operand))
        }
        _ => compound(Operator::Complement, SmallVec::from_elem(operand.clone(), 1)),
    }
}

/// Wrap `operand` as an identity compound. Compounds are returned as is.
pub fn wrap(operand: &Abstraction) -> Abstraction {
    match operand.node() {
        Node::Compound(_) => operand.clone(),
        _ => compound(Operator::Identity, SmallVec::from_elem(operand.clone(), 1)),
    }
}

fn first_operand(compound: &Compound, fallback: &Abstraction) -> Abstraction {
    compound
        .operands()
        .first()
        .cloned()
        .unwrap_or_else(|| fallback.clone())
}

impl BitAnd for &Abstraction {
    type Output = Abstraction;

    fn bitand(self, rhs: Self) -> Abstraction {
        intersect([self.clone(), rhs.clone()])
    }
}

impl BitOr for &Abstraction {
    type Output = Abstraction;

    fn bitor(self, rhs: Self) -> Abstraction {
        union([self.clone(), rhs.clone()])
    }
}

impl Not for &Abstraction {
    type Output = Abstraction;

    fn not(self) -> Abstraction {
        complement(self)
    }
}
