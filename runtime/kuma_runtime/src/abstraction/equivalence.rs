//! Structural equivalence by truth table.
//!
//! Two abstractions are equivalent when they have the same atomic
//! dependencies and agree on every assignment of truth values to those
//! dependencies. The check is exponential in the number of dependencies;
//! it is exact, not approximate, so there is no cap.

use rustc_hash::FxHashMap;

use super::algebra::Operator;
use super::{Abstraction, Node};
use crate::config::RuntimeConfig;
use crate::stack::ensure_sufficient_stack;

/// Whether `a` and `b` contain exactly the same values for every possible
/// meaning of their atomic leaves.
#[tracing::instrument(level = "trace", skip_all, fields(lhs = %a, rhs = %b))]
pub fn type_equivalent(a: &Abstraction, b: &Abstraction) -> bool {
    if a.ptr_eq(b) {
        return true;
    }

    let deps = a.dependencies();
    let other = b.dependencies();
    if deps.len() != other.len() || deps.iter().zip(&other).any(|(x, y)| !x.ptr_eq(y)) {
        return false;
    }

    let threshold = RuntimeConfig::current().equivalence_warn_threshold;
    if deps.len() > threshold {
        tracing::warn!(
            dependencies = deps.len(),
            threshold,
            "type equivalence enumerates 2^{} assignments",
            deps.len()
        );
    }

    let index: FxHashMap<usize, usize> = deps
        .iter()
        .enumerate()
        .map(|(position, dep)| (dep.id(), position))
        .collect();
    let mut assignment = vec![false; deps.len()];
    loop {
        if evaluate(a, &index, &assignment) != evaluate(b, &index, &assignment) {
            return false;
        }
        if !advance(&mut assignment) {
            return true;
        }
    }
}

/// Binary-counter increment. Returns `false` once every assignment was seen.
fn advance(bits: &mut [bool]) -> bool {
    for bit in bits.iter_mut() {
        if *bit {
            *bit = false;
        } else {
            *bit = true;
            return true;
        }
    }
    false
}

fn evaluate(abstraction: &Abstraction, index: &FxHashMap<usize, usize>, assignment: &[bool]) -> bool {
    ensure_sufficient_stack(|| match abstraction.node() {
        Node::Universal => true,
        Node::Empty => false,
        Node::Compound(compound) => {
            let mut operands = compound.operands().iter();
            match compound.operator() {
                Operator::Intersect | Operator::Identity => {
                    operands.all(|operand| evaluate(operand, index, assignment))
                }
                Operator::Union => operands.any(|operand| evaluate(operand, index, assignment)),
                Operator::Complement => !operands.all(|operand| evaluate(operand, index, assignment)),
            }
        }
        Node::Category(category) => evaluate(category.concept(), index, assignment),
        _ => index
            .get(&abstraction.id())
            .and_then(|&position| assignment.get(position).copied())
            .unwrap_or(false),
    })
}

#[cfg(test)]
mod tests;
