//! Categories: a precondition partitioned into named branches.
//!
//! Branches are stored already intersected with the precondition. A branch
//! that is itself a category is rebuilt under the combined precondition, so
//! branch resolution can descend into it and report a path of names.

use std::fmt;

use kuma_ir::Name;
use rustc_hash::FxHashSet;

use super::{intersect, union, Abstraction, Node};
use crate::errors::{category_branch_missing, duplicate_branch, EvalError};
use crate::value::Value;

pub struct Category {
    precondition: Abstraction,
    branches: Vec<(Name, Abstraction)>,
    /// `precondition & (branch_1 | ... | branch_n)`
    concept: Abstraction,
}

/// Build a category over `precondition`.
pub fn category(
    precondition: &Abstraction,
    branches: impl IntoIterator<Item = (Name, Abstraction)>,
) -> Result<Abstraction, EvalError> {
    let mut seen = FxHashSet::default();
    let mut stored = Vec::new();
    for (name, branch) in branches {
        if !seen.insert(name) {
            return Err(duplicate_branch(name));
        }
        let refined = match branch.as_category() {
            Some(nested) => category(
                &intersect([precondition.clone(), nested.precondition.clone()]),
                nested.branches.iter().cloned(),
            )?,
            None => intersect([precondition.clone(), branch]),
        };
        stored.push((name, refined));
    }

    let concept = intersect([
        precondition.clone(),
        union(stored.iter().map(|(_, branch)| branch.clone())),
    ]);
    tracing::trace!(branches = stored.len(), %concept, "category built");
    Ok(Abstraction::new(Node::Category(Category {
        precondition: precondition.clone(),
        branches: stored,
        concept,
    })))
}

impl Category {
    pub fn precondition(&self) -> &Abstraction {
        &self.precondition
    }

    pub fn concept(&self) -> &Abstraction {
        &self.concept
    }

    pub fn branches(&self) -> impl Iterator<Item = (Name, &Abstraction)> {
        self.branches.iter().map(|(name, branch)| (*name, branch))
    }

    /// A branch, intersected with the precondition.
    pub fn branch(&self, name: Name) -> Option<&Abstraction> {
        self.branches
            .iter()
            .find(|(branch, _)| *branch == name)
            .map(|(_, abstraction)| abstraction)
    }

    /// Path of branch names leading to the branch that contains `value`,
    /// or `None` when the value is outside the category.
    pub fn try_resolve(&self, value: &Value) -> Option<Vec<Name>> {
        if !self.precondition.contains(value) {
            return None;
        }
        for (name, branch) in &self.branches {
            match branch.as_category() {
                Some(nested) => {
                    if let Some(mut path) = nested.try_resolve(value) {
                        path.insert(0, *name);
                        return Some(path);
                    }
                }
                None if branch.contains(value) => return Some(vec![*name]),
                None => {}
            }
        }
        None
    }

    /// Like [`Category::try_resolve`] for a value known to satisfy the
    /// precondition. Finding no branch means the branches do not cover the
    /// precondition, which is fatal.
    pub fn resolve(&self, value: &Value) -> Result<Vec<Name>, EvalError> {
        self.try_resolve(value)
            .ok_or_else(|| category_branch_missing(&self.to_string(), value.type_name()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Category<")?;
        for (i, (name, _)) in self.branches.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "{name}")?;
        }
        write!(f, ">")
    }
}
