//! Lexical scopes.
//!
//! A [`Scope`] is a node in a tree of variable maps linked to their
//! parents. Scopes are shared: a function captures its defining scope,
//! every call creates a child of it, and instance methods reach their
//! instance scope through weak handles.
//!
//! # Lookup cache
//!
//! A lookup that resolves more than `lookup_cache_depth` scopes above the
//! requesting scope records the owning scope on the requesting scope.
//! Every tree shares an epoch counter; declaring into a scope that already
//! has children bumps it, which invalidates all cached entries, since the
//! new declaration may shadow whatever they point at. Variables are never
//! removed, so entries from the current epoch are always correct.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use kuma_ir::Name;
use rustc_hash::FxHashMap;

use crate::abstraction::Abstraction;
use crate::config::RuntimeConfig;
use crate::errors::{
    already_declared, not_reassignable, scope_read_only, variable_not_declared,
    variable_not_found, variable_type_mismatch, EvalError, EvalResult,
};
use crate::value::Value;

/// Whether a variable binding can be reset.
#[derive(Clone)]
pub enum Mutability {
    /// Bound once, never reset.
    Fixed,
    /// Resettable to any value of the given abstraction.
    Reassignable(Abstraction),
}

impl Mutability {
    #[inline]
    pub fn is_fixed(&self) -> bool {
        matches!(self, Mutability::Fixed)
    }
}

struct Binding {
    value: Value,
    mutability: Mutability,
}

struct CacheEntry {
    owner: Scope,
    epoch: u64,
}

/// State shared by every scope of one tree.
struct ScopeTree {
    epoch: Cell<u64>,
    cache_depth: usize,
}

struct ScopeNode {
    parent: Option<Scope>,
    bindings: RefCell<FxHashMap<Name, Binding>>,
    cache: RefCell<FxHashMap<Name, CacheEntry>>,
    read_only: bool,
    depth: usize,
    has_children: Cell<bool>,
    tree: Rc<ScopeTree>,
}

/// A shared handle to a scope.
#[derive(Clone)]
pub struct Scope(Rc<ScopeNode>);

/// A non-owning handle to a scope.
#[derive(Clone)]
pub struct WeakScope(Weak<ScopeNode>);

impl WeakScope {
    pub fn upgrade(&self) -> Option<Scope> {
        self.0.upgrade().map(Scope)
    }
}

impl Scope {
    fn with_parts(
        parent: Option<&Scope>,
        bindings: FxHashMap<Name, Binding>,
        read_only: bool,
    ) -> Self {
        let tree = match parent {
            Some(parent) => {
                parent.0.has_children.set(true);
                Rc::clone(&parent.0.tree)
            }
            None => Rc::new(ScopeTree {
                epoch: Cell::new(0),
                cache_depth: RuntimeConfig::current().lookup_cache_depth,
            }),
        };
        Scope(Rc::new(ScopeNode {
            parent: parent.cloned(),
            bindings: RefCell::new(bindings),
            cache: RefCell::default(),
            read_only,
            depth: parent.map_or(0, |p| p.0.depth + 1),
            has_children: Cell::new(false),
            tree,
        }))
    }

    /// A new root scope.
    pub fn root() -> Self {
        Self::with_parts(None, FxHashMap::default(), false)
    }

    /// A new child of this scope.
    pub fn child(&self) -> Self {
        Self::with_parts(Some(self), FxHashMap::default(), false)
    }

    /// A scope whose variables are fixed at construction.
    pub fn read_only(
        parent: Option<&Scope>,
        bindings: impl IntoIterator<Item = (Name, Value)>,
    ) -> Self {
        let bindings = bindings
            .into_iter()
            .map(|(name, value)| {
                let binding = Binding {
                    value,
                    mutability: Mutability::Fixed,
                };
                (name, binding)
            })
            .collect();
        Self::with_parts(parent, bindings, true)
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.0.parent.as_ref()
    }

    /// Distance from the root.
    pub fn depth(&self) -> usize {
        self.0.depth
    }

    pub fn is_read_only(&self) -> bool {
        self.0.read_only
    }

    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn downgrade(&self) -> WeakScope {
        WeakScope(Rc::downgrade(&self.0))
    }

    /// Whether `name` is declared in this scope itself.
    pub fn has(&self, name: impl Into<Name>) -> bool {
        self.0.bindings.borrow().contains_key(&name.into())
    }

    /// Declare a new variable in this scope.
    pub fn declare(
        &self,
        name: impl Into<Name>,
        value: Value,
        mutability: Mutability,
    ) -> Result<(), EvalError> {
        let name = name.into();
        if self.0.read_only {
            return Err(scope_read_only(name));
        }
        if let Mutability::Reassignable(abstraction) = &mutability {
            if !abstraction.contains(&value) {
                return Err(variable_type_mismatch(name, &abstraction.to_string()));
            }
        }
        {
            let mut bindings = self.0.bindings.borrow_mut();
            if bindings.contains_key(&name) {
                return Err(already_declared(name));
            }
            bindings.insert(name, Binding { value, mutability });
        }
        if self.0.has_children.get() {
            let tree = &self.0.tree;
            tree.epoch.set(tree.epoch.get() + 1);
            tracing::trace!(%name, epoch = tree.epoch.get(), "lookup caches invalidated");
        }
        Ok(())
    }

    /// Declare a fixed variable.
    pub fn declare_fixed(&self, name: impl Into<Name>, value: Value) -> Result<(), EvalError> {
        self.declare(name, value, Mutability::Fixed)
    }

    /// Declare a fixed variable unless this scope refuses it.
    ///
    /// Returns whether the declaration happened.
    pub fn try_declare(&self, name: impl Into<Name>, value: Value) -> bool {
        self.declare_fixed(name, value).is_ok()
    }

    /// The scope that declares `name`, walking towards the root.
    fn owner_of(&self, name: Name) -> Option<Scope> {
        if self.0.bindings.borrow().contains_key(&name) {
            return Some(self.clone());
        }

        let epoch = self.0.tree.epoch.get();
        if let Some(entry) = self.0.cache.borrow().get(&name) {
            if entry.epoch == epoch {
                return Some(entry.owner.clone());
            }
        }

        let mut distance = 0;
        let mut current = self.0.parent.as_ref();
        while let Some(scope) = current {
            distance += 1;
            if scope.0.bindings.borrow().contains_key(&name) {
                if distance > self.0.tree.cache_depth {
                    self.0.cache.borrow_mut().insert(
                        name,
                        CacheEntry {
                            owner: scope.clone(),
                            epoch,
                        },
                    );
                }
                return Some(scope.clone());
            }
            current = scope.0.parent.as_ref();
        }
        None
    }

    /// The value of `name`, if declared here or in an ancestor.
    pub fn lookup_opt(&self, name: impl Into<Name>) -> Option<Value> {
        let name = name.into();
        let owner = self.owner_of(name)?;
        let value = owner.0.bindings.borrow().get(&name).map(|b| b.value.clone());
        value
    }

    /// The value of `name`, searching this scope then its ancestors.
    pub fn lookup(&self, name: impl Into<Name>) -> EvalResult {
        let name = name.into();
        self.lookup_opt(name).ok_or_else(|| variable_not_found(name))
    }

    /// Replace the value of a reassignable variable in its owning scope.
    pub fn reset(&self, name: impl Into<Name>, value: Value) -> Result<(), EvalError> {
        let name = name.into();
        let owner = self
            .owner_of(name)
            .ok_or_else(|| variable_not_declared(name))?;
        if owner.0.read_only {
            return Err(scope_read_only(name));
        }
        // Predicates may read this scope, so no borrow is held while checking.
        let mutability = owner
            .0
            .bindings
            .borrow()
            .get(&name)
            .map(|binding| binding.mutability.clone())
            .ok_or_else(|| variable_not_declared(name))?;
        let Mutability::Reassignable(abstraction) = mutability else {
            return Err(not_reassignable(name));
        };
        if !abstraction.contains(&value) {
            return Err(variable_type_mismatch(name, &abstraction.to_string()));
        }
        let result = match owner.0.bindings.borrow_mut().get_mut(&name) {
            Some(binding) => {
                binding.value = value;
                Ok(())
            }
            None => Err(variable_not_declared(name)),
        };
        result
    }

    /// Names declared in this scope itself, in no particular order.
    pub fn local_names(&self) -> Vec<Name> {
        self.0.bindings.borrow().keys().copied().collect()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("depth", &self.0.depth)
            .field("bindings", &self.0.bindings.borrow().len())
            .field("read_only", &self.0.read_only)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
