//! Singletons, enums and finite value sets.

use std::rc::Rc;

use kuma_ir::Name;
use rustc_hash::FxHashSet;

use super::{Abstraction, Node};
use crate::errors::{duplicate_enum_item, EvalError};
use crate::value::Value;

/// A named unit value, equal only to itself.
#[derive(Clone)]
pub struct Singleton(Rc<SingletonData>);

struct SingletonData {
    name: Name,
}

/// Create a fresh singleton. Two calls with the same name yield distinct
/// values.
pub fn create_value(name: &str) -> Singleton {
    Singleton(Rc::new(SingletonData {
        name: Name::intern(name),
    }))
}

impl Singleton {
    pub fn name(&self) -> Name {
        self.0.name
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Singleton) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

/// A named, ordered set of singletons.
#[derive(Clone)]
pub struct Enumeration(Rc<EnumData>);

struct EnumData {
    name: Name,
    items: Vec<Singleton>,
}

/// Create an enum whose items are fresh singletons.
pub fn create_enum(name: &str, items: &[&str]) -> Result<Enumeration, EvalError> {
    let mut seen = FxHashSet::default();
    let mut singletons = Vec::with_capacity(items.len());
    for item in items {
        let singleton = create_value(item);
        if !seen.insert(singleton.name()) {
            return Err(duplicate_enum_item(singleton.name()));
        }
        singletons.push(singleton);
    }
    Ok(Enumeration(Rc::new(EnumData {
        name: Name::intern(name),
        items: singletons,
    })))
}

impl Enumeration {
    pub fn name(&self) -> Name {
        self.0.name
    }

    pub fn items(&self) -> &[Singleton] {
        &self.0.items
    }

    /// The item called `name`.
    pub fn get(&self, name: &str) -> Option<Singleton> {
        let name = Name::intern(name);
        self.0.items.iter().find(|item| item.name() == name).cloned()
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        match value {
            Value::Singleton(s) => self.0.items.iter().any(|item| item.ptr_eq(s)),
            _ => false,
        }
    }
}

/// The finite set of exactly `values`.
pub fn one_of(values: impl IntoIterator<Item = Value>) -> Abstraction {
    Abstraction::new(Node::Finite(values.into_iter().collect()))
}
