//! The abstraction engine: runtime types as first-class values.
//!
//! An [`Abstraction`] is anything that can answer "is this value a member?".
//! Built-in types, host predicates, schemas, enums, classes and interfaces
//! are all abstractions, and the algebra in [`algebra`] combines them.
//!
//! # Identity
//!
//! Abstractions compare by identity, never structurally. Kinds that carry
//! their own shared state (schemas, enums, classes, ...) take their
//! identity from that state, so wrapping the same class twice yields two
//! handles with one identity. [`type_equivalent`] is the only structural
//! comparison, and it treats every non-compound abstraction as an opaque
//! boolean variable.

mod algebra;
mod category;
mod enumeration;
mod equivalence;
mod schema;
mod signature;
mod template;
pub mod types;

use std::fmt;
use std::rc::Rc;

pub use algebra::{complement, intersect, union, wrap, Operator};
pub use category::{category, Category};
pub use enumeration::{create_enum, create_value, one_of, Enumeration, Singleton};
pub use equivalence::type_equivalent;
pub use schema::{Schema, SchemaBuilder, SchemaCheck, StructValue};
pub use signature::Signature;
pub use template::TypeTemplate;

use crate::composition::{Class, Interface};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

use algebra::Compound;
use types::Builtin;

/// Host predicate backing an atomic abstraction.
pub type Predicate = Box<dyn Fn(&Value) -> bool>;

/// A runtime type.
#[derive(Clone)]
pub struct Abstraction(Rc<Node>);

pub(crate) enum Node {
    /// Contains every value.
    Universal,
    /// Contains no value.
    Empty,
    Builtin(Builtin),
    Atomic { desc: String, predicate: Predicate },
    Compound(Compound),
    Category(Category),
    /// Finite set of values, compared with `==`.
    Finite(Vec<Value>),
    ListOf(Abstraction),
    HashOf(Abstraction),
    Singleton(Singleton),
    Enum(Enumeration),
    Schema(Schema),
    Signature(Signature),
    Template(TypeTemplate),
    Class(Class),
    Interface(Interface),
}

impl Abstraction {
    pub(crate) fn new(node: Node) -> Self {
        Abstraction(Rc::new(node))
    }

    pub(crate) fn node(&self) -> &Node {
        &self.0
    }

    /// An atomic abstraction backed by a host predicate.
    pub fn atomic(desc: impl Into<String>, predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        Self::new(Node::Atomic {
            desc: desc.into(),
            predicate: Box::new(predicate),
        })
    }

    /// Identity of this abstraction.
    ///
    /// Handles wrapping the same schema, enum, class, interface, singleton
    /// or template share one identity.
    pub fn id(&self) -> usize {
        match self.node() {
            Node::Singleton(s) => s.id(),
            Node::Enum(e) => e.id(),
            Node::Schema(s) => s.id(),
            Node::Template(t) => t.id(),
            Node::Class(c) => c.id(),
            Node::Interface(i) => i.id(),
            _ => Rc::as_ptr(&self.0) as usize,
        }
    }

    /// Identity comparison.
    #[inline]
    pub fn ptr_eq(&self, other: &Abstraction) -> bool {
        self.id() == other.id()
    }

    /// Membership test.
    pub fn contains(&self, value: &Value) -> bool {
        ensure_sufficient_stack(|| match self.node() {
            Node::Universal => true,
            Node::Empty => false,
            Node::Builtin(builtin) => builtin.contains(value),
            Node::Atomic { predicate, .. } => predicate(value),
            Node::Compound(compound) => compound.contains(value),
            Node::Category(category) => category.concept().contains(value),
            Node::Finite(values) => values.iter().any(|v| v == value),
            Node::ListOf(element) => value
                .as_list()
                .is_some_and(|items| items.iter().all(|item| element.contains(item))),
            Node::HashOf(element) => value
                .as_hash()
                .is_some_and(|entries| entries.values().all(|item| element.contains(item))),
            Node::Singleton(singleton) => {
                matches!(value, Value::Singleton(s) if s.ptr_eq(singleton))
            }
            Node::Enum(enumeration) => enumeration.contains(value),
            Node::Schema(schema) => schema.contains(value),
            Node::Signature(signature) => signature.contains(value),
            Node::Template(template) => template.contains(value),
            Node::Class(class) => class.contains(value),
            Node::Interface(interface) => interface.contains(value),
        })
    }

    /// Atomic dependencies, sorted by identity and deduplicated.
    ///
    /// A compound depends on the atomic leaves of its tree; a category on
    /// the leaves of its concept. `Any` and `Never` have none. Everything
    /// else depends on itself.
    pub fn dependencies(&self) -> Vec<Abstraction> {
        let mut deps = Vec::new();
        self.collect_dependencies(&mut deps);
        normalize_dependencies(&mut deps);
        deps
    }

    pub(crate) fn collect_dependencies(&self, out: &mut Vec<Abstraction>) {
        match self.node() {
            Node::Universal | Node::Empty => {}
            Node::Compound(compound) => out.extend(compound.dependencies().iter().cloned()),
            Node::Category(category) => category.concept().collect_dependencies(out),
            _ => out.push(self.clone()),
        }
    }

    pub fn is_any(&self) -> bool {
        matches!(self.node(), Node::Universal)
    }

    pub fn is_never(&self) -> bool {
        matches!(self.node(), Node::Empty)
    }

    /// The operator, when this abstraction is a compound.
    pub fn operator(&self) -> Option<Operator> {
        match self.node() {
            Node::Compound(compound) => Some(compound.operator()),
            _ => None,
        }
    }

    pub fn as_category(&self) -> Option<&Category> {
        match self.node() {
            Node::Category(category) => Some(category),
            _ => None,
        }
    }

    pub fn as_schema(&self) -> Option<&Schema> {
        match self.node() {
            Node::Schema(schema) => Some(schema),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&Enumeration> {
        match self.node() {
            Node::Enum(enumeration) => Some(enumeration),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<&Signature> {
        match self.node() {
            Node::Signature(signature) => Some(signature),
            _ => None,
        }
    }

    pub fn as_template(&self) -> Option<&TypeTemplate> {
        match self.node() {
            Node::Template(template) => Some(template),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&Class> {
        match self.node() {
            Node::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_interface(&self) -> Option<&Interface> {
        match self.node() {
            Node::Interface(interface) => Some(interface),
            _ => None,
        }
    }
}

pub(crate) fn normalize_dependencies(deps: &mut Vec<Abstraction>) {
    deps.sort_by_key(Abstraction::id);
    deps.dedup_by_key(|dep| dep.id());
}

/// `is(value, abstraction)`.
#[inline]
pub fn is(value: &Value, abstraction: &Abstraction) -> bool {
    abstraction.contains(value)
}

impl fmt::Display for Abstraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.node() {
            Node::Universal => write!(f, "Any"),
            Node::Empty => write!(f, "Never"),
            Node::Builtin(builtin) => write!(f, "{}", builtin.name()),
            Node::Atomic { desc, .. } => write!(f, "{desc}"),
            Node::Compound(compound) => write!(f, "{compound}"),
            Node::Category(category) => write!(f, "{category}"),
            Node::Finite(values) => {
                write!(f, "one_of(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
            Node::ListOf(element) => write!(f, "List<{element}>"),
            Node::HashOf(element) => write!(f, "Hash<{element}>"),
            Node::Singleton(singleton) => write!(f, "{}", singleton.name()),
            Node::Enum(enumeration) => write!(f, "{}", enumeration.name()),
            Node::Schema(schema) => write!(f, "{}", schema.name()),
            Node::Signature(signature) => write!(f, "{signature}"),
            Node::Template(template) => write!(f, "{}", template.describe()),
            Node::Class(class) => write!(f, "{}", class.describe()),
            Node::Interface(interface) => write!(f, "{}", interface.describe()),
        }
    }
}

impl fmt::Debug for Abstraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Abstraction({self})")
    }
}

impl From<Singleton> for Abstraction {
    fn from(singleton: Singleton) -> Self {
        Self::new(Node::Singleton(singleton))
    }
}

impl From<Enumeration> for Abstraction {
    fn from(enumeration: Enumeration) -> Self {
        Self::new(Node::Enum(enumeration))
    }
}

impl From<Schema> for Abstraction {
    fn from(schema: Schema) -> Self {
        Self::new(Node::Schema(schema))
    }
}

impl From<Signature> for Abstraction {
    fn from(signature: Signature) -> Self {
        Self::new(Node::Signature(signature))
    }
}

impl From<TypeTemplate> for Abstraction {
    fn from(template: TypeTemplate) -> Self {
        Self::new(Node::Template(template))
    }
}

impl From<Class> for Abstraction {
    fn from(class: Class) -> Self {
        Self::new(Node::Class(class))
    }
}

impl From<Interface> for Abstraction {
    fn from(interface: Interface) -> Self {
        Self::new(Node::Interface(interface))
    }
}

impl From<&Abstraction> for Abstraction {
    fn from(abstraction: &Abstraction) -> Self {
        abstraction.clone()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
