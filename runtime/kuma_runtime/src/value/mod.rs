//! Runtime values.
//!
//! Scalars and containers compare structurally. Everything that carries
//! identity (singletons, structs, callables, types, instances) compares by
//! reference: two structs with equal fields are still different structs.
//!
//! All heap allocations go through factory methods on [`Value`]; the
//! runtime is single-threaded and uses `Rc` throughout.

mod heap;

use std::fmt;

use kuma_ir::Name;
use rustc_hash::FxHashMap;

pub use heap::Heap;

use crate::abstraction::{Abstraction, Singleton, StructValue};
use crate::composition::{Class, Instance};
use crate::function::Callable;

/// A value of the dynamically-typed language.
#[derive(Clone)]
pub enum Value {
    /// Absence of a value.
    Nil,
    /// Result of a body that produces nothing.
    Void,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Heap<String>),
    List(Heap<Vec<Value>>),
    /// String-keyed record, also the argument passed to schema guards.
    Hash(Heap<FxHashMap<Name, Value>>),
    /// Named unit value, typically an enum item.
    Singleton(Singleton),
    /// Mutable record validated by its schema.
    Struct(StructValue),
    Callable(Callable),
    /// An abstraction used as a first-class value.
    Type(Abstraction),
    Instance(Instance),
}

// Factory Methods

impl Value {
    #[inline]
    pub fn int(n: i64) -> Self {
        Value::Int(n)
    }

    #[inline]
    pub fn float(f: f64) -> Self {
        Value::Float(f)
    }

    /// Create a string value.
    #[inline]
    pub fn string(s: impl Into<String>) -> Self {
        Value::Str(Heap::new(s.into()))
    }

    /// Create a list value.
    #[inline]
    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Heap::new(items))
    }

    /// Create a hash value.
    #[inline]
    pub fn hash(entries: FxHashMap<Name, Value>) -> Self {
        Value::Hash(Heap::new(entries))
    }

    /// Wrap an abstraction as a value.
    #[inline]
    pub fn abstraction(abstraction: impl Into<Abstraction>) -> Self {
        Value::Type(abstraction.into())
    }

    /// Wrap a class as a value. Calling it constructs an instance.
    #[inline]
    pub fn class(class: &Class) -> Self {
        Value::Type(class.as_abstraction())
    }
}

// Accessors

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Numeric view: integers widen to floats.
    #[expect(
        clippy::cast_precision_loss,
        reason = "number arithmetic in the language follows f64 semantics"
    )]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_hash(&self) -> Option<&FxHashMap<Name, Value>> {
        match self {
            Value::Hash(entries) => Some(entries),
            _ => None,
        }
    }

    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Value::Callable(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_abstraction(&self) -> Option<&Abstraction> {
        match self {
            Value::Type(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Value::Instance(i) => Some(i),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this value may be used as a type-template argument
    /// alongside types.
    pub fn is_primitive(&self) -> bool {
        matches!(
            self,
            Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Get the type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "Nil",
            Value::Void => "Void",
            Value::Bool(_) => "Bool",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Hash(_) => "Hash",
            Value::Singleton(_) => "Singleton",
            Value::Struct(_) => "Struct",
            Value::Callable(_) => "Callable",
            Value::Type(_) => "Type",
            Value::Instance(_) => "Instance",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) | (Value::Void, Value::Void) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Hash(a), Value::Hash(b)) => a == b,
            (Value::Singleton(a), Value::Singleton(b)) => a.ptr_eq(b),
            (Value::Struct(a), Value::Struct(b)) => a.ptr_eq(b),
            (Value::Callable(a), Value::Callable(b)) => a.ptr_eq(b),
            (Value::Type(a), Value::Type(b)) => a.ptr_eq(b),
            (Value::Instance(a), Value::Instance(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

/// Hash entries in name order, for stable output.
pub(crate) fn sorted_entries(entries: &FxHashMap<Name, Value>) -> Vec<(Name, &Value)> {
    let mut sorted: Vec<_> = entries.iter().map(|(k, v)| (*k, v)).collect();
    sorted.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
    sorted
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Void => write!(f, "void"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{}", s.as_str()),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Hash(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in sorted_entries(entries).into_iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Value::Singleton(s) => write!(f, "{}", s.name()),
            Value::Struct(s) => write!(f, "{s}"),
            Value::Callable(c) => write!(f, "{}", c.describe()),
            Value::Type(a) => write!(f, "{a}"),
            Value::Instance(i) => write!(f, "<instance of {}>", i.class().describe()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "Nil"),
            Value::Void => write!(f, "Void"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({:?})", s.as_str()),
            Value::List(items) => f.debug_list().entries(items.iter()).finish(),
            Value::Hash(entries) => f
                .debug_map()
                .entries(sorted_entries(entries))
                .finish(),
            other => write!(f, "{}({other})", other.type_name()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<Callable> for Value {
    fn from(c: Callable) -> Self {
        Value::Callable(c)
    }
}

impl From<Instance> for Value {
    fn from(i: Instance) -> Self {
        Value::Instance(i)
    }
}

impl From<StructValue> for Value {
    fn from(s: StructValue) -> Self {
        Value::Struct(s)
    }
}

impl From<Singleton> for Value {
    fn from(s: Singleton) -> Self {
        Value::Singleton(s)
    }
}
