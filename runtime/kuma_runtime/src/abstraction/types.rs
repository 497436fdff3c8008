//! Built-in abstractions.
//!
//! Every built-in is allocated once per thread, so `types::number()` always
//! returns the same identity. `list_of` and `hash_of` are memoized on their
//! element type for the same reason.

use std::cell::RefCell;

use rustc_hash::FxHashMap;
use smallvec::smallvec;

use super::algebra::{compound, Operator};
use super::{Abstraction, Node};
use crate::value::Value;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Builtin {
    Nil,
    Void,
    Bool,
    Int,
    Float,
    Number,
    String,
    List,
    Hash,
    Struct,
    Callable,
    Type,
    Instance,
    Singleton,
}

impl Builtin {
    pub(crate) fn name(self) -> &'static str {
        match self {
            Builtin::Nil => "Nil",
            Builtin::Void => "Void",
            Builtin::Bool => "Bool",
            Builtin::Int => "Int",
            Builtin::Float => "Float",
            Builtin::Number => "Number",
            Builtin::String => "String",
            Builtin::List => "List",
            Builtin::Hash => "Hash",
            Builtin::Struct => "Struct",
            Builtin::Callable => "Callable",
            Builtin::Type => "Type",
            Builtin::Instance => "Instance",
            Builtin::Singleton => "Singleton",
        }
    }

    pub(crate) fn contains(self, value: &Value) -> bool {
        match self {
            Builtin::Nil => matches!(value, Value::Nil),
            Builtin::Void => matches!(value, Value::Void),
            Builtin::Bool => matches!(value, Value::Bool(_)),
            Builtin::Int => matches!(value, Value::Int(_)),
            Builtin::Float => matches!(value, Value::Float(_)),
            Builtin::Number => match value {
                Value::Int(_) => true,
                Value::Float(x) => x.is_finite(),
                _ => false,
            },
            Builtin::String => matches!(value, Value::Str(_)),
            Builtin::List => matches!(value, Value::List(_)),
            Builtin::Hash => matches!(value, Value::Hash(_)),
            Builtin::Struct => matches!(value, Value::Struct(_)),
            Builtin::Callable => matches!(value, Value::Callable(_)),
            Builtin::Type => matches!(value, Value::Type(_)),
            Builtin::Instance => matches!(value, Value::Instance(_)),
            Builtin::Singleton => matches!(value, Value::Singleton(_)),
        }
    }
}

struct Builtins {
    any: Abstraction,
    never: Abstraction,
    nil: Abstraction,
    void: Abstraction,
    bool: Abstraction,
    int: Abstraction,
    float: Abstraction,
    number: Abstraction,
    string: Abstraction,
    list: Abstraction,
    hash: Abstraction,
    structure: Abstraction,
    callable: Abstraction,
    type_: Abstraction,
    instance: Abstraction,
    singleton: Abstraction,
    primitive: Abstraction,
    list_of: RefCell<FxHashMap<usize, Abstraction>>,
    hash_of: RefCell<FxHashMap<usize, Abstraction>>,
}

impl Builtins {
    fn new() -> Self {
        let builtin = |b| Abstraction::new(Node::Builtin(b));
        let number = builtin(Builtin::Number);
        let string = builtin(Builtin::String);
        let bool = builtin(Builtin::Bool);
        let primitive = compound(
            Operator::Union,
            smallvec![number.clone(), string.clone(), bool.clone()],
        );
        Self {
            any: Abstraction::new(Node::Universal),
            never: Abstraction::new(Node::Empty),
            nil: builtin(Builtin::Nil),
            void: builtin(Builtin::Void),
            bool,
            int: builtin(Builtin::Int),
            float: builtin(Builtin::Float),
            number,
            string,
            list: builtin(Builtin::List),
            hash: builtin(Builtin::Hash),
            structure: builtin(Builtin::Struct),
            callable: builtin(Builtin::Callable),
            type_: builtin(Builtin::Type),
            instance: builtin(Builtin::Instance),
            singleton: builtin(Builtin::Singleton),
            primitive,
            list_of: RefCell::default(),
            hash_of: RefCell::default(),
        }
    }
}

thread_local! {
    static BUILTINS: Builtins = Builtins::new();
}

fn with<R>(f: impl FnOnce(&Builtins) -> R) -> R {
    BUILTINS.with(f)
}

/// Every value.
pub fn any() -> Abstraction {
    with(|b| b.any.clone())
}

/// No value.
pub fn never() -> Abstraction {
    with(|b| b.never.clone())
}

pub fn nil() -> Abstraction {
    with(|b| b.nil.clone())
}

pub fn void() -> Abstraction {
    with(|b| b.void.clone())
}

pub fn bool() -> Abstraction {
    with(|b| b.bool.clone())
}

pub fn int() -> Abstraction {
    with(|b| b.int.clone())
}

pub fn float() -> Abstraction {
    with(|b| b.float.clone())
}

/// Integers and floats.
pub fn number() -> Abstraction {
    with(|b| b.number.clone())
}

pub fn string() -> Abstraction {
    with(|b| b.string.clone())
}

pub fn list() -> Abstraction {
    with(|b| b.list.clone())
}

pub fn hash() -> Abstraction {
    with(|b| b.hash.clone())
}

/// Any struct, whatever its schema.
pub fn structure() -> Abstraction {
    with(|b| b.structure.clone())
}

pub fn callable() -> Abstraction {
    with(|b| b.callable.clone())
}

/// Abstractions used as values.
pub fn type_() -> Abstraction {
    with(|b| b.type_.clone())
}

pub fn instance() -> Abstraction {
    with(|b| b.instance.clone())
}

pub fn singleton() -> Abstraction {
    with(|b| b.singleton.clone())
}

/// `Number | String | Bool`.
pub fn primitive() -> Abstraction {
    with(|b| b.primitive.clone())
}

/// Lists whose every element belongs to `element`.
pub fn list_of(element: &Abstraction) -> Abstraction {
    with(|b| {
        b.list_of
            .borrow_mut()
            .entry(element.id())
            .or_insert_with(|| Abstraction::new(Node::ListOf(element.clone())))
            .clone()
    })
}

/// Hashes whose every value belongs to `element`.
pub fn hash_of(element: &Abstraction) -> Abstraction {
    with(|b| {
        b.hash_of
            .borrow_mut()
            .entry(element.id())
            .or_insert_with(|| Abstraction::new(Node::HashOf(element.clone())))
            .clone()
    })
}
