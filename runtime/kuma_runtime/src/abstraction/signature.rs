//! Function signatures as abstractions.
//!
//! A signature contains every callable with a prototype whose parameter
//! abstractions and return abstraction are each [`type_equivalent`] to its
//! own. Parameter names are irrelevant.

use std::fmt;

use super::{type_equivalent, Abstraction};
use crate::function::Prototype;
use crate::value::Value;

#[derive(Clone)]
pub struct Signature {
    params: Vec<Abstraction>,
    value: Abstraction,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = Abstraction>, value: Abstraction) -> Self {
        Self {
            params: params.into_iter().collect(),
            value,
        }
    }

    /// Signature of an existing prototype.
    pub fn of(proto: &Prototype) -> Self {
        Self::new(
            proto.params().iter().map(|p| p.abstraction.clone()),
            proto.value().clone(),
        )
    }

    pub fn params(&self) -> &[Abstraction] {
        &self.params
    }

    pub fn value(&self) -> &Abstraction {
        &self.value
    }

    /// Whether `proto` has exactly this shape.
    pub fn matches(&self, proto: &Prototype) -> bool {
        self.params.len() == proto.params().len()
            && type_equivalent(&self.value, proto.value())
            && self
                .params
                .iter()
                .zip(proto.params())
                .all(|(expected, param)| type_equivalent(expected, &param.abstraction))
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        match value {
            Value::Callable(callable) => callable.prototypes().iter().any(|p| self.matches(p)),
            Value::Type(abstraction) => abstraction
                .as_class()
                .is_some_and(|class| self.matches(&class.constructor_prototype())),
            _ => false,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.value)
    }
}
