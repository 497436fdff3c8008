//! Function prototypes: named, typed parameters and a return abstraction.

use std::fmt;

use kuma_ir::Name;

use crate::abstraction::{types, Abstraction};
use crate::errors::{duplicate_parameter, ArgumentFailure, EvalError};
use crate::value::Value;

/// How parameters are declared in the call scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ParamMode {
    #[default]
    Fixed,
    /// Parameters may be reset to any value of their abstraction.
    Reassignable,
}

#[derive(Clone)]
pub struct Parameter {
    pub name: Name,
    pub abstraction: Abstraction,
}

#[derive(Clone)]
pub struct Prototype {
    params: Vec<Parameter>,
    value: Abstraction,
    mode: ParamMode,
}

impl Prototype {
    pub fn builder() -> PrototypeBuilder {
        PrototypeBuilder::default()
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    /// Abstraction every return value must belong to.
    pub fn value(&self) -> &Abstraction {
        &self.value
    }

    pub fn mode(&self) -> ParamMode {
        self.mode
    }

    /// No parameters, returning `value`.
    pub fn returning(value: Abstraction) -> Prototype {
        Prototype {
            params: Vec::new(),
            value,
            mode: ParamMode::Fixed,
        }
    }

    /// The same parameters returning `value`.
    #[must_use]
    pub fn with_value(&self, value: Abstraction) -> Prototype {
        Prototype {
            params: self.params.clone(),
            value,
            mode: self.mode,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    /// Check arity, then each argument against its parameter, in order.
    pub fn check_args(&self, args: &[Value]) -> Result<(), ArgumentFailure> {
        if args.len() != self.params.len() {
            return Err(ArgumentFailure::Arity {
                expected: self.params.len(),
                got: args.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(args) {
            if !param.abstraction.contains(arg) {
                return Err(ArgumentFailure::Type {
                    param: param.name,
                    expected: param.abstraction.to_string(),
                    got: arg.type_name().to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for Prototype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", param.name, param.abstraction)?;
        }
        write!(f, ") -> {}", self.value)
    }
}

/// Builder for [`Prototype`]. The return abstraction defaults to `Any`.
#[derive(Default)]
pub struct PrototypeBuilder {
    params: Vec<Parameter>,
    value: Option<Abstraction>,
    mode: ParamMode,
}

impl PrototypeBuilder {
    #[must_use]
    pub fn param(mut self, name: &str, abstraction: impl Into<Abstraction>) -> Self {
        self.params.push(Parameter {
            name: Name::intern(name),
            abstraction: abstraction.into(),
        });
        self
    }

    #[must_use]
    pub fn returns(mut self, abstraction: impl Into<Abstraction>) -> Self {
        self.value = Some(abstraction.into());
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: ParamMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn build(self) -> Result<Prototype, EvalError> {
        for (i, param) in self.params.iter().enumerate() {
            if self.params[..i].iter().any(|p| p.name == param.name) {
                return Err(duplicate_parameter(param.name));
            }
        }
        Ok(Prototype {
            params: self.params,
            value: self.value.unwrap_or_else(types::any),
            mode: self.mode,
        })
    }
}
