//! Type templates: memoized functions from arguments to types.
//!
//! Inflating a template twice with equal arguments returns the same
//! abstraction, so `List<Int>` built in two places is one type. Type
//! arguments are keyed by identity, primitives by value.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::Abstraction;
use crate::errors::{template_arg_invalid, template_return_invalid, EvalResult};
use crate::function::{call, Callable};
use crate::value::Value;

#[derive(Clone, Hash, PartialEq, Eq)]
enum TemplateKey {
    Type(usize),
    Bool(bool),
    Int(i64),
    /// Bit pattern; `0.0` and `-0.0` inflate separately.
    Float(u64),
    Str(String),
}

impl TemplateKey {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Type(t) => Some(TemplateKey::Type(t.id())),
            Value::Bool(b) => Some(TemplateKey::Bool(*b)),
            Value::Int(n) => Some(TemplateKey::Int(*n)),
            Value::Float(x) => Some(TemplateKey::Float(x.to_bits())),
            Value::Str(s) => Some(TemplateKey::Str(s.to_string())),
            _ => None,
        }
    }
}

struct Inflation {
    /// Keeps type arguments alive so their identities are never reused.
    _args: Vec<Value>,
    result: Abstraction,
}

#[derive(Clone)]
pub struct TypeTemplate(Rc<TemplateData>);

struct TemplateData {
    desc: String,
    inflater: Callable,
    cache: RefCell<FxHashMap<Vec<TemplateKey>, Inflation>>,
    /// Every type this template produced, in inflation order.
    inflated: RefCell<Vec<Abstraction>>,
}

impl TypeTemplate {
    /// A template whose instances are produced by `inflater`.
    pub fn new(desc: impl Into<String>, inflater: Callable) -> Self {
        TypeTemplate(Rc::new(TemplateData {
            desc: desc.into(),
            inflater,
            cache: RefCell::default(),
            inflated: RefCell::default(),
        }))
    }

    pub fn describe(&self) -> &str {
        &self.0.desc
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// Instantiate the template.
    ///
    /// Every argument must be a type or a primitive. The inflater runs at
    /// most once per distinct argument list.
    #[tracing::instrument(level = "debug", skip_all, fields(template = %self.0.desc))]
    pub fn inflate(&self, args: &[Value]) -> EvalResult<Abstraction> {
        let key = args
            .iter()
            .enumerate()
            .map(|(i, arg)| TemplateKey::of(arg).ok_or_else(|| template_arg_invalid(i + 1)))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(hit) = self.0.cache.borrow().get(&key) {
            return Ok(hit.result.clone());
        }

        // The inflater may inflate this template again; no borrow is held.
        let produced = call(&self.0.inflater, args)?;
        let Value::Type(result) = produced else {
            return Err(template_return_invalid(produced.type_name()));
        };

        tracing::debug!(%result, "template inflated");
        let result = self
            .0
            .cache
            .borrow_mut()
            .entry(key)
            .or_insert_with(|| {
                self.0.inflated.borrow_mut().push(result.clone());
                Inflation {
                    _args: args.to_vec(),
                    result,
                }
            })
            .result
            .clone();
        Ok(result)
    }

    /// Types produced so far.
    pub fn inflated(&self) -> Vec<Abstraction> {
        self.0.inflated.borrow().clone()
    }

    /// A value belongs to a template when it belongs to any inflated type.
    pub(crate) fn contains(&self, value: &Value) -> bool {
        self.0.inflated.borrow().iter().any(|t| t.contains(value))
    }
}
