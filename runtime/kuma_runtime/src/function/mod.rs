//! The function and overload engine.
//!
//! A [`Callable`] is one of three things:
//!
//! - a **function**: prototype, captured scope and host body;
//! - an **overload**: an ordered list of functions, tried newest first;
//! - a **binding**: another callable pinned to a scope and, for methods,
//!   to the instance it was bound for.
//!
//! Every invocation checks arguments against the prototype, runs the body
//! in a fresh child of the captured scope with parameters declared, and
//! checks the return value.

mod call_stack;
mod prototype;

use std::rc::{Rc, Weak};

use kuma_ir::Name;

pub use call_stack::{call_depth, capture_backtrace};
pub use prototype::{ParamMode, Parameter, Prototype, PrototypeBuilder};

use crate::composition::{Instance, InstanceData, Mounter};
use crate::errors::{
    argument_failure, duplicate_parameter, instance_dropped, invalid_mount, no_matching_overload,
    not_callable, return_type_mismatch, CandidateFailure, EvalError, EvalResult,
};
use crate::scope::{Mutability, Scope, WeakScope};
use crate::stack::ensure_sufficient_stack;
use crate::value::Value;

pub(crate) use call_stack::CallGuard;

/// Host code run as a function body.
pub type RawBody = Box<dyn Fn(&mut Frame<'_>) -> EvalResult>;

/// What a body sees while it runs.
pub struct Frame<'a> {
    scope: Scope,
    args: &'a [Value],
    receiver: Option<Instance>,
    mounter: Option<&'a mut Mounter>,
}

impl<'a> Frame<'a> {
    pub(crate) fn new(
        scope: Scope,
        args: &'a [Value],
        receiver: Option<Instance>,
        mounter: Option<&'a mut Mounter>,
    ) -> Self {
        Self {
            scope,
            args,
            receiver,
            mounter,
        }
    }

    /// The call scope: a child of the captured scope holding the parameters.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Arguments in positional order.
    pub fn args(&self) -> &[Value] {
        self.args
    }

    /// Current value of a parameter or any variable visible from the call.
    pub fn arg(&self, name: &str) -> EvalResult {
        self.scope.lookup(name)
    }

    /// The instance a method was bound for.
    pub fn receiver(&self) -> Option<&Instance> {
        self.receiver.as_ref()
    }

    /// Mount a base-class instance. Only valid inside an initializer.
    pub fn mount(&mut self, instance: &Instance) -> Result<(), EvalError> {
        match self.mounter.as_deref_mut() {
            Some(mounter) => mounter.mount(instance),
            None => Err(invalid_mount()),
        }
    }
}

pub struct Function {
    desc: String,
    proto: Prototype,
    context: Scope,
    body: RawBody,
}

impl Function {
    pub fn prototype(&self) -> &Prototype {
        &self.proto
    }

    pub fn context(&self) -> &Scope {
        &self.context
    }

    pub fn describe(&self) -> &str {
        &self.desc
    }

    /// Run the body in a fresh child of `context`.
    #[tracing::instrument(level = "debug", skip_all, fields(callable = %self.desc))]
    fn run(&self, context: &Scope, args: &[Value], receiver: Option<Instance>) -> EvalResult {
        self.proto
            .check_args(args)
            .map_err(|failure| argument_failure(&self.desc, failure))?;

        let guard = CallGuard::enter(&self.desc)?;
        self.run_in(context.child(), args, receiver)
            .map_err(|err| guard.annotate(err))
    }

    fn run_in(&self, scope: Scope, args: &[Value], receiver: Option<Instance>) -> EvalResult {
        self.declare_params(&scope, args)?;
        if let Some(instance) = &receiver {
            if !scope.try_declare(self_name(), Value::Instance(instance.clone())) {
                return Err(duplicate_parameter(self_name()));
            }
        }
        self.execute(&mut Frame::new(scope, args, receiver, None))
    }

    /// Declare every parameter in `scope`. Arguments must already have
    /// passed [`Prototype::check_args`].
    pub(crate) fn declare_params(&self, scope: &Scope, args: &[Value]) -> Result<(), EvalError> {
        for (param, arg) in self.proto.params().iter().zip(args) {
            let mutability = match self.proto.mode() {
                ParamMode::Fixed => Mutability::Fixed,
                ParamMode::Reassignable => Mutability::Reassignable(param.abstraction.clone()),
            };
            scope.declare(param.name, arg.clone(), mutability)?;
        }
        Ok(())
    }

    /// Run the body, then check the return value.
    pub(crate) fn execute(&self, frame: &mut Frame<'_>) -> EvalResult {
        let value = ensure_sufficient_stack(|| (self.body)(frame))?;
        if !self.proto.value().contains(&value) {
            return Err(return_type_mismatch(
                &self.desc,
                &self.proto.value().to_string(),
                value.type_name(),
            ));
        }
        Ok(value)
    }
}

struct Overload {
    desc: String,
    /// Registration order.
    candidates: Vec<Callable>,
}

/// Where a bound callable looks up free variables.
enum Context {
    Strong(Scope),
    /// Method bindings; the instance owns its scope.
    Weak(WeakScope),
}

struct Binding {
    original: Callable,
    context: Context,
    receiver: Option<Weak<InstanceData>>,
}

enum CallableKind {
    Function(Function),
    Overload(Overload),
    Binding(Binding),
}

/// A shared handle to something invocable.
#[derive(Clone)]
pub struct Callable(Rc<CallableKind>);

impl Callable {
    fn new(kind: CallableKind) -> Self {
        Callable(Rc::new(kind))
    }

    pub fn ptr_eq(&self, other: &Callable) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn describe(&self) -> &str {
        match &*self.0 {
            CallableKind::Function(f) => &f.desc,
            CallableKind::Overload(o) => &o.desc,
            CallableKind::Binding(b) => b.original.describe(),
        }
    }

    /// Every prototype this callable accepts, newest overload candidate first.
    pub fn prototypes(&self) -> Vec<Prototype> {
        match &*self.0 {
            CallableKind::Function(f) => vec![f.proto.clone()],
            CallableKind::Overload(o) => o
                .candidates
                .iter()
                .rev()
                .flat_map(Callable::prototypes)
                .collect(),
            CallableKind::Binding(b) => b.original.prototypes(),
        }
    }

    /// The plain function behind this callable, looking through a binding.
    pub fn as_function(&self) -> Option<&Function> {
        match &*self.0 {
            CallableKind::Function(f) => Some(f),
            CallableKind::Overload(_) => None,
            CallableKind::Binding(b) => b.original.as_function(),
        }
    }

    pub fn is_overload(&self) -> bool {
        matches!(&*self.0, CallableKind::Overload(_))
    }

    pub fn is_binding(&self) -> bool {
        matches!(&*self.0, CallableKind::Binding(_))
    }

    /// Invoke with positional arguments.
    pub fn invoke(&self, args: &[Value]) -> EvalResult {
        self.invoke_with(args, None, None)
    }

    fn invoke_with(
        &self,
        args: &[Value],
        context: Option<&Scope>,
        receiver: Option<Instance>,
    ) -> EvalResult {
        match &*self.0 {
            CallableKind::Function(f) => {
                f.run(context.unwrap_or(&f.context), args, receiver)
            }
            CallableKind::Overload(o) => o.invoke(args, context, receiver),
            CallableKind::Binding(b) => {
                let context = match &b.context {
                    Context::Strong(scope) => scope.clone(),
                    Context::Weak(weak) => weak
                        .upgrade()
                        .ok_or_else(|| instance_dropped(self.describe()))?,
                };
                let receiver = match &b.receiver {
                    Some(weak) => Some(
                        weak.upgrade()
                            .map(Instance::from_rc)
                            .ok_or_else(|| instance_dropped(self.describe()))?,
                    ),
                    None => receiver,
                };
                b.original.invoke_with(args, Some(&context), receiver)
            }
        }
    }
}

impl Overload {
    #[tracing::instrument(level = "debug", skip_all, fields(overload = %self.desc))]
    fn invoke(
        &self,
        args: &[Value],
        context: Option<&Scope>,
        receiver: Option<Instance>,
    ) -> EvalResult {
        let mut failures = Vec::new();
        for candidate in self.candidates.iter().rev() {
            // Candidates are flattened on construction: one prototype each.
            let Some(function) = candidate.as_function() else {
                continue;
            };
            match function.proto.check_args(args) {
                Ok(()) => return candidate.invoke_with(args, context, receiver),
                Err(reason) => failures.push(CandidateFailure {
                    candidate: format!("{} {}", function.desc, function.proto),
                    reason,
                }),
            }
        }
        tracing::debug!(candidates = failures.len(), "no overload candidate matched");
        Err(no_matching_overload(&self.desc, failures))
    }
}

impl std::fmt::Debug for Callable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Callable({})", self.describe())
    }
}

// Construction

/// Wrap a host body as a function capturing `context`.
pub fn wrap(
    context: &Scope,
    desc: impl Into<String>,
    proto: Prototype,
    body: impl Fn(&mut Frame<'_>) -> EvalResult + 'static,
) -> Callable {
    Callable::new(CallableKind::Function(Function {
        desc: desc.into(),
        proto,
        context: context.clone(),
        body: Box::new(body),
    }))
}

/// A function that only looks at its positional arguments.
pub fn native(
    desc: impl Into<String>,
    proto: Prototype,
    body: impl Fn(&[Value]) -> EvalResult + 'static,
) -> Callable {
    wrap(&Scope::root(), desc, proto, move |frame| body(frame.args()))
}

/// Push every single-prototype callable inside `callable` onto `out`.
fn flatten_into(callable: &Callable, out: &mut Vec<Callable>) {
    match &*callable.0 {
        CallableKind::Function(_) => out.push(callable.clone()),
        CallableKind::Overload(o) => {
            for candidate in &o.candidates {
                flatten_into(candidate, out);
            }
        }
        CallableKind::Binding(b) if b.original.is_overload() => {
            let mut inner = Vec::new();
            flatten_into(&b.original, &mut inner);
            out.extend(inner.into_iter().map(|candidate| {
                Callable::new(CallableKind::Binding(Binding {
                    original: candidate,
                    context: match &b.context {
                        Context::Strong(scope) => Context::Strong(scope.clone()),
                        Context::Weak(weak) => Context::Weak(weak.clone()),
                    },
                    receiver: b.receiver.clone(),
                }))
            }));
        }
        CallableKind::Binding(_) => out.push(callable.clone()),
    }
}

/// Overload of `candidates` in registration order.
///
/// Overloads among the candidates are spliced in place.
pub fn overload(desc: impl Into<String>, candidates: &[Callable]) -> Callable {
    let mut flat = Vec::new();
    for candidate in candidates {
        flatten_into(candidate, &mut flat);
    }
    Callable::new(CallableKind::Overload(Overload {
        desc: desc.into(),
        candidates: flat,
    }))
}

/// `base` with `added` registered after it, so `added` is tried first.
pub fn overload_added(base: &Callable, added: &Callable) -> Callable {
    overload(base.describe().to_string(), &[base.clone(), added.clone()])
}

/// Concatenate overloads; later parts take precedence.
pub fn overload_concat(parts: &[Callable]) -> Callable {
    let desc = parts
        .first()
        .map_or_else(String::new, |first| first.describe().to_string());
    overload(desc, parts)
}

/// The callable with any binding removed.
pub fn cancel_binding(callable: &Callable) -> Callable {
    match &*callable.0 {
        CallableKind::Binding(b) => b.original.clone(),
        _ => callable.clone(),
    }
}

/// Pin `callable` to `context`, replacing any previous binding.
pub fn bind_context(callable: &Callable, context: &Scope) -> Callable {
    Callable::new(CallableKind::Binding(Binding {
        original: cancel_binding(callable),
        context: Context::Strong(context.clone()),
        receiver: None,
    }))
}

/// Bind a method to the scope and identity of its instance without
/// keeping either alive.
pub(crate) fn bind_method(callable: &Callable, scope: &Scope, receiver: &Instance) -> Callable {
    Callable::new(CallableKind::Binding(Binding {
        original: cancel_binding(callable),
        context: Context::Weak(scope.downgrade()),
        receiver: Some(receiver.downgrade()),
    }))
}

/// Bind an interface default to its synthetic scope, which it owns.
pub(crate) fn bind_default(callable: &Callable, scope: &Scope, receiver: &Instance) -> Callable {
    Callable::new(CallableKind::Binding(Binding {
        original: cancel_binding(callable),
        context: Context::Strong(scope.clone()),
        receiver: Some(receiver.downgrade()),
    }))
}

// Invocation

/// Invoke `callable` with positional arguments.
pub fn call(callable: &Callable, args: &[Value]) -> EvalResult {
    callable.invoke(args)
}

/// Invoke any value that can be called.
///
/// Classes construct an instance; type templates inflate.
pub fn call_value(value: &Value, args: &[Value]) -> EvalResult {
    match value {
        Value::Callable(callable) => callable.invoke(args),
        Value::Type(abstraction) => {
            if let Some(class) = abstraction.as_class() {
                return class.create(args).map(Value::Instance);
            }
            if let Some(template) = abstraction.as_template() {
                return template.inflate(args).map(Value::Type);
            }
            Err(not_callable(value.type_name()))
        }
        _ => Err(not_callable(value.type_name())),
    }
}

/// Name under which method bodies see their receiver.
pub fn self_name() -> Name {
    Name::intern("self")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
mod tests;
