//! Method and operator dispatch.

use std::iter;

use kuma_ir::Name;

use crate::errors::{method_not_found, no_common_class, EvalResult};
use crate::function::{call, call_value};
use crate::scope::Scope;
use crate::value::Value;

/// Call `name` on `receiver`.
///
/// Instances dispatch through their method table and classes through their
/// static methods. Anything else falls back to a callable `name` visible
/// from `scope`, called with the receiver prepended to the arguments.
pub fn call_method(
    scope: &Scope,
    receiver: &Value,
    name: impl Into<Name>,
    args: &[Value],
) -> EvalResult {
    let name = name.into();
    tracing::trace!(%name, receiver = receiver.type_name(), "method call");
    match receiver {
        Value::Instance(instance) => {
            if let Some(method) = instance.method(name) {
                return call(&method, args);
            }
        }
        Value::Type(abstraction) => {
            if let Some(method) = abstraction.as_class().and_then(|c| c.static_method(name)) {
                return call(method, args);
            }
        }
        _ => {}
    }

    match scope.lookup_opt(name) {
        Some(function @ Value::Callable(_)) => {
            let full: Vec<Value> = iter::once(receiver.clone())
                .chain(args.iter().cloned())
                .collect();
            tracing::trace!(%name, "uniform call syntax fallback");
            call_value(&function, &full)
        }
        _ => Err(method_not_found(name, receiver.type_name())),
    }
}

/// Apply a binary operator defined by a class both operands belong to.
///
/// Candidate classes are the left operand's class, then the classes it
/// composes; the first one the right operand also belongs to and that
/// defines the operator wins.
pub fn call_operator(operator: impl Into<Name>, lhs: &Value, rhs: &Value) -> EvalResult {
    let operator = operator.into();
    let (Value::Instance(left), Value::Instance(right)) = (lhs, rhs) else {
        return Err(no_common_class(operator));
    };
    let lineage = iter::once(left.class()).chain(left.class().super_classes());
    for class in lineage {
        if !right.is_instance_of(class) {
            continue;
        }
        if let Some(info) = class.operator(operator) {
            return call(&info.method, &[lhs.clone(), rhs.clone()]);
        }
    }
    Err(no_common_class(operator))
}
