//! Interfaces: required method signatures plus optional defaults.

use std::rc::Rc;

use kuma_ir::Name;

use crate::abstraction::Signature;
use crate::errors::{interface_default_invalid, method_conflict, EvalError};
use crate::function::Callable;
use crate::value::Value;

/// One named member of an interface.
pub enum InterfaceEntry {
    /// A method implementors must provide.
    Required(Signature),
    /// A method implementors may omit; its prototype becomes the signature.
    Default(Callable),
}

#[derive(Clone)]
pub struct Interface(Rc<InterfaceData>);

struct InterfaceData {
    desc: String,
    signatures: Vec<(Name, Signature)>,
    defaults: Vec<(Name, Callable)>,
}

/// Create an interface from named entries.
pub fn create_interface(
    desc: &str,
    entries: impl IntoIterator<Item = (Name, InterfaceEntry)>,
) -> Result<Interface, EvalError> {
    let mut signatures: Vec<(Name, Signature)> = Vec::new();
    let mut defaults = Vec::new();
    for (name, entry) in entries {
        if signatures.iter().any(|(existing, _)| *existing == name) {
            return Err(method_conflict(name, desc, desc));
        }
        match entry {
            InterfaceEntry::Required(signature) => signatures.push((name, signature)),
            InterfaceEntry::Default(callable) => {
                let prototypes = callable.prototypes();
                let [proto] = prototypes.as_slice() else {
                    return Err(interface_default_invalid(name));
                };
                signatures.push((name, Signature::of(proto)));
                defaults.push((name, callable));
            }
        }
    }
    Ok(Interface(Rc::new(InterfaceData {
        desc: desc.to_string(),
        signatures,
        defaults,
    })))
}

impl Interface {
    pub fn describe(&self) -> &str {
        &self.0.desc
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Interface) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Every member's signature, in declaration order.
    pub fn signatures(&self) -> impl Iterator<Item = (Name, &Signature)> {
        self.0.signatures.iter().map(|(name, sig)| (*name, sig))
    }

    pub fn signature(&self, name: Name) -> Option<&Signature> {
        self.0
            .signatures
            .iter()
            .find(|(member, _)| *member == name)
            .map(|(_, sig)| sig)
    }

    pub fn defaults(&self) -> impl Iterator<Item = (Name, &Callable)> {
        self.0.defaults.iter().map(|(name, default)| (*name, default))
    }

    pub fn default_method(&self, name: Name) -> Option<&Callable> {
        self.0
            .defaults
            .iter()
            .find(|(member, _)| *member == name)
            .map(|(_, default)| default)
    }

    pub fn has_defaults(&self) -> bool {
        !self.0.defaults.is_empty()
    }

    /// Instances of classes that implement this interface, directly or
    /// through a composed class.
    pub(crate) fn contains(&self, value: &Value) -> bool {
        matches!(value, Value::Instance(instance) if instance.class().implements(self))
    }
}
