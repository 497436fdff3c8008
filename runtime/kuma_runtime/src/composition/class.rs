//! Classes and their merged method tables.

use std::rc::Rc;

use kuma_ir::Name;
use rustc_hash::FxHashMap;

use super::{Interface, OPERATOR_PREFIX};
use crate::abstraction::Abstraction;
use crate::errors::{
    invalid_initializer, method_conflict, method_invalid, method_missing, operator_conflict,
    EvalError,
};
use crate::function::{cancel_binding, Callable, Prototype};
use crate::value::Value;

/// Something a class implements.
#[derive(Clone)]
pub enum Composed {
    Class(Class),
    Interface(Interface),
}

/// Where a method table entry came from.
#[derive(Clone)]
pub enum MethodSource {
    /// Declared by the class itself.
    Own,
    /// Merged from a composed class.
    Class(Class),
    /// Default of an implemented interface.
    Interface(Interface),
}

#[derive(Clone)]
pub struct MethodInfo {
    pub method: Callable,
    pub from: MethodSource,
}

#[derive(Clone)]
pub struct Class(pub(super) Rc<ClassData>);

pub(super) struct ClassData {
    pub(super) desc: String,
    pub(super) impls: Vec<Composed>,
    pub(super) init: Callable,
    /// Own methods, operators excluded, in declaration order.
    pub(super) methods: Vec<(Name, Callable)>,
    static_methods: FxHashMap<Name, Callable>,
    methods_info: FxHashMap<Name, MethodInfo>,
    operators_info: FxHashMap<Name, MethodInfo>,
    super_classes: Vec<Class>,
    super_interfaces: Vec<Interface>,
}

/// Builder for [`create_class`].
pub struct ClassBuilder {
    desc: String,
    init: Callable,
    impls: Vec<Composed>,
    methods: Vec<(Name, Callable)>,
    static_methods: Vec<(Name, Callable)>,
}

impl ClassBuilder {
    pub fn new(desc: &str, init: &Callable) -> Self {
        Self {
            desc: desc.to_string(),
            init: init.clone(),
            impls: Vec::new(),
            methods: Vec::new(),
            static_methods: Vec::new(),
        }
    }

    #[must_use]
    pub fn implements(mut self, composed: Composed) -> Self {
        self.impls.push(composed);
        self
    }

    #[must_use]
    pub fn method(mut self, name: &str, method: &Callable) -> Self {
        self.methods.push((Name::intern(name), method.clone()));
        self
    }

    #[must_use]
    pub fn static_method(mut self, name: &str, method: &Callable) -> Self {
        self.static_methods.push((Name::intern(name), method.clone()));
        self
    }

    pub fn build(self) -> Result<Class, EvalError> {
        create_class(
            &self.desc,
            &self.impls,
            &self.init,
            &self.methods,
            &self.static_methods,
        )
    }
}

fn is_operator(name: Name) -> bool {
    name.as_str().starts_with(OPERATOR_PREFIX)
}

/// Entries in name order, so conflicts are reported deterministically.
fn sorted(table: &FxHashMap<Name, MethodInfo>) -> Vec<(Name, &MethodInfo)> {
    let mut entries: Vec<_> = table.iter().map(|(name, info)| (*name, info)).collect();
    entries.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
    entries
}

/// Create a class.
///
/// Merges the method table and verifies every implemented interface before
/// returning; any conflict or missing method fails the whole creation.
#[tracing::instrument(level = "debug", skip_all, fields(class = desc))]
pub fn create_class(
    desc: &str,
    impls: &[Composed],
    init: &Callable,
    methods: &[(Name, Callable)],
    static_methods: &[(Name, Callable)],
) -> Result<Class, EvalError> {
    let init = cancel_binding(init);
    if init.as_function().is_none() {
        return Err(invalid_initializer(desc));
    }

    let (operators, methods): (Vec<_>, Vec<_>) =
        methods.iter().cloned().partition(|(name, _)| is_operator(*name));

    let describe = |source: &MethodSource| match source {
        MethodSource::Own => desc.to_string(),
        MethodSource::Class(class) => class.describe().to_string(),
        MethodSource::Interface(interface) => interface.describe().to_string(),
    };

    let mut methods_info: FxHashMap<Name, MethodInfo> = FxHashMap::default();
    for (name, method) in &methods {
        if methods_info.contains_key(name) {
            return Err(method_conflict(*name, desc, desc));
        }
        let info = MethodInfo {
            method: method.clone(),
            from: MethodSource::Own,
        };
        methods_info.insert(*name, info);
    }

    let mut operators_info: FxHashMap<Name, MethodInfo> = FxHashMap::default();
    for (name, method) in &operators {
        if operators_info.contains_key(name) {
            return Err(operator_conflict(*name, desc, desc));
        }
        let info = MethodInfo {
            method: method.clone(),
            from: MethodSource::Own,
        };
        operators_info.insert(*name, info);
    }

    for composed in impls {
        let Composed::Class(base) = composed else {
            continue;
        };
        for (name, info) in sorted(&base.0.methods_info) {
            if let Some(existing) = methods_info.get(&name) {
                return Err(method_conflict(name, &describe(&existing.from), base.describe()));
            }
            let merged = MethodInfo {
                method: info.method.clone(),
                from: MethodSource::Class(base.clone()),
            };
            methods_info.insert(name, merged);
        }
        for (name, info) in sorted(&base.0.operators_info) {
            if let Some(existing) = operators_info.get(&name) {
                return Err(operator_conflict(name, &describe(&existing.from), base.describe()));
            }
            let merged = MethodInfo {
                method: info.method.clone(),
                from: MethodSource::Class(base.clone()),
            };
            operators_info.insert(name, merged);
        }
    }

    for composed in impls {
        let Composed::Interface(interface) = composed else {
            continue;
        };
        for (name, default) in interface.defaults() {
            match methods_info.get(&name) {
                None => {
                    let info = MethodInfo {
                        method: default.clone(),
                        from: MethodSource::Interface(interface.clone()),
                    };
                    methods_info.insert(name, info);
                }
                Some(existing) if matches!(existing.from, MethodSource::Interface(_)) => {
                    return Err(method_conflict(
                        name,
                        &describe(&existing.from),
                        interface.describe(),
                    ));
                }
                Some(_) => {}
            }
        }
        for (name, signature) in interface.signatures() {
            let Some(info) = methods_info.get(&name) else {
                return Err(method_missing(name, desc, interface.describe()));
            };
            if !signature.contains(&Value::Callable(info.method.clone())) {
                return Err(method_invalid(name, desc, interface.describe()));
            }
        }
    }

    let mut super_classes: Vec<Class> = Vec::new();
    let mut super_interfaces: Vec<Interface> = Vec::new();
    let add_class = |class: &Class, out: &mut Vec<Class>| {
        if !out.iter().any(|c| c.ptr_eq(class)) {
            out.push(class.clone());
        }
    };
    let add_interface = |interface: &Interface, out: &mut Vec<Interface>| {
        if !out.iter().any(|i| i.ptr_eq(interface)) {
            out.push(interface.clone());
        }
    };
    for composed in impls {
        match composed {
            Composed::Class(base) => {
                add_class(base, &mut super_classes);
                for ancestor in &base.0.super_classes {
                    add_class(ancestor, &mut super_classes);
                }
                for interface in &base.0.super_interfaces {
                    add_interface(interface, &mut super_interfaces);
                }
            }
            Composed::Interface(interface) => add_interface(interface, &mut super_interfaces),
        }
    }

    tracing::debug!(
        methods = methods_info.len(),
        operators = operators_info.len(),
        super_classes = super_classes.len(),
        "class created"
    );
    Ok(Class(Rc::new(ClassData {
        desc: desc.to_string(),
        impls: impls.to_vec(),
        init,
        methods,
        static_methods: static_methods.iter().cloned().collect(),
        methods_info,
        operators_info,
        super_classes,
        super_interfaces,
    })))
}

impl Class {
    pub fn describe(&self) -> &str {
        &self.0.desc
    }

    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn ptr_eq(&self, other: &Class) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn as_abstraction(&self) -> Abstraction {
        Abstraction::from(self.clone())
    }

    pub fn impls(&self) -> &[Composed] {
        &self.0.impls
    }

    /// Merged method table, operators excluded.
    pub fn methods_info(&self) -> &FxHashMap<Name, MethodInfo> {
        &self.0.methods_info
    }

    pub fn method_info(&self, name: impl Into<Name>) -> Option<&MethodInfo> {
        self.0.methods_info.get(&name.into())
    }

    /// Operator implementation, own or merged from a composed class.
    pub fn operator(&self, name: impl Into<Name>) -> Option<&MethodInfo> {
        self.0.operators_info.get(&name.into())
    }

    pub fn static_method(&self, name: impl Into<Name>) -> Option<&Callable> {
        self.0.static_methods.get(&name.into())
    }

    /// Every class composed directly or transitively, excluding this one.
    pub fn super_classes(&self) -> &[Class] {
        &self.0.super_classes
    }

    /// Every interface implemented directly or through a composed class.
    pub fn super_interfaces(&self) -> &[Interface] {
        &self.0.super_interfaces
    }

    /// Whether this class is `other` or composes it.
    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ptr_eq(other) || self.0.super_classes.iter().any(|c| c.ptr_eq(other))
    }

    pub fn implements(&self, interface: &Interface) -> bool {
        self.0.super_interfaces.iter().any(|i| i.ptr_eq(interface))
    }

    /// Prototype of calling the class: the initializer's parameters,
    /// returning an instance of this class.
    pub fn constructor_prototype(&self) -> Prototype {
        let value = self.as_abstraction();
        match self.0.init.as_function() {
            Some(init) => init.prototype().with_value(value),
            None => Prototype::returning(value),
        }
    }

    pub(crate) fn contains(&self, value: &Value) -> bool {
        matches!(value, Value::Instance(instance) if instance.class().is_subclass_of(self))
    }
}
