//! Instances: construction, mounting and sealed method tables.
//!
//! An instance owns its scope. Methods are bound to that scope and to the
//! instance through weak handles, so the instance, its scope and its
//! method table never form a reference cycle.

use std::cell::OnceCell;
use std::rc::{Rc, Weak};

use kuma_ir::Name;
use rustc_hash::FxHashMap;

use super::{Class, Composed, Interface};
use crate::errors::{
    argument_failure, invalid_initializer, mounting_mounted, mounting_undeclared, not_mounting,
    EvalError,
};
use crate::function::{bind_default, bind_method, CallGuard, Callable, Frame, Function};
use crate::scope::Scope;
use crate::value::Value;

#[derive(Clone)]
pub struct Instance(Rc<InstanceData>);

pub(crate) struct InstanceData {
    class: Class,
    scope: Scope,
    /// Set once initialization succeeded.
    methods: OnceCell<FxHashMap<Name, Callable>>,
    mounted: OnceCell<Vec<Instance>>,
}

impl Instance {
    pub(crate) fn from_rc(data: Rc<InstanceData>) -> Self {
        Instance(data)
    }

    pub(crate) fn downgrade(&self) -> Weak<InstanceData> {
        Rc::downgrade(&self.0)
    }

    pub fn class(&self) -> &Class {
        &self.0.class
    }

    /// Scope holding the initializer's parameters, fields and methods.
    pub fn scope(&self) -> &Scope {
        &self.0.scope
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// A method from the sealed table: own, mounted or interface default.
    pub fn method(&self, name: impl Into<Name>) -> Option<Callable> {
        self.0.methods.get()?.get(&name.into()).cloned()
    }

    /// Names callable on this instance, sorted.
    pub fn exposed(&self) -> Vec<Name> {
        self.0
            .methods
            .get()
            .map(|methods| {
                let mut names: Vec<Name> = methods.keys().copied().collect();
                names.sort_by_key(|name| name.as_str());
                names
            })
            .unwrap_or_default()
    }

    /// Instances of composed classes mounted during initialization.
    pub fn mounted(&self) -> &[Instance] {
        self.0.mounted.get().map_or(&[], Vec::as_slice)
    }

    pub fn is_instance_of(&self, class: &Class) -> bool {
        self.0.class.is_subclass_of(class)
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.0.class.describe())
            .field("sealed", &self.0.methods.get().is_some())
            .finish_non_exhaustive()
    }
}

/// Collects mounts while an initializer runs.
pub(crate) struct Mounter {
    class: Class,
    table: FxHashMap<Name, Callable>,
    mounted: Vec<Instance>,
}

impl Mounter {
    pub(crate) fn mount(&mut self, internal: &Instance) -> Result<(), EvalError> {
        let base = internal.class();
        let declared = self
            .class
            .impls()
            .iter()
            .any(|composed| matches!(composed, Composed::Class(c) if c.ptr_eq(base)));
        if !declared {
            return Err(mounting_undeclared(base.describe()));
        }
        if self.mounted.iter().any(|m| m.class().ptr_eq(base)) {
            return Err(mounting_mounted(base.describe()));
        }
        if let Some(methods) = internal.0.methods.get() {
            for (name, method) in methods {
                self.table.entry(*name).or_insert_with(|| method.clone());
            }
        }
        tracing::trace!(class = self.class.describe(), base = base.describe(), "mounted");
        self.mounted.push(internal.clone());
        Ok(())
    }
}

impl Class {
    /// Construct an instance: check arguments, bind own methods, run the
    /// initializer, verify mounts, apply interface defaults.
    #[tracing::instrument(level = "debug", skip_all, fields(class = %self.describe()))]
    pub fn create(&self, args: &[Value]) -> Result<Instance, EvalError> {
        let init = self
            .0
            .init
            .as_function()
            .ok_or_else(|| invalid_initializer(self.describe()))?;
        init.prototype()
            .check_args(args)
            .map_err(|failure| argument_failure(self.describe(), failure))?;

        let guard = CallGuard::enter(self.describe())?;
        self.construct(init, args)
            .map_err(|err| guard.annotate(err))
    }

    fn construct(&self, init: &Function, args: &[Value]) -> Result<Instance, EvalError> {
        let scope = init.context().child();
        init.declare_params(&scope, args)?;

        let instance = Instance(Rc::new(InstanceData {
            class: self.clone(),
            scope: scope.clone(),
            methods: OnceCell::new(),
            mounted: OnceCell::new(),
        }));

        let mut table = FxHashMap::default();
        for (name, method) in &self.0.methods {
            let bound = bind_method(method, &scope, &instance);
            scope.declare_fixed(*name, Value::Callable(bound.clone()))?;
            table.insert(*name, bound);
        }

        let mut mounter = Mounter {
            class: self.clone(),
            table,
            mounted: Vec::new(),
        };
        init.execute(&mut Frame::new(
            scope,
            args,
            Some(instance.clone()),
            Some(&mut mounter),
        ))?;

        let Mounter {
            mut table, mounted, ..
        } = mounter;
        for composed in self.impls() {
            match composed {
                Composed::Class(base) => {
                    if !mounted.iter().any(|m| m.class().ptr_eq(base)) {
                        return Err(not_mounting(base.describe()));
                    }
                }
                Composed::Interface(interface) => {
                    apply_defaults(interface, &mut table, &instance)?;
                }
            }
        }

        // Sealed exactly once, here; the instance escapes only after this.
        let methods_sealed = instance.0.methods.set(table).is_ok();
        let mounts_sealed = instance.0.mounted.set(mounted).is_ok();
        debug_assert!(methods_sealed && mounts_sealed, "instance sealed twice");
        Ok(instance)
    }
}

/// Add `interface`'s defaults for every member the instance lacks.
///
/// Defaults run in a synthetic root scope exposing every interface member:
/// the instance's own implementations and the defaults bound here. The
/// table holds the defaults strongly; the synthetic scope holds weak
/// bindings so it never owns itself.
fn apply_defaults(
    interface: &Interface,
    table: &mut FxHashMap<Name, Callable>,
    instance: &Instance,
) -> Result<(), EvalError> {
    if !interface.has_defaults() {
        return Ok(());
    }

    let synthetic = Scope::root();
    let mut missing = Vec::new();
    for (name, _) in interface.signatures() {
        match table.get(&name) {
            Some(method) => synthetic.declare_fixed(name, Value::Callable(method.clone()))?,
            None => missing.push(name),
        }
    }
    for name in missing {
        if let Some(default) = interface.default_method(name) {
            let visible = bind_method(default, &synthetic, instance);
            synthetic.declare_fixed(name, Value::Callable(visible))?;
            table.insert(name, bind_default(default, &synthetic, instance));
        }
    }
    Ok(())
}
