//! Execution runtime for Kuma.
//!
//! Four engines, bottom to top:
//!
//! - [`abstraction`]: runtime types, their set algebra and truth-table
//!   equivalence, plus categories, schemas, enums and type templates.
//! - [`scope`]: lexical scopes with a depth-keyed lookup cache.
//! - [`function`]: prototypes, invocation, overloads and bindings.
//! - [`composition`]: classes, interfaces, instances and dispatch.
//!
//! The runtime is single-threaded; every shared object is `Rc`-based.
//! Errors are [`EvalError`] values; fatal ones report broken invariants
//! and are classified by [`EvalError::is_fatal`].

pub mod abstraction;
pub mod composition;
pub mod config;
pub mod errors;
pub mod function;
pub mod scope;
mod stack;
mod tracing_setup;
pub mod value;

pub use abstraction::{
    category, complement, create_enum, create_value, intersect, is, one_of, type_equivalent,
    types, union, wrap as wrap_abstraction, Abstraction, Category, Enumeration, Operator, Schema,
    SchemaBuilder, SchemaCheck, Signature, Singleton, StructValue, TypeTemplate,
};
pub use composition::{
    call_method, call_operator, create_class, create_interface, Class, ClassBuilder, Composed,
    Instance, Interface, InterfaceEntry, MethodInfo, MethodSource,
};
pub use config::{configure, ConfigError, RuntimeConfig};
pub use errors::{EvalError, EvalErrorKind, EvalResult};
pub use function::{
    bind_context, call, call_value, cancel_binding, native, overload, overload_added,
    overload_concat, wrap, Callable, Frame, ParamMode, Prototype,
};
pub use kuma_ir::Name;
pub use scope::{Mutability, Scope};
pub use stack::ensure_sufficient_stack;
pub use tracing_setup::init_tracing;
pub use value::Value;
