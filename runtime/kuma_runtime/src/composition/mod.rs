//! The composition engine: classes, interfaces and instances.
//!
//! Classes compose rather than inherit. A class lists the classes and
//! interfaces it implements; its method table is the merge of its own
//! methods, every composed class's table and every interface default,
//! and any name reaching the table twice is a conflict. An instance
//! becomes an instance of a composed class by *mounting* an instance of
//! it during initialization, which exposes the mounted instance's methods.

mod class;
mod dispatch;
mod instance;
mod interface;

pub use class::{create_class, Class, ClassBuilder, Composed, MethodInfo, MethodSource};
pub use dispatch::{call_method, call_operator};
pub use instance::Instance;
pub(crate) use instance::{InstanceData, Mounter};
pub use interface::{create_interface, Interface, InterfaceEntry};

/// Methods whose name starts with this prefix are operators.
pub const OPERATOR_PREFIX: &str = "operator";

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    reason = "tests use unwrap to panic on unexpected state"
)]
