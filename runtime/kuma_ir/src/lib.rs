//! Kuma IR - identifiers shared across the runtime.
//!
//! Every name the runtime stores (variables, parameters, struct fields,
//! category branches, enum items, methods) is an interned [`Name`]: a 32-bit
//! handle with O(1) equality and hashing. Strings are interned into a single
//! process-wide [`StringInterner`], so a `Name` can always be turned back into
//! its text without threading an interner through every call.

mod interner;
mod name;

pub use interner::{global_interner, InternError, StringInterner};
pub use name::Name;
