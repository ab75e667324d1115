//! Type correspondence core
//!
//! The foreign/host type identities and the context registry every later
//! stage queries.

pub mod context;
pub mod types;

pub use context::{builtin, merge, mk_context, singleton, TypeContext, TypeRule, BUILTIN_CONTEXTS};
pub use types::{ForeignType, HostType, TypeCorrespondence};
