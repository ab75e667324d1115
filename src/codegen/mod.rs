//! Boundary code generation
//!
//! Turns a parsed snippet into an exported foreign function plus the host
//! declaration and call that reach it.

pub mod dispatch;
pub mod foreign;
pub mod generator;
pub mod host;
pub mod symbol;

pub use dispatch::{classify, is_quoter, EntryPoint, PurityMode, QuoteKind, SafetyMode, ITEMS_QUOTER};
pub use foreign::{render_boundary, Edition, GeneratedFunction};
pub use generator::{Boundary, BoundaryGenerator, ResolvedSignature};
pub use host::{Haskell, HostCall, HostDeclaration, HostSyntax};
pub use symbol::{unit_tag, SymbolMinter, DEFAULT_PREFIX};
