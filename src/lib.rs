//! splicer: inline Rust snippets for a host language
//!
//! Host source embeds quasi-quotes such as `[rustIO| i32 { $(x: i32) + 1 } |]`.
//! Each quote becomes an exported `extern "C"` Rust function in a per-unit
//! foreign file, a matching host `foreign import` declaration, and a call
//! expression substituted where the quote was.

pub mod cli;
pub mod codegen;
pub mod core;
pub mod emit;
pub mod errors;
pub mod frontend;
pub mod infrastructure;
pub mod session;
pub mod toolchain;

pub use crate::core::{builtin, merge, mk_context, singleton, ForeignType, HostType, TypeContext};
pub use codegen::{EntryPoint, Haskell, HostCall, HostDeclaration, HostSyntax, PurityMode, SafetyMode};
pub use emit::{EmissionSink, EmitHandle, FlushError};
pub use errors::{ErrorCollector, ErrorKind, ExpandError, SourceLocation, TypePosition};
pub use frontend::{parse_snippet, Config, ParsedSnippet};
pub use infrastructure::{init_logging, LogConfig, LogFormat, LogOutput};
pub use session::{expand_source, CompilationUnit, HostBridge, HostScope, SnippetSite, UnitOptions};
pub use toolchain::{LinkSpec, RustcInvocation};
