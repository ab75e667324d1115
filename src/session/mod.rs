//! Per-file expansion sessions

pub mod bridge;
pub mod rewrite;
pub mod unit;

pub use bridge::{HostBridge, HostScope, SnippetSite};
pub use rewrite::{expand_source, SourceRewriter};
pub use unit::{CallSite, CompilationUnit, UnitOptions, UnitSummary};
