//! Frontend components
//!
//! Everything that reads text: host files, snippet bodies and the
//! `splicer.toml` configuration.

pub mod config;
pub mod location;
pub mod scanner;
pub mod snippet;

pub use config::{Config, ConfigError};
pub use location::LineIndex;
pub use scanner::{scan_quotes, CommentSyntax, QuoteSite};
pub use snippet::{parse_snippet, ParsedSnippet, Placeholder};
