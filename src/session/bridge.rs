//! Host code-insertion collaborator
//!
//! The unit never edits host text itself. It hands declarations and call
//! expressions to a [`HostBridge`], and asks it whether placeholder names
//! refer to variables in the host scope around the snippet.

use crate::codegen::host::{HostCall, HostDeclaration};
use crate::errors::SourceLocation;
use std::collections::BTreeSet;
use std::ops::Range;

/// Where a snippet sits in its host file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnippetSite {
    /// Byte range of the whole quote, replaced by the call.
    pub span: Range<usize>,
    /// Location of the snippet body, used for diagnostics.
    pub location: SourceLocation,
}

impl SnippetSite {
    pub fn new(span: Range<usize>, location: SourceLocation) -> Self {
        Self { span, location }
    }
}

pub trait HostBridge {
    /// Install a declaration at module top level.
    fn register_declaration(&mut self, declaration: &HostDeclaration);

    /// Replace the snippet at `site` with `call`.
    fn substitute_expression(&mut self, site: &SnippetSite, call: &HostCall);

    /// Host expression bound to `name` at `site`, if any.
    fn lookup_identifier(&self, name: &str, site: &SnippetSite) -> Option<String>;

    /// Host name the declaration of `symbol` binds.
    fn binding_name(&self, symbol: &str) -> String {
        symbol.to_string()
    }

    /// Candidate names for "did you mean" hints.
    fn visible_identifiers(&self, _site: &SnippetSite) -> Vec<String> {
        Vec::new()
    }
}

/// Which host names placeholders may refer to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HostScope {
    /// Any name the host dialect accepts as a variable; the host compiler
    /// reports names that are not actually bound.
    #[default]
    Open,
    Fixed(BTreeSet<String>),
}

impl HostScope {
    pub fn fixed<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fixed(names.into_iter().map(Into::into).collect())
    }

    pub fn admits(&self, name: &str, is_variable: impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Open => is_variable(name),
            Self::Fixed(names) => names.contains(name),
        }
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Open => Vec::new(),
            Self::Fixed(names) => names.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_scope_defers_to_dialect() {
        let scope = HostScope::Open;
        assert!(scope.admits("x", |n| n.starts_with(char::is_lowercase)));
        assert!(!scope.admits("X", |n| n.starts_with(char::is_lowercase)));
        assert!(scope.names().is_empty());
    }

    #[test]
    fn test_fixed_scope() {
        let scope = HostScope::fixed(["count", "buf"]);
        assert!(scope.admits("count", |_| true));
        assert!(!scope.admits("cnt", |_| true));
        assert_eq!(scope.names(), vec!["buf", "count"]);
    }
}
