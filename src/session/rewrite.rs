//! Host source rewriting
//!
//! [`SourceRewriter`] is the [`HostBridge`] used by the precompiler: calls are
//! substituted at the quote's byte range and declarations are appended as one
//! generated block at the end of the file.

use crate::codegen::dispatch::{classify, is_quoter, QuoteKind};
use crate::codegen::host::{HostCall, HostDeclaration, HostSyntax};
use crate::errors::{ErrorCollector, ExpandError};
use crate::frontend::scanner::scan_quotes;
use crate::session::bridge::{HostBridge, HostScope, SnippetSite};
use crate::session::unit::CompilationUnit;
use std::ops::Range;
use tracing::{debug, warn};

pub struct SourceRewriter<'a> {
    source: &'a str,
    syntax: &'a dyn HostSyntax,
    scope: HostScope,
    replacements: Vec<(Range<usize>, String)>,
    declarations: Vec<String>,
}

impl<'a> SourceRewriter<'a> {
    pub fn new(source: &'a str, syntax: &'a dyn HostSyntax, scope: HostScope) -> Self {
        Self {
            source,
            syntax,
            scope,
            replacements: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Drop the quote at `site` from the host text.
    pub fn remove(&mut self, site: &SnippetSite) {
        self.replacements.push((site.span.clone(), String::new()));
    }

    pub fn declarations(&self) -> &[String] {
        &self.declarations
    }

    /// Produce the rewritten host text.
    pub fn finish(mut self, unit: &str) -> String {
        self.replacements.sort_by(|a, b| b.0.start.cmp(&a.0.start));

        let mut out = self.source.to_string();
        for (span, text) in &self.replacements {
            out.replace_range(span.clone(), text);
        }

        if !self.declarations.is_empty() {
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&self.syntax.declarations_block(unit, &self.declarations));
        }
        out
    }
}

impl HostBridge for SourceRewriter<'_> {
    fn register_declaration(&mut self, declaration: &HostDeclaration) {
        self.declarations.push(self.syntax.render_declaration(declaration));
    }

    fn substitute_expression(&mut self, site: &SnippetSite, call: &HostCall) {
        self.replacements.push((site.span.clone(), self.syntax.render_call(call)));
    }

    fn lookup_identifier(&self, name: &str, _site: &SnippetSite) -> Option<String> {
        let syntax = self.syntax;
        self.scope
            .admits(name, |n| syntax.is_variable(n))
            .then(|| name.to_string())
    }

    fn binding_name(&self, symbol: &str) -> String {
        self.syntax.binding_name(symbol)
    }

    fn visible_identifiers(&self, _site: &SnippetSite) -> Vec<String> {
        self.scope.names()
    }
}

/// Expand every quote in `source` and return the rewritten host text.
///
/// All diagnostics of the file are collected; if any occurred the unit is
/// failed as a whole and the caller must not flush it.
pub fn expand_source(
    unit: &mut CompilationUnit,
    source: &str,
    syntax: &dyn HostSyntax,
    scope: HostScope,
) -> Result<String, Vec<ExpandError>> {
    let quotes = scan_quotes(source, syntax.comments(), is_quoter)
        .map_err(|e| vec![e.with_file(unit.name())])?;
    debug!(unit = unit.name(), quotes = quotes.len(), "scanned host source");

    let mut rewriter = SourceRewriter::new(source, syntax, scope);
    let mut errors = ErrorCollector::new();

    for quote in &quotes {
        let site = SnippetSite::new(quote.span.clone(), quote.body_location);
        let result = match classify(quote.quoter) {
            Some(QuoteKind::Expression(entry)) => {
                unit.expand(entry, quote.body, &site, &mut rewriter).map(|_| ())
            }
            Some(QuoteKind::Items) => unit.emit_items(quote.body, &site).map(|_| rewriter.remove(&site)),
            None => continue,
        };

        if let Err(error) = result {
            warn!(unit = unit.name(), error = %error, "snippet failed");
            errors.add(error);
        }
    }

    if errors.has_errors() {
        return Err(errors.into_errors());
    }
    Ok(rewriter.finish(unit.name()))
}
