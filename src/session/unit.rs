//! Compilation unit state
//!
//! A unit owns everything that is per host file: the active type context, the
//! symbol minter and the emission sink. Snippets are expanded one at a time in
//! source order.

use crate::codegen::dispatch::EntryPoint;
use crate::codegen::foreign::Edition;
use crate::codegen::generator::{Boundary, BoundaryGenerator};
use crate::codegen::host::{HostCall, HostDeclaration};
use crate::codegen::symbol::{SymbolMinter, DEFAULT_PREFIX};
use crate::core::context::{prelude, TypeContext};
use crate::core::types::ForeignType;
use crate::emit::{EmissionSink, EmitHandle, FlushError, FlushedUnit};
use crate::errors::{ErrorKind, ExpandError, SourceLocation};
use crate::frontend::config::Config;
use crate::frontend::snippet::parse_snippet;
use crate::session::bridge::{HostBridge, SnippetSite};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info_span};

#[derive(Debug, Clone)]
pub struct UnitOptions {
    pub symbol_prefix: String,
    pub edition: Edition,
    pub extern_crates: Vec<String>,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self {
            symbol_prefix: DEFAULT_PREFIX.to_string(),
            edition: Edition::default(),
            extern_crates: Vec::new(),
        }
    }
}

impl From<&Config> for UnitOptions {
    fn from(config: &Config) -> Self {
        Self {
            symbol_prefix: config.unit.symbol_prefix.clone(),
            edition: config.unit.edition,
            extern_crates: config.output.extern_crates.clone(),
        }
    }
}

/// One expanded snippet: what was emitted and what the host received.
#[derive(Debug, Clone, Serialize)]
pub struct CallSite {
    pub handle: EmitHandle,
    pub entry: EntryPoint,
    pub symbol: String,
    pub location: SourceLocation,
    pub arg_names: Vec<String>,
    pub foreign_params: Vec<ForeignType>,
    pub foreign_return: ForeignType,
    pub declaration: HostDeclaration,
    pub call: HostCall,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitSummary {
    pub unit: String,
    pub foreign: Option<FlushedUnit>,
    pub call_sites: Vec<CallSite>,
}

pub struct CompilationUnit {
    name: String,
    options: UnitOptions,
    context: Arc<TypeContext>,
    minter: SymbolMinter,
    sink: EmissionSink,
    call_sites: Vec<CallSite>,
    expanded: usize,
}

impl CompilationUnit {
    /// A unit using the built-in `prelude` context.
    pub fn new(name: impl Into<String>, options: UnitOptions) -> Self {
        Self::with_context(name, options, prelude())
    }

    pub fn with_context(name: impl Into<String>, options: UnitOptions, context: Arc<TypeContext>) -> Self {
        let name = name.into();
        Self {
            minter: SymbolMinter::new(&options.symbol_prefix, &name),
            sink: EmissionSink::new(name.clone()).with_extern_crates(options.extern_crates.clone()),
            name,
            options,
            context,
            call_sites: Vec::new(),
            expanded: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the active context. Only legal before the first expansion.
    pub fn set_active_context(&mut self, context: Arc<TypeContext>) -> Result<(), ExpandError> {
        if self.expanded > 0 {
            return Err(ExpandError::new(
                ErrorKind::ConfigurationOrder { expanded: self.expanded },
                SourceLocation::default(),
            )
            .with_file(self.name.clone()));
        }
        self.context = context;
        Ok(())
    }

    pub fn active_context(&self) -> &Arc<TypeContext> {
        &self.context
    }

    /// Expand one snippet: emit its boundary function, install its host
    /// declaration and substitute the call at `site`.
    ///
    /// Types and host identifiers are checked before anything is minted or
    /// emitted, so a failed expansion leaves the unit and the bridge untouched.
    pub fn expand(
        &mut self,
        entry: EntryPoint,
        text: &str,
        site: &SnippetSite,
        bridge: &mut dyn HostBridge,
    ) -> Result<&CallSite, ExpandError> {
        let _span = info_span!(
            "expand_snippet",
            unit = %self.name,
            entry = %entry,
            line = site.location.line
        )
        .entered();

        self.expanded += 1;
        let call_site = self
            .expand_inner(entry, text, site, bridge)
            .map_err(|e| e.with_file(self.name.clone()))?;

        self.call_sites.push(call_site);
        Ok(&self.call_sites[self.call_sites.len() - 1])
    }

    fn expand_inner(
        &mut self,
        entry: EntryPoint,
        text: &str,
        site: &SnippetSite,
        bridge: &mut dyn HostBridge,
    ) -> Result<CallSite, ExpandError> {
        let snippet = parse_snippet(text, site.location)?;
        let generator = BoundaryGenerator::new(&self.context, self.options.edition);
        let signature = generator.resolve_types(&snippet)?;

        let host_args = snippet
            .args
            .iter()
            .map(|arg| {
                let name = arg.name();
                bridge.lookup_identifier(&name, site).ok_or_else(|| {
                    ExpandError::unresolved_identifier(name, arg.location, &bridge.visible_identifiers(site))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let symbol = self.minter.mint();
        let binding = bridge.binding_name(&symbol);
        let Boundary { function, declaration, call } =
            generator.generate(&snippet, entry, &symbol, binding, signature, host_args);

        let handle = self.sink.emit(function);
        bridge.register_declaration(&declaration);
        bridge.substitute_expression(site, &call);
        debug!(symbol = %symbol, handle = handle.index(), "snippet expanded");

        Ok(CallSite {
            handle,
            entry,
            symbol,
            location: site.location,
            arg_names: snippet.arg_names(),
            foreign_params: snippet.arg_keys(),
            foreign_return: snippet.return_key.clone(),
            declaration,
            call,
        })
    }

    /// Append verbatim foreign items. The text must parse as Rust items.
    pub fn emit_items(&mut self, text: &str, site: &SnippetSite) -> Result<EmitHandle, ExpandError> {
        syn::parse_file(text).map_err(|e| {
            let start = e.span().start();
            let (line, col) = site.location.offset(start.line, start.column);
            ExpandError::parse(format!("invalid items: {}", e), SourceLocation::point(line, col))
                .with_file(self.name.clone())
        })?;
        Ok(self.sink.emit_items(text, site.location))
    }

    pub fn call_sites(&self) -> &[CallSite] {
        &self.call_sites
    }

    pub fn is_empty(&self) -> bool {
        self.sink.is_empty()
    }

    /// Flush the sink to `path` and return what was produced.
    pub fn finish(self, path: &Path) -> Result<UnitSummary, FlushError> {
        let foreign = self.sink.flush(path)?;
        Ok(UnitSummary {
            unit: self.name,
            foreign,
            call_sites: self.call_sites,
        })
    }
}
