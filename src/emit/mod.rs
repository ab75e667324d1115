//! Per-unit emission sink
//!
//! Entries are appended in emission order and never deduplicated. Nothing
//! touches the filesystem until [`EmissionSink::flush`], which consumes the
//! sink so a unit can be flushed at most once. An empty sink writes no file.

use crate::codegen::foreign::GeneratedFunction;
use crate::errors::SourceLocation;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info_span};

/// Stable reference to one emitted entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct EmitHandle(usize);

impl EmitHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum Entry {
    Function(GeneratedFunction),
    Items { text: String, location: SourceLocation },
}

#[derive(Debug, Error)]
pub enum FlushError {
    #[error("failed to create directory {}: {source}", .path.display())]
    CreateDir { path: PathBuf, source: std::io::Error },

    #[error("failed to write {}: {source}", .path.display())]
    Write { path: PathBuf, source: std::io::Error },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlushedUnit {
    pub path: PathBuf,
    pub functions: usize,
    pub items: usize,
    pub bytes: usize,
}

#[derive(Debug, Clone)]
pub struct EmissionSink {
    unit: String,
    extern_crates: Vec<String>,
    entries: Vec<Entry>,
}

impl EmissionSink {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            extern_crates: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn with_extern_crates(mut self, crates: Vec<String>) -> Self {
        self.extern_crates = crates;
        self
    }

    pub fn emit(&mut self, function: GeneratedFunction) -> EmitHandle {
        self.push(Entry::Function(function))
    }

    /// Append verbatim foreign items (helper types, `use` lines).
    pub fn emit_items(&mut self, text: impl Into<String>, location: SourceLocation) -> EmitHandle {
        self.push(Entry::Items { text: text.into(), location })
    }

    fn push(&mut self, entry: Entry) -> EmitHandle {
        let handle = EmitHandle(self.entries.len());
        self.entries.push(entry);
        handle
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn function_count(&self) -> usize {
        self.entries.iter().filter(|e| matches!(e, Entry::Function(_))).count()
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "// @generated by splicer from {}. Do not edit.", self.unit);
        out.push_str("#![allow(unused, non_snake_case, clippy::all)]\n");
        for name in &self.extern_crates {
            let _ = writeln!(out, "extern crate {};", name);
        }

        for entry in &self.entries {
            out.push('\n');
            match entry {
                Entry::Function(function) => {
                    let _ = writeln!(
                        out,
                        "// {}:{} ({})",
                        self.unit, function.location, function.entry
                    );
                    out.push_str(&function.source);
                }
                Entry::Items { text, location } => {
                    let _ = writeln!(out, "// {}:{} (items)", self.unit, location);
                    out.push_str(text.trim());
                }
            }
            out.push('\n');
        }
        out
    }

    /// Write the unit to `path`. Returns `None` and writes nothing when empty.
    pub fn flush(self, path: &Path) -> Result<Option<FlushedUnit>, FlushError> {
        let _span = info_span!("flush", unit = %self.unit).entered();

        if self.is_empty() {
            debug!("empty sink, no foreign file written");
            return Ok(None);
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| FlushError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let text = self.render();
        fs::write(path, &text).map_err(|source| FlushError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        let flushed = FlushedUnit {
            path: path.to_path_buf(),
            functions: self.function_count(),
            items: self.len() - self.function_count(),
            bytes: text.len(),
        };
        debug!(path = %path.display(), functions = flushed.functions, "flushed foreign unit");
        Ok(Some(flushed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::dispatch::{EntryPoint, PurityMode, SafetyMode};
    use crate::codegen::foreign::{render_boundary, Edition};
    use crate::frontend::snippet::parse_snippet;
    use tempfile::TempDir;

    fn function(symbol: &str) -> GeneratedFunction {
        let snippet = parse_snippet("i32 { $(x: i32) }", SourceLocation::point(2, 6)).unwrap();
        render_boundary(
            symbol,
            &snippet,
            EntryPoint::new(SafetyMode::Safe, PurityMode::Pure),
            Edition::E2021,
        )
    }

    #[test]
    fn test_empty_sink_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out").join("Main.rs");
        let sink = EmissionSink::new("Main.hs");
        assert_eq!(sink.flush(&path).unwrap(), None);
        assert!(!path.exists());
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn test_entries_keep_emission_order() {
        let mut sink = EmissionSink::new("Main.hs");
        let a = sink.emit(function("first_0"));
        let items = sink.emit_items("struct Pair(i32, i32);", SourceLocation::point(1, 0));
        let b = sink.emit(function("second_1"));
        assert_eq!((a.index(), items.index(), b.index()), (0, 1, 2));

        let text = sink.render();
        let first = text.find("first_0").unwrap();
        let pair = text.find("struct Pair").unwrap();
        let second = text.find("second_1").unwrap();
        assert!(first < pair && pair < second);
        assert!(text.contains("// Main.hs:2:6 (rust)"));
    }

    #[test]
    fn test_identical_functions_are_not_deduplicated() {
        let mut sink = EmissionSink::new("Main.hs");
        sink.emit(function("same"));
        sink.emit(function("same"));
        assert_eq!(sink.function_count(), 2);
    }

    #[test]
    fn test_flush_writes_header_and_functions() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gen").join("Main.rs");
        let mut sink = EmissionSink::new("Main.hs").with_extern_crates(vec!["libc".to_string()]);
        sink.emit(function("inline_rust_0"));

        let flushed = sink.flush(&path).unwrap().unwrap();
        assert_eq!(flushed.functions, 1);
        assert_eq!(flushed.items, 0);

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("// @generated by splicer from Main.hs"));
        assert!(text.contains("#![allow(unused, non_snake_case, clippy::all)]"));
        assert!(text.contains("extern crate libc;"));
        assert!(text.contains("fn inline_rust_0"));
        assert_eq!(flushed.bytes, text.len());
    }
}
