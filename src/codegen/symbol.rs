//! Unique exported symbol names
//!
//! Symbols are `<prefix>_<unit tag>_<n>`. The unit tag is the first eight hex
//! digits of the BLAKE3 hash of the unit name, so units linked into one binary
//! do not collide; `n` counts up within the unit, so identical snippets still
//! get distinct names.

use tracing::trace;

pub const DEFAULT_PREFIX: &str = "inline_rust";

#[derive(Debug, Clone)]
pub struct SymbolMinter {
    prefix: String,
    tag: String,
    next: u64,
}

impl SymbolMinter {
    pub fn new(prefix: &str, unit: &str) -> Self {
        Self {
            prefix: sanitize_identifier(prefix),
            tag: unit_tag(unit),
            next: 0,
        }
    }

    pub fn mint(&mut self) -> String {
        let symbol = format!("{}_{}_{}", self.prefix, self.tag, self.next);
        self.next += 1;
        trace!(symbol = %symbol, "minted symbol");
        symbol
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn minted(&self) -> u64 {
        self.next
    }
}

pub fn unit_tag(unit: &str) -> String {
    let hash = blake3::hash(unit.as_bytes());
    hash.to_hex().as_str()[..8].to_string()
}

/// Force `raw` into a valid identifier prefix.
pub fn sanitize_identifier(raw: &str) -> String {
    let mut out: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();

    if out.is_empty() {
        return DEFAULT_PREFIX.to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}
