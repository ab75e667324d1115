//! Foreign and host type identities
//!
//! A [`ForeignType`] is the canonical spelling of a Rust type as it appears in
//! a snippet. Canonicalization goes through `syn`, so `* const  u8` and
//! `*const u8` are the same key. A [`HostType`] is opaque text usable in a
//! generated host declaration.

use proc_macro2::{Delimiter, TokenStream, TokenTree};
use quote::ToTokens;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ForeignType(String);

impl ForeignType {
    /// Parse and canonicalize a Rust type.
    pub fn parse(src: &str) -> syn::Result<Self> {
        let ty: syn::Type = syn::parse_str(src)?;
        Ok(Self::from_syn(&ty))
    }

    pub fn from_syn(ty: &syn::Type) -> Self {
        Self(canonical_spelling(ty.to_token_stream()))
    }

    pub fn unit() -> Self {
        Self("()".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_unit(&self) -> bool {
        self.0 == "()"
    }

    /// Re-parse the canonical spelling. Cannot fail for keys built by this type.
    pub fn to_syn(&self) -> syn::Result<syn::Type> {
        syn::parse_str(&self.0)
    }
}

impl FromStr for ForeignType {
    type Err = syn::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ForeignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct HostType(String);

impl HostType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True when the type can appear as an argument without parentheses.
    pub fn is_atomic(&self) -> bool {
        !self.0.contains(char::is_whitespace)
            || (self.0.starts_with('(') && self.0.ends_with(')') && balanced_outer(&self.0))
            || (self.0.starts_with('[') && self.0.ends_with(']'))
    }

    /// The type in argument position: parenthesized unless atomic.
    pub fn as_argument(&self) -> String {
        if self.is_atomic() {
            self.0.clone()
        } else {
            format!("({})", self.0)
        }
    }

    /// Type constructor application, e.g. `Ptr` applied to `Ptr Int8` gives `Ptr (Ptr Int8)`.
    pub fn apply(ctor: &str, args: &[HostType]) -> Self {
        let mut text = ctor.to_string();
        for arg in args {
            text.push(' ');
            text.push_str(&arg.as_argument());
        }
        Self(text)
    }

    /// Curried function type `a -> b -> r`.
    pub fn arrow(params: &[HostType], ret: &HostType) -> Self {
        let mut parts: Vec<String> = params
            .iter()
            .map(|p| if p.0.contains("->") { format!("({})", p.0) } else { p.0.clone() })
            .collect();
        parts.push(ret.0.clone());
        Self(parts.join(" -> "))
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for HostType {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// One registered correspondence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeCorrespondence {
    pub foreign: ForeignType,
    pub host: HostType,
}

impl TypeCorrespondence {
    pub fn new(foreign: ForeignType, host: HostType) -> Self {
        Self { foreign, host }
    }
}

fn balanced_outer(s: &str) -> bool {
    // `(a) (b)` starts and ends with parens but is not one group.
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth = depth.saturating_sub(1);
                if depth == 0 && i != s.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    true
}

/// Render tokens with the spacing a person would write.
fn canonical_spelling(tokens: TokenStream) -> String {
    let mut out = String::new();
    write_compact(&mut out, tokens);
    out.replace("->", " -> ")
}

fn write_compact(out: &mut String, tokens: TokenStream) {
    let mut prev_word = false;

    for tt in tokens {
        match tt {
            TokenTree::Ident(ident) => {
                if prev_word {
                    out.push(' ');
                }
                out.push_str(&ident.to_string());
                prev_word = true;
            }
            TokenTree::Literal(lit) => {
                if prev_word {
                    out.push(' ');
                }
                out.push_str(&lit.to_string());
                prev_word = true;
            }
            TokenTree::Punct(punct) => {
                match punct.as_char() {
                    ',' => out.push_str(", "),
                    ';' => out.push_str("; "),
                    '\'' if prev_word => out.push_str(" '"),
                    ch => out.push(ch),
                }
                prev_word = false;
            }
            TokenTree::Group(group) => {
                let (open, close) = match group.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::Brace => ("{", "}"),
                    Delimiter::None => ("", ""),
                };
                if prev_word && group.delimiter() == Delimiter::Brace {
                    out.push(' ');
                }
                out.push_str(open);
                write_compact(out, group.stream());
                if out.ends_with(' ') {
                    out.pop();
                }
                out.push_str(close);
                prev_word = group.delimiter() == Delimiter::None;
            }
        }
    }
}
