//! Snippet parsing
//!
//! A snippet is `ReturnType { body }` where the body may contain
//! `$(name: Type)` placeholders anywhere an expression is legal. The Rust
//! tokenizer and type grammar come from `proc-macro2` and `syn`; this module
//! only splits the snippet into its parts and extracts the placeholders.
//!
//! Each placeholder is replaced in the body by its bare identifier, so the
//! boundary function can declare it as a formal parameter of the same name.

use crate::core::types::ForeignType;
use crate::errors::{ErrorKind, ExpandError, SourceLocation};
use proc_macro2::{Delimiter, Group, Ident, LineColumn, Span, TokenStream, TokenTree};
use smallvec::SmallVec;
use syn::parse::{Parse, ParseStream};

/// A `$(name: Type)` occurrence, deduplicated by name.
#[derive(Debug, Clone)]
pub struct Placeholder {
    pub name: Ident,
    pub ty: syn::Type,
    pub key: ForeignType,
    pub location: SourceLocation,
}

impl Placeholder {
    pub fn name(&self) -> String {
        self.name.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ParsedSnippet {
    pub return_type: syn::Type,
    pub return_key: ForeignType,
    /// Body tokens including the outer braces, placeholders already replaced.
    pub body: Group,
    /// Placeholders in first-occurrence order.
    pub args: SmallVec<[Placeholder; 4]>,
    pub location: SourceLocation,
}

impl ParsedSnippet {
    pub fn arg_names(&self) -> Vec<String> {
        self.args.iter().map(Placeholder::name).collect()
    }

    pub fn arg_keys(&self) -> Vec<ForeignType> {
        self.args.iter().map(|a| a.key.clone()).collect()
    }
}

struct PlaceholderSyntax {
    name: Ident,
    ty: syn::Type,
}

impl Parse for PlaceholderSyntax {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let name: Ident = input.parse()?;
        input.parse::<syn::Token![:]>()?;
        let ty: syn::Type = input.parse()?;
        Ok(Self { name, ty })
    }
}

/// Parse raw snippet text found at `origin` in the host file.
pub fn parse_snippet(text: &str, origin: SourceLocation) -> Result<ParsedSnippet, ExpandError> {
    let mut parser = SnippetParser { origin, args: SmallVec::new() };
    parser.parse(text)
}

struct SnippetParser {
    origin: SourceLocation,
    args: SmallVec<[Placeholder; 4]>,
}

impl SnippetParser {
    fn parse(&mut self, text: &str) -> Result<ParsedSnippet, ExpandError> {
        let tokens: TokenStream = text.parse().map_err(|e: proc_macro2::LexError| {
            ExpandError::parse(e.to_string(), self.span_location(e.span()))
        })?;

        let mut head = Vec::new();
        let mut body = None;
        let mut iter = tokens.into_iter();

        for tt in iter.by_ref() {
            match tt {
                TokenTree::Group(group) if group.delimiter() == Delimiter::Brace => {
                    body = Some(group);
                    break;
                }
                other => head.push(other),
            }
        }

        let body = match body {
            Some(body) => body,
            None => {
                let at = head.last().map(|tt| self.span_location(tt.span())).unwrap_or(self.origin);
                return Err(ExpandError::new(ErrorKind::MissingBody, at));
            }
        };

        if head.is_empty() {
            return Err(ExpandError::new(
                ErrorKind::MissingReturnType,
                self.span_location(body.span_open()),
            ));
        }

        if let Some(extra) = iter.next() {
            return Err(ExpandError::parse(
                format!("unexpected `{}` after the snippet body", extra),
                self.span_location(extra.span()),
            ));
        }

        let head_span = head[0].span();
        let return_type: syn::Type = syn::parse2(head.into_iter().collect()).map_err(|e| {
            ExpandError::parse(format!("invalid return type: {}", e), self.span_location(head_span))
        })?;

        let rewritten = self.rewrite(body.stream())?;
        let mut new_body = Group::new(Delimiter::Brace, rewritten);
        new_body.set_span(body.span());

        Ok(ParsedSnippet {
            return_key: ForeignType::from_syn(&return_type),
            return_type,
            body: new_body,
            args: std::mem::take(&mut self.args),
            location: self.origin,
        })
    }

    fn rewrite(&mut self, stream: TokenStream) -> Result<TokenStream, ExpandError> {
        let mut out = Vec::new();
        let mut iter = stream.into_iter().peekable();

        while let Some(tt) = iter.next() {
            match tt {
                TokenTree::Punct(punct) if punct.as_char() == '$' => {
                    let group = match iter.peek() {
                        Some(TokenTree::Group(g)) if g.delimiter() == Delimiter::Parenthesis => g.clone(),
                        _ => {
                            out.push(TokenTree::Punct(punct));
                            continue;
                        }
                    };
                    iter.next();
                    let ident = self.placeholder(punct.span(), &group)?;
                    out.push(TokenTree::Ident(ident));
                }
                TokenTree::Group(group) => {
                    let mut nested = Group::new(group.delimiter(), self.rewrite(group.stream())?);
                    nested.set_span(group.span());
                    out.push(TokenTree::Group(nested));
                }
                other => out.push(other),
            }
        }

        Ok(out.into_iter().collect())
    }

    fn placeholder(&mut self, dollar: Span, group: &Group) -> Result<Ident, ExpandError> {
        let location = self.span_location(dollar);
        let syntax: PlaceholderSyntax = syn::parse2(group.stream()).map_err(|e| {
            ExpandError::new(
                ErrorKind::MalformedPlaceholder {
                    text: group.stream().to_string(),
                    reason: e.to_string(),
                },
                location,
            )
        })?;

        let key = ForeignType::from_syn(&syntax.ty);
        if let Some(existing) = self.args.iter().find(|a| a.name == syntax.name) {
            if existing.key != key {
                return Err(ExpandError::new(
                    ErrorKind::ConflictingPlaceholder {
                        name: syntax.name.to_string(),
                        first: existing.key.to_string(),
                        second: key.to_string(),
                    },
                    location,
                ));
            }
            return Ok(syntax.name);
        }

        self.args.push(Placeholder {
            name: syntax.name.clone(),
            ty: syntax.ty,
            key,
            location,
        });
        Ok(syntax.name)
    }

    fn span_location(&self, span: Span) -> SourceLocation {
        let LineColumn { line, column } = span.start();
        let end = span.end();
        let (line, col) = self.origin.offset(line, column);
        let (end_line, end_col) = self.origin.offset(end.line, end.column);
        SourceLocation::new(line, col, end_line, end_col)
    }
}
