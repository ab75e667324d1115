//! Foreign boundary function rendering

use crate::codegen::dispatch::EntryPoint;
use crate::core::types::ForeignType;
use crate::errors::SourceLocation;
use crate::frontend::snippet::ParsedSnippet;
use proc_macro2::{Ident, Span, TokenStream};
use quote::quote;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rust edition of the generated unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Edition {
    #[serde(rename = "2018")]
    E2018,
    #[default]
    #[serde(rename = "2021")]
    E2021,
    #[serde(rename = "2024")]
    E2024,
}

impl Edition {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::E2018 => "2018",
            Self::E2021 => "2021",
            Self::E2024 => "2024",
        }
    }

    fn export_attribute(self) -> TokenStream {
        match self {
            Self::E2024 => quote!(#[unsafe(no_mangle)]),
            _ => quote!(#[no_mangle]),
        }
    }
}

impl fmt::Display for Edition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One boundary function, written once into the unit's sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedFunction {
    pub symbol: String,
    pub source: String,
    pub return_type: ForeignType,
    pub param_names: Vec<String>,
    pub param_types: Vec<ForeignType>,
    pub location: SourceLocation,
    pub entry: EntryPoint,
}

/// Render `snippet` as an exported `extern "C"` function named `symbol`.
///
/// The entry point is recorded but never changes the rendered text.
pub fn render_boundary(
    symbol: &str,
    snippet: &ParsedSnippet,
    entry: EntryPoint,
    edition: Edition,
) -> GeneratedFunction {
    let name = Ident::new(symbol, Span::call_site());
    let attr = edition.export_attribute();
    let ret = &snippet.return_type;
    let body = &snippet.body;
    let params = snippet.args.iter().map(|arg| {
        let name = &arg.name;
        let ty = &arg.ty;
        quote!(#name: #ty)
    });

    let tokens = quote! {
        #attr
        pub extern "C" fn #name(#(#params),*) -> #ret #body
    };

    GeneratedFunction {
        symbol: symbol.to_string(),
        source: tokens.to_string(),
        return_type: snippet.return_key.clone(),
        param_names: snippet.arg_names(),
        param_types: snippet.arg_keys(),
        location: snippet.location,
        entry,
    }
}
