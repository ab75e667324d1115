//! Host declarations and call expressions
//!
//! [`HostSyntax`] is the seam between the generator and the host language.
//! [`Haskell`] renders GHC-style `foreign import ccall` declarations.

use crate::codegen::dispatch::{PurityMode, SafetyMode};
use crate::core::types::HostType;
use crate::frontend::scanner::CommentSyntax;
use serde::Serialize;

/// External-call declaration binding one exported symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostDeclaration {
    pub symbol: String,
    /// Host binding introduced by the declaration; calls refer to this name.
    pub name: String,
    pub safety: SafetyMode,
    pub purity: PurityMode,
    pub params: Vec<HostType>,
    /// Unwrapped return type; the effect marker is added when rendering.
    pub ret: HostType,
}

impl HostDeclaration {
    /// Full host signature, return wrapped in `effect` when effectful.
    pub fn signature(&self, effect: &str) -> HostType {
        let ret = match self.purity {
            PurityMode::Pure => self.ret.clone(),
            PurityMode::Effectful => HostType::apply(effect, &[self.ret.clone()]),
        };
        HostType::arrow(&self.params, &ret)
    }
}

/// Application of a declared function to host expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostCall {
    pub function: String,
    pub args: Vec<String>,
}

pub trait HostSyntax: Send + Sync {
    fn name(&self) -> &'static str;

    /// Type constructor that sequences effectful calls.
    fn effect_marker(&self) -> &'static str;

    fn comments(&self) -> CommentSyntax;

    /// Whether `name` can be a host variable reference.
    fn is_variable(&self, name: &str) -> bool;

    fn render_declaration(&self, decl: &HostDeclaration) -> String;

    /// A variable name for the exported `symbol`; `_` is prepended when the
    /// symbol itself is not one (e.g. an uppercase prefix).
    fn binding_name(&self, symbol: &str) -> String {
        if self.is_variable(symbol) {
            symbol.to_string()
        } else {
            format!("_{}", symbol)
        }
    }

    fn render_call(&self, call: &HostCall) -> String;

    /// Wrap rendered declarations in a block appended to the host file.
    fn declarations_block(&self, unit: &str, declarations: &[String]) -> String {
        let comment = self.comments().line;
        let mut out = format!("\n{} generated by splicer for {}\n", comment, unit);
        for decl in declarations {
            out.push_str(decl);
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Haskell;

const HASKELL_RESERVED: &[&str] = &[
    "case", "class", "data", "default", "deriving", "do", "else", "foreign", "if", "import", "in",
    "infix", "infixl", "infixr", "instance", "let", "module", "newtype", "of", "then", "type",
    "where", "_",
];

impl HostSyntax for Haskell {
    fn name(&self) -> &'static str {
        "haskell"
    }

    fn effect_marker(&self) -> &'static str {
        "IO"
    }

    fn comments(&self) -> CommentSyntax {
        CommentSyntax {
            line: "--",
            block: Some(("{-", "-}")),
            nested_blocks: true,
        }
    }

    fn is_variable(&self, name: &str) -> bool {
        let mut chars = name.chars();
        let first_ok = matches!(chars.next(), Some(c) if c.is_lowercase() || c == '_');
        first_ok
            && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '\'')
            && !HASKELL_RESERVED.contains(&name)
    }

    fn render_declaration(&self, decl: &HostDeclaration) -> String {
        format!(
            "foreign import ccall {} \"{}\" {} :: {}",
            decl.safety.keyword(),
            decl.symbol,
            decl.name,
            decl.signature(self.effect_marker())
        )
    }

    fn render_call(&self, call: &HostCall) -> String {
        if call.args.is_empty() {
            return call.function.clone();
        }
        let args: Vec<String> = call
            .args
            .iter()
            .map(|a| if a.contains(char::is_whitespace) { format!("({})", a) } else { a.clone() })
            .collect();
        format!("({} {})", call.function, args.join(" "))
    }
}
