//! Boundary generation for one parsed snippet
//!
//! Type resolution is separate from rendering so a caller can validate every
//! type and host identifier before anything is minted or emitted.

use crate::codegen::dispatch::EntryPoint;
use crate::codegen::foreign::{render_boundary, Edition, GeneratedFunction};
use crate::codegen::host::{HostCall, HostDeclaration};
use crate::core::context::TypeContext;
use crate::core::types::{ForeignType, HostType};
use crate::errors::{ExpandError, SourceLocation, TypePosition};
use crate::frontend::snippet::ParsedSnippet;
use tracing::debug;

/// Host types for a snippet, in placeholder order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSignature {
    pub params: Vec<HostType>,
    pub ret: HostType,
}

#[derive(Debug, Clone)]
pub struct Boundary {
    pub function: GeneratedFunction,
    pub declaration: HostDeclaration,
    pub call: HostCall,
}

pub struct BoundaryGenerator<'a> {
    context: &'a TypeContext,
    edition: Edition,
}

impl<'a> BoundaryGenerator<'a> {
    pub fn new(context: &'a TypeContext, edition: Edition) -> Self {
        Self { context, edition }
    }

    /// Resolve the return type, then each argument; the first miss aborts.
    pub fn resolve_types(&self, snippet: &ParsedSnippet) -> Result<ResolvedSignature, ExpandError> {
        let ret = self.resolve(&snippet.return_key, TypePosition::Return, snippet.location)?;

        let params = snippet
            .args
            .iter()
            .enumerate()
            .map(|(index, arg)| {
                let position = TypePosition::Argument { index, name: arg.name() };
                self.resolve(&arg.key, position, arg.location)
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ResolvedSignature { params, ret })
    }

    fn resolve(
        &self,
        foreign: &ForeignType,
        position: TypePosition,
        location: SourceLocation,
    ) -> Result<HostType, ExpandError> {
        self.context.lookup(foreign).ok_or_else(|| {
            ExpandError::unmapped_type(
                foreign.to_string(),
                position,
                location,
                &self.context.foreign_keys(),
            )
        })
    }

    /// Render the foreign function and the matching host declaration and call.
    ///
    /// `binding` is the host name declared for `symbol`; `host_args` are the
    /// resolved host expressions, one per placeholder.
    pub fn generate(
        &self,
        snippet: &ParsedSnippet,
        entry: EntryPoint,
        symbol: &str,
        binding: String,
        signature: ResolvedSignature,
        host_args: Vec<String>,
    ) -> Boundary {
        debug_assert_eq!(host_args.len(), snippet.args.len());

        let function = render_boundary(symbol, snippet, entry, self.edition);
        let declaration = HostDeclaration {
            symbol: symbol.to_string(),
            name: binding,
            safety: entry.safety,
            purity: entry.purity,
            params: signature.params,
            ret: signature.ret,
        };
        let call = HostCall {
            function: declaration.name.clone(),
            args: host_args,
        };

        debug!(symbol, entry = %entry, arity = call.args.len(), "generated boundary");
        Boundary { function, declaration, call }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::dispatch::{PurityMode, SafetyMode};
    use crate::core::context::{merge, prelude, singleton};
    use crate::errors::ErrorKind;
    use crate::frontend::snippet::parse_snippet;

    fn snippet(text: &str) -> ParsedSnippet {
        parse_snippet(text, SourceLocation::point(3, 4)).unwrap()
    }

    #[test]
    fn test_resolve_in_placeholder_order() {
        let ctx = prelude();
        let gen = BoundaryGenerator::new(&ctx, Edition::E2021);
        let sig = gen.resolve_types(&snippet("u8 { $(a: i64) as u8 + *$(b: *const u8) }")).unwrap();
        assert_eq!(sig.ret.as_str(), "Word8");
        let params: Vec<&str> = sig.params.iter().map(HostType::as_str).collect();
        assert_eq!(params, vec!["Int64", "Ptr Word8"]);
    }

    #[test]
    fn test_unmapped_return_type() {
        let ctx = singleton("i32", "Int32");
        let gen = BoundaryGenerator::new(&ctx, Edition::E2021);
        let err = gen.resolve_types(&snippet("f32 { $(x: i32) as f32 }")).unwrap_err();
        match err.kind {
            ErrorKind::UnmappedType { ty, position } => {
                assert_eq!(ty, "f32");
                assert_eq!(position, TypePosition::Return);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(err.location.line, 3);
    }

    #[test]
    fn test_unmapped_argument_names_position() {
        let ctx = singleton("i32", "Int32");
        let gen = BoundaryGenerator::new(&ctx, Edition::E2021);
        let err = gen.resolve_types(&snippet("i32 { $(a: i32) + $(b: f64) as i32 }")).unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::UnmappedType { position: TypePosition::Argument { index: 1, ref name }, .. } if name == "b"
        ));
    }

    #[test]
    fn test_merge_makes_type_available() {
        let base = singleton("i32", "Int32");
        let parsed = snippet("f64 { $(x: i32) as f64 }");
        assert!(BoundaryGenerator::new(&base, Edition::E2021).resolve_types(&parsed).is_err());

        let merged = merge(&base, &singleton("f64", "Double"));
        assert!(BoundaryGenerator::new(&merged, Edition::E2021).resolve_types(&parsed).is_ok());
    }

    #[test]
    fn test_generate_effectful_boundary() {
        let ctx = prelude();
        let gen = BoundaryGenerator::new(&ctx, Edition::E2021);
        let parsed = snippet("i32 { 1i32 + $(x: i32) }");
        let sig = gen.resolve_types(&parsed).unwrap();
        let entry = EntryPoint::new(SafetyMode::Safe, PurityMode::Effectful);
        let boundary = gen.generate(&parsed, entry, "Sym_0", "_Sym_0".to_string(), sig, vec!["x".to_string()]);

        assert_eq!(boundary.declaration.signature("IO").as_str(), "Int32 -> IO Int32");
        assert_eq!(boundary.declaration.symbol, "Sym_0");
        assert_eq!(boundary.declaration.name, "_Sym_0");
        assert_eq!(boundary.call.function, "_Sym_0");
        assert_eq!(boundary.call.args, vec!["x"]);
        assert_eq!(boundary.function.symbol, "Sym_0");
    }
}
