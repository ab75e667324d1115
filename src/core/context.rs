//! Type context registry
//!
//! Maps foreign type identities to host type identities. Contexts are built at
//! configuration time, composed by override-merge, then frozen behind an `Arc`
//! for the rest of a compilation unit.
//!
//! Besides exact entries, a context can carry structural rules (pointers,
//! function pointers). Rules resolve their component types through the same
//! context, so `*const i32` only resolves if `i32` does.

use crate::core::types::{ForeignType, HostType, TypeCorrespondence};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Structural correspondences that cannot be listed entry by entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRule {
    /// `*const T` and `*mut T` map to `Ptr <T>`.
    Pointers,
    /// `extern "C" fn(A, ..) -> R` maps to `FunPtr (A -> .. -> IO R)`.
    FunctionPointers,
}

impl TypeRule {
    fn apply(self, ty: &syn::Type, ctx: &TypeContext) -> Option<HostType> {
        match (self, ty) {
            (Self::Pointers, syn::Type::Ptr(ptr)) => {
                let pointee = ctx.lookup(&ForeignType::from_syn(&ptr.elem))?;
                Some(HostType::apply("Ptr", &[pointee]))
            }
            (Self::FunctionPointers, syn::Type::BareFn(func)) => {
                let abi_is_c = func
                    .abi
                    .as_ref()
                    .and_then(|abi| abi.name.as_ref())
                    .map(|name| name.value() == "C")
                    .unwrap_or(false);
                if !abi_is_c || func.variadic.is_some() {
                    return None;
                }

                let params = func
                    .inputs
                    .iter()
                    .map(|arg| ctx.lookup(&ForeignType::from_syn(&arg.ty)))
                    .collect::<Option<Vec<_>>>()?;
                let ret = match &func.output {
                    syn::ReturnType::Default => ctx.lookup(&ForeignType::unit())?,
                    syn::ReturnType::Type(_, ty) => ctx.lookup(&ForeignType::from_syn(ty))?,
                };
                let io_ret = HostType::apply("IO", &[ret]);
                Some(HostType::apply("FunPtr", &[HostType::arrow(&params, &io_ret)]))
            }
            _ => None,
        }
    }
}

/// Immutable mapping from foreign types to host types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeContext {
    entries: HashMap<ForeignType, HostType>,
    rules: Vec<TypeRule>,
}

impl TypeContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with exactly one correspondence.
    pub fn singleton(foreign: ForeignType, host: HostType) -> Self {
        let mut ctx = Self::new();
        ctx.entries.insert(foreign, host);
        ctx
    }

    /// Context from a list of correspondences; later duplicates win.
    pub fn from_entries(entries: impl IntoIterator<Item = (ForeignType, HostType)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
            rules: Vec::new(),
        }
    }

    /// Context holding only a structural rule.
    pub fn from_rule(rule: TypeRule) -> Self {
        Self {
            entries: HashMap::new(),
            rules: vec![rule],
        }
    }

    /// Override-merge: whatever `other` resolves, exactly or through a rule,
    /// replaces the mapping of `self`.
    pub fn extend(mut self, other: &TypeContext) -> Self {
        if !other.rules.is_empty() {
            self.entries.retain(|foreign, _| other.lookup(foreign).is_none());
        }
        for (foreign, host) in &other.entries {
            self.entries.insert(foreign.clone(), host.clone());
        }
        for rule in &other.rules {
            self.rules.retain(|r| r != rule);
            self.rules.push(*rule);
        }
        self
    }

    pub fn lookup(&self, foreign: &ForeignType) -> Option<HostType> {
        if let Some(host) = self.entries.get(foreign) {
            return Some(host.clone());
        }
        if self.rules.is_empty() {
            return None;
        }

        let ty = peel_parens(foreign.to_syn().ok()?);
        let found = self.rules.iter().rev().find_map(|rule| rule.apply(&ty, self));
        trace!(foreign = %foreign, found = ?found, "structural lookup");
        found
    }

    /// Reverse lookup over exact entries; the smallest matching foreign key wins.
    pub fn lookup_host(&self, host: &HostType) -> Option<ForeignType> {
        self.entries
            .iter()
            .filter(|(_, h)| *h == host)
            .map(|(f, _)| f)
            .min()
            .cloned()
    }

    pub fn contains(&self, foreign: &ForeignType) -> bool {
        self.lookup(foreign).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.rules.is_empty()
    }

    pub fn rules(&self) -> &[TypeRule] {
        &self.rules
    }

    /// Registered foreign keys, sorted.
    pub fn foreign_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().map(|k| k.to_string()).collect();
        keys.sort();
        keys
    }

    /// All exact correspondences, sorted by foreign key.
    pub fn correspondences(&self) -> Vec<TypeCorrespondence> {
        let mut all: Vec<TypeCorrespondence> = self
            .entries
            .iter()
            .map(|(f, h)| TypeCorrespondence::new(f.clone(), h.clone()))
            .collect();
        all.sort_by(|a, b| a.foreign.cmp(&b.foreign));
        all
    }
}

fn peel_parens(ty: syn::Type) -> syn::Type {
    match ty {
        syn::Type::Paren(inner) => peel_parens(*inner.elem),
        syn::Type::Group(inner) => peel_parens(*inner.elem),
        other => other,
    }
}

/// `singleton` lifted to spelled types. Panics only on a malformed literal key.
pub fn singleton(foreign: &str, host: &str) -> TypeContext {
    TypeContext::singleton(parse_key(foreign), HostType::new(host))
}

/// Build a context from `(foreign, host)` spellings.
pub fn mk_context<'a>(entries: impl IntoIterator<Item = (&'a str, &'a str)>) -> TypeContext {
    TypeContext::from_entries(
        entries
            .into_iter()
            .map(|(f, h)| (parse_key(f), HostType::new(h))),
    )
}

/// Override-merge two contexts: `b` wins on conflicts.
pub fn merge(a: &TypeContext, b: &TypeContext) -> TypeContext {
    a.clone().extend(b)
}

fn parse_key(foreign: &str) -> ForeignType {
    ForeignType::parse(foreign)
        .unwrap_or_else(|e| panic!("invalid foreign type literal `{}`: {}", foreign, e))
}

static BASIC: Lazy<Arc<TypeContext>> = Lazy::new(|| {
    Arc::new(mk_context([
        ("i8", "Int8"),
        ("i16", "Int16"),
        ("i32", "Int32"),
        ("i64", "Int64"),
        ("isize", "Int"),
        ("u8", "Word8"),
        ("u16", "Word16"),
        ("u32", "Word32"),
        ("u64", "Word64"),
        ("usize", "Word"),
        ("f32", "Float"),
        ("f64", "Double"),
        ("bool", "CBool"),
        ("char", "Char"),
        ("()", "()"),
        ("*const c_char", "CString"),
        ("*const std::os::raw::c_char", "CString"),
        ("*const core::ffi::c_char", "CString"),
    ]))
});

const C_NAMES: &[(&str, &str)] = &[
    ("c_char", "CChar"),
    ("c_schar", "CSChar"),
    ("c_uchar", "CUChar"),
    ("c_short", "CShort"),
    ("c_ushort", "CUShort"),
    ("c_int", "CInt"),
    ("c_uint", "CUInt"),
    ("c_long", "CLong"),
    ("c_ulong", "CULong"),
    ("c_longlong", "CLLong"),
    ("c_ulonglong", "CULLong"),
    ("c_float", "CFloat"),
    ("c_double", "CDouble"),
    ("c_void", "()"),
];

static LIBC: Lazy<Arc<TypeContext>> = Lazy::new(|| {
    let mut ctx = TypeContext::new();
    for prefix in ["", "std::os::raw::", "core::ffi::", "libc::"] {
        for (name, host) in C_NAMES {
            ctx.entries
                .insert(parse_key(&format!("{}{}", prefix, name)), HostType::new(*host));
        }
    }
    ctx.entries.insert(parse_key("libc::size_t"), HostType::new("CSize"));
    ctx.entries.insert(parse_key("libc::ssize_t"), HostType::new("CSsize"));
    Arc::new(ctx)
});

static POINTERS: Lazy<Arc<TypeContext>> =
    Lazy::new(|| Arc::new(TypeContext::from_rule(TypeRule::Pointers)));

static FUNCTIONS: Lazy<Arc<TypeContext>> =
    Lazy::new(|| Arc::new(TypeContext::from_rule(TypeRule::FunctionPointers)));

static PRELUDE: Lazy<Arc<TypeContext>> = Lazy::new(|| Arc::new(merge(&BASIC, &POINTERS)));

/// Rust primitives, `bool`, `char`, unit and C strings.
pub fn basic() -> Arc<TypeContext> {
    BASIC.clone()
}

/// C-compatible numeric and `c_void` vocabulary under the usual paths.
pub fn libc() -> Arc<TypeContext> {
    LIBC.clone()
}

pub fn pointers() -> Arc<TypeContext> {
    POINTERS.clone()
}

pub fn functions() -> Arc<TypeContext> {
    FUNCTIONS.clone()
}

/// The default active context: `basic` merged with `pointers`.
pub fn prelude() -> Arc<TypeContext> {
    PRELUDE.clone()
}

/// Names accepted by [`builtin`].
pub const BUILTIN_CONTEXTS: &[&str] = &["basic", "libc", "pointers", "functions", "prelude"];

/// Look up a built-in context by name.
pub fn builtin(name: &str) -> Option<Arc<TypeContext>> {
    match name {
        "basic" => Some(basic()),
        "libc" => Some(libc()),
        "pointers" => Some(pointers()),
        "functions" => Some(functions()),
        "prelude" => Some(prelude()),
        _ => None,
    }
}
