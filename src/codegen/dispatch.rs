//! Safety and purity entry points
//!
//! Safety selects only the calling annotation on the host declaration; purity
//! selects only the host return shape. Neither changes the foreign function
//! text or the marshalling of arguments.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Calling safety of a foreign call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyMode {
    /// The snippet may block and may call back into the host runtime.
    Safe,
    /// The snippet must neither block nor call back into the host runtime.
    /// Violations are undefined behavior and are not detected.
    Unsafe,
    /// Safe, and the host may deliver an asynchronous interrupt to a blocked
    /// call.
    Interruptible,
}

impl SafetyMode {
    pub const ALL: [SafetyMode; 3] = [Self::Safe, Self::Unsafe, Self::Interruptible];

    /// Host annotation for this mode
    #[inline]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Unsafe => "unsafe",
            Self::Interruptible => "interruptible",
        }
    }

    #[inline]
    pub const fn may_block(self) -> bool {
        !matches!(self, Self::Unsafe)
    }

    #[inline]
    pub const fn may_reenter(self) -> bool {
        !matches!(self, Self::Unsafe)
    }

    #[inline]
    pub const fn cancellable(self) -> bool {
        matches!(self, Self::Interruptible)
    }

    const fn quoter_infix(self) -> &'static str {
        match self {
            Self::Safe => "",
            Self::Unsafe => "Unsafe",
            Self::Interruptible => "Interruptible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurityMode {
    /// The call is a plain value.
    Pure,
    /// The call is an action sequenced in the host effect context.
    Effectful,
}

impl PurityMode {
    pub const ALL: [PurityMode; 2] = [Self::Pure, Self::Effectful];

    #[inline]
    pub const fn is_effectful(self) -> bool {
        matches!(self, Self::Effectful)
    }
}

/// One (safety, purity) combination, named by its quoter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryPoint {
    pub safety: SafetyMode,
    pub purity: PurityMode,
}

pub const QUOTER_BASE: &str = "rust";
pub const ITEMS_QUOTER: &str = "rustItems";

impl EntryPoint {
    pub const fn new(safety: SafetyMode, purity: PurityMode) -> Self {
        Self { safety, purity }
    }

    pub fn all() -> impl Iterator<Item = EntryPoint> {
        SafetyMode::ALL
            .into_iter()
            .flat_map(|safety| PurityMode::ALL.into_iter().map(move |purity| Self::new(safety, purity)))
    }

    /// `rust`, `rustIO`, `rustUnsafe`, `rustUnsafeIO`, ...
    pub fn quoter(self) -> String {
        let suffix = if self.purity.is_effectful() { "IO" } else { "" };
        format!("{}{}{}", QUOTER_BASE, self.safety.quoter_infix(), suffix)
    }

    pub fn from_quoter(name: &str) -> Option<Self> {
        Self::all().find(|entry| entry.quoter() == name)
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.quoter())
    }
}

/// What a recognized quoter asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    Expression(EntryPoint),
    /// Verbatim foreign items with no host call.
    Items,
}

pub fn classify(quoter: &str) -> Option<QuoteKind> {
    if quoter == ITEMS_QUOTER {
        return Some(QuoteKind::Items);
    }
    EntryPoint::from_quoter(quoter).map(QuoteKind::Expression)
}

pub fn is_quoter(name: &str) -> bool {
    classify(name).is_some()
}
