//! Opaque identifier symbols.
//!
//! A [`SqlSymbol`] stands in for an identifier whose final name is not chosen
//! until compile time. Symbols have process-unique identity: two symbols
//! created from the same hint are distinct, while a cloned symbol is the same
//! symbol. The human-readable hint is mangled once at creation and only makes
//! the compiled alias readable; identity, not the description, governs
//! equality and alias assignment.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SYMBOL_ID: AtomicU64 = AtomicU64::new(1);

/// An opaque identifier token with process-local identity.
#[derive(Clone)]
pub struct SqlSymbol {
    id: u64,
    mangled: Arc<str>,
}

impl SqlSymbol {
    /// Create a fresh symbol from a human-readable hint.
    pub fn new(hint: &str) -> Self {
        Self {
            id: NEXT_SYMBOL_ID.fetch_add(1, Ordering::Relaxed),
            mangled: Arc::from(mangle_description(hint)),
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// The mangled description this symbol renders with.
    pub fn description(&self) -> &str {
        &self.mangled
    }
}

impl PartialEq for SqlSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SqlSymbol {}

impl Hash for SqlSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SqlSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SqlSymbol({}, {:?})", self.id, self.mangled)
    }
}

/// Normalize a human-readable hint into a safe alias stem.
///
/// Uppercase ASCII letters are lowered with a preceding underscore, runs of
/// non-alphanumeric characters collapse to a single underscore, leading and
/// trailing underscores are trimmed, and the result is capped at 50
/// characters. An empty result falls back to `"local"`.
pub(crate) fn mangle_description(hint: &str) -> String {
    let mut out = String::with_capacity(hint.len());
    for ch in hint.chars() {
        if ch.is_ascii_uppercase() {
            if !out.ends_with('_') {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let mut mangled: String = out.trim_matches('_').chars().take(50).collect();
    if mangled.is_empty() {
        mangled.push_str("local");
    }
    mangled
}
