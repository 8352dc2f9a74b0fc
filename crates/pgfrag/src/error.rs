//! Error types for pgfrag
//!
//! ## Error classification
//!
//! `FragError` variants fall into two categories:
//!
//! **Construction errors** — raised by constructors and typically programming
//! errors: [`InvalidValue`](FragError::InvalidValue),
//! [`EmptyIdentifier`](FragError::EmptyIdentifier),
//! [`EmptyParens`](FragError::EmptyParens).
//!
//! **Compile errors** — raised while rendering a fragment tree:
//! [`TooManyParameters`](FragError::TooManyParameters),
//! [`UnresolvedPlaceholder`](FragError::UnresolvedPlaceholder),
//! [`ConflictingSymbolAlias`](FragError::ConflictingSymbolAlias),
//! [`SelfSubstitution`](FragError::SelfSubstitution),
//! [`SubstitutionCycle`](FragError::SubstitutionCycle).
//!
//! Nothing is retried or recovered internally; every error surfaces at the
//! call site that detected it.

use thiserror::Error;

/// Result type alias for pgfrag operations
pub type FragResult<T> = Result<T, FragError>;

/// Error types for fragment construction and compilation.
#[derive(Debug, Error)]
pub enum FragError {
    // ── Construction errors ─────────────────────────────────────────────────
    /// A scalar that cannot be bound as a parameter (non-finite number).
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// `identifier()` called with no parts.
    #[error("Identifier requires at least one part")]
    EmptyIdentifier,

    /// `parens()` called on an empty fragment.
    #[error("Cannot parenthesize an empty fragment")]
    EmptyParens,

    // ── Compile errors ──────────────────────────────────────────────────────
    /// The statement needs more parameters than the wire protocol can carry.
    ///
    /// The PostgreSQL extended query protocol transmits the parameter count
    /// as a 16-bit integer, so a single statement is capped at 65535 values.
    #[error(
        "Too many parameters: {count} values, but the PostgreSQL wire protocol \
         caps a single statement at 65535"
    )]
    TooManyParameters { count: usize },

    /// A placeholder had neither a caller-supplied value nor a fallback.
    #[error("Unresolved placeholder '{symbol}': no value supplied and no fallback")]
    UnresolvedPlaceholder { symbol: String },

    /// `symbol_alias()` joined two symbols that already render differently.
    #[error("Conflicting symbol alias: '{a}' and '{b}' are already assigned")]
    ConflictingSymbolAlias { a: String, b: String },

    /// A symbol substitution maps a symbol to itself.
    #[error("Symbol substitution maps '{symbol}' to itself")]
    SelfSubstitution { symbol: String },

    /// A cycle (or an unreasonably long chain) in the substitution map.
    #[error("Symbol substitution cycle detected at '{symbol}'")]
    SubstitutionCycle { symbol: String },
}

/// Emit a pgfrag warning message.
///
/// Uses `tracing::warn!` when the `tracing` feature is enabled,
/// falls back to `eprintln!` otherwise.
pub(crate) fn frag_warn(msg: &str) {
    #[cfg(feature = "tracing")]
    tracing::warn!(target: "pgfrag", "{}", msg);
    #[cfg(not(feature = "tracing"))]
    eprintln!("{msg}");
}
