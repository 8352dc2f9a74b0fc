//! # pgfrag
//!
//! A safe, composable builder for parameterized PostgreSQL statements.
//!
//! ## Features
//!
//! - **Injection-safe by construction**: SQL is assembled from typed
//!   [`Fragment`]s; bare strings cannot enter the tree unchecked
//! - **Automatic placeholders**: values compile to `$1, $2, ...` with the
//!   scalars extracted alongside, ready for `tokio-postgres`
//! - **Deterministic aliases**: opaque [`SqlSymbol`]s shared across fragments
//!   render as stable identifier aliases per compile
//! - **Composable**: fragments are immutable and cheap to clone; intern
//!   caches keep allocation pressure down under heavy reuse
//! - **Deduplication-friendly**: structural equivalence with symbol
//!   substitution ([`is_equivalent`]) and symbol rewriting
//!   ([`replace_symbol`]) for memoizing query plans upstream
//!
//! ## Example
//!
//! ```
//! use pgfrag::{compile, identifier, value};
//!
//! let frag = pgfrag::sql!(
//!     "select ",
//!     identifier(["users", "id"])?,
//!     " from ",
//!     identifier(["users"])?,
//!     " where ",
//!     identifier(["users", "id"])?,
//!     " = ",
//!     value(42)?,
//! );
//! let compiled = compile(&frag, &Default::default())?;
//!
//! assert_eq!(
//!     compiled.text,
//!     r#"select "users"."id" from "users" where "users"."id" = $1"#
//! );
//! assert_eq!(compiled.values, vec![pgfrag::Scalar::Int(42)]);
//! # Ok::<(), pgfrag::FragError>(())
//! ```
//!
//! ## Pretty rendering
//!
//! Set `PGFRAG_PRETTY=1` to render indented, development-friendly SQL. The
//! flag changes whitespace only — values, placeholder numbering, and
//! identifier aliases are identical in both modes.

mod build;
mod compile;
mod equiv;
mod error;
mod fragment;
mod ident;
mod intern;
mod rewrite;
mod scalar;
mod symbol;

pub use build::{
    identifier, indent, indent_if, join, literal, parens, placeholder, raw, symbol_alias, template,
    value,
};
pub use compile::{Compiled, CompileOptions, MAX_PARAMETERS, compile};
pub use equiv::{SymbolSubstitutions, is_equivalent};
pub use error::{FragError, FragResult};
pub use fragment::{Fragment, Piece};
pub use ident::{IdentPart, escape_identifier};
pub use intern::{CacheStats, blank, raw_cache_stats, sql_false, sql_null, sql_true};
pub use rewrite::replace_symbol;
pub use scalar::Scalar;
pub use symbol::SqlSymbol;
