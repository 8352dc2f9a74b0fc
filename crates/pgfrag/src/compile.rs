//! Compilation of fragment trees into `$n`-parameterized SQL.
//!
//! The compiler walks a fragment left to right, concatenating rendered nodes
//! into the output text while extracting bound values into a parallel list.
//! All scratch state (value list, alias map, description counters) lives in a
//! per-call `Compiler`, so fragments can be shared across threads and
//! compiled concurrently.
//!
//! Identifier aliases are deterministic per compile: the n-th distinct symbol
//! with a given mangled description renders as `__<desc>_` (n = 1) or
//! `__<desc>_<n>` (n ≥ 2), in order of first occurrence.

use std::collections::HashMap;
use std::sync::OnceLock;

use tokio_postgres::types::ToSql;

use crate::error::{FragError, FragResult};
use crate::fragment::{Fragment, Node};
use crate::ident::IdentPart;
use crate::scalar::Scalar;
use crate::symbol::SqlSymbol;

/// The PostgreSQL extended query protocol carries the parameter count as a
/// 16-bit integer, so a single statement binds at most this many values.
pub const MAX_PARAMETERS: usize = 65_535;

/// Process-wide pretty-rendering flag, read once from `PGFRAG_PRETTY`.
pub(crate) fn pretty_enabled() -> bool {
    static PRETTY: OnceLock<bool> = OnceLock::new();
    *PRETTY.get_or_init(|| {
        std::env::var("PGFRAG_PRETTY")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

/// Options for [`compile`].
#[derive(Debug, Default)]
pub struct CompileOptions {
    /// Values for [`placeholder`](crate::placeholder) nodes, keyed by symbol.
    pub placeholder_values: HashMap<SqlSymbol, Fragment>,
    /// Override the process-wide pretty flag for this compile only.
    ///
    /// Pretty rendering changes whitespace, never values, placeholder
    /// numbering, or identifier aliases.
    pub pretty: Option<bool>,
}

/// A compiled statement: SQL text plus extracted parameter values.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    pub text: String,
    pub values: Vec<Scalar>,
}

impl Compiled {
    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.values
            .iter()
            .map(|v| v as &(dyn ToSql + Sync))
            .collect()
    }
}

/// Compile a fragment into SQL text and its bound values.
///
/// Values render as `$1, $2, ...` in walk order; the same fragment plus the
/// same options yields byte-identical output.
///
/// # Example
/// ```
/// let frag = pgfrag::sql!(
///     "select * from ",
///     pgfrag::identifier(["users"])?,
///     " where id = ",
///     pgfrag::value(42)?,
/// );
/// let compiled = pgfrag::compile(&frag, &Default::default())?;
/// assert_eq!(compiled.text, r#"select * from "users" where id = $1"#);
/// assert_eq!(compiled.values, vec![pgfrag::Scalar::Int(42)]);
/// # Ok::<(), pgfrag::FragError>(())
/// ```
pub fn compile(fragment: &Fragment, options: &CompileOptions) -> FragResult<Compiled> {
    let pretty = options.pretty.unwrap_or_else(pretty_enabled);
    let mut cx = Compiler {
        out: String::new(),
        values: Vec::new(),
        aliases: HashMap::new(),
        desc_counts: HashMap::new(),
        placeholder_values: &options.placeholder_values,
        pretty,
    };
    cx.render_sequence(fragment, 0)?;

    let text = if pretty {
        collapse_blank_lines(&cx.out)
    } else {
        cx.out
    };
    Ok(Compiled {
        text,
        values: cx.values,
    })
}

struct Compiler<'a> {
    out: String,
    values: Vec<Scalar>,
    /// Symbol id → assigned alias, for this compile only.
    aliases: HashMap<u64, String>,
    /// Mangled description → how many distinct symbols have used it.
    desc_counts: HashMap<String, usize>,
    placeholder_values: &'a HashMap<SqlSymbol, Fragment>,
    pretty: bool,
}

impl Compiler<'_> {
    /// Render a fragment as a node sequence: a Query's children in order, or
    /// the fragment itself as a singleton.
    fn render_sequence(&mut self, fragment: &Fragment, indent: usize) -> FragResult<()> {
        match fragment.node() {
            Node::Query(nodes) => {
                for (i, node) in nodes.iter().enumerate() {
                    self.render_node(node, indent, i + 1 == nodes.len())?;
                }
                Ok(())
            }
            _ => self.render_node(fragment, indent, true),
        }
    }

    fn render_node(&mut self, fragment: &Fragment, indent: usize, last: bool) -> FragResult<()> {
        match fragment.node() {
            Node::Raw(text) => {
                self.emit_raw(text, indent, last);
                Ok(())
            }
            Node::Value(scalar) => {
                if self.values.len() >= MAX_PARAMETERS {
                    return Err(FragError::TooManyParameters {
                        count: self.values.len() + 1,
                    });
                }
                self.values.push(scalar.clone());
                push_placeholder(&mut self.out, self.values.len());
                Ok(())
            }
            Node::Identifier(parts) => {
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        self.out.push('.');
                    }
                    match part {
                        IdentPart::Name(escaped) => self.out.push_str(escaped),
                        IdentPart::Symbol(symbol) => {
                            let alias = self.alias_for(symbol);
                            self.out.push_str(&alias);
                        }
                    }
                }
                Ok(())
            }
            Node::Indent(content) => {
                if !self.pretty {
                    // Indentation markers are transparent outside pretty mode.
                    return self.render_sequence(content, indent);
                }
                self.out.push('\n');
                push_spaces(&mut self.out, 2 * (indent + 1));
                self.render_sequence(content, indent + 1)?;
                self.out.push('\n');
                push_spaces(&mut self.out, 2 * indent);
                Ok(())
            }
            Node::Parens { content, force } => {
                // Render the content into its own buffer so the wrapping
                // decision can inspect the finished text.
                let saved = std::mem::take(&mut self.out);
                self.render_sequence(content, indent)?;
                let inner = std::mem::replace(&mut self.out, saved);

                if *force || !is_parens_safe(&inner) {
                    self.out.push('(');
                    self.out.push_str(&inner);
                    self.out.push(')');
                } else {
                    self.out.push_str(&inner);
                }
                Ok(())
            }
            Node::SymbolAlias(a, b) => {
                let alias_a = self.aliases.get(&a.id()).cloned();
                let alias_b = self.aliases.get(&b.id()).cloned();
                match (alias_a, alias_b) {
                    (Some(x), Some(y)) => {
                        if x != y {
                            return Err(FragError::ConflictingSymbolAlias { a: x, b: y });
                        }
                        Ok(())
                    }
                    (Some(x), None) => {
                        self.aliases.insert(b.id(), x);
                        Ok(())
                    }
                    (None, Some(y)) => {
                        self.aliases.insert(a.id(), y);
                        Ok(())
                    }
                    (None, None) => {
                        let alias = self.assign_alias(a);
                        self.aliases.insert(b.id(), alias);
                        Ok(())
                    }
                }
            }
            Node::Placeholder { symbol, fallback } => {
                let resolved = self
                    .placeholder_values
                    .get(symbol)
                    .or(fallback.as_ref())
                    .cloned();
                let Some(resolved) = resolved else {
                    return Err(FragError::UnresolvedPlaceholder {
                        symbol: symbol.description().to_string(),
                    });
                };
                self.render_sequence(&resolved, indent)
            }
            // Queries never nest, so a Query can only reach render_node
            // through a bug in the constructors; render it anyway.
            Node::Query(_) => self.render_sequence(fragment, indent),
        }
    }

    fn emit_raw(&mut self, text: &str, indent: usize, last: bool) {
        if !self.pretty {
            self.out.push_str(text);
            return;
        }

        // A closing semicolon pulls back onto the previous line.
        if last && text == ";" {
            while self.out.ends_with(' ') {
                self.out.pop();
            }
            if self.out.ends_with('\n') {
                self.out.pop();
            }
            self.out.push(';');
            return;
        }

        let mut first = true;
        for line in text.split('\n') {
            if !first {
                self.out.push('\n');
                push_spaces(&mut self.out, 2 * indent);
            }
            self.out.push_str(line);
            first = false;
        }
    }

    fn alias_for(&mut self, symbol: &SqlSymbol) -> String {
        if let Some(alias) = self.aliases.get(&symbol.id()) {
            return alias.clone();
        }
        self.assign_alias(symbol)
    }

    fn assign_alias(&mut self, symbol: &SqlSymbol) -> String {
        let count = self
            .desc_counts
            .entry(symbol.description().to_string())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let alias = if *count == 1 {
            format!("__{}_", symbol.description())
        } else {
            format!("__{}_{}", symbol.description(), count)
        };
        self.aliases.insert(symbol.id(), alias.clone());
        alias
    }
}

/// Lexical test for rendered expressions that need no wrapping when embedded:
/// a pure `$n` placeholder, a bare number, a single-quoted string without
/// embedded quotes, or a dotted identifier chain. Anything with operators,
/// calls, or casts is unsafe.
pub(crate) fn is_parens_safe(rendered: &str) -> bool {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(
            r#"^(\$[0-9]+|[0-9]+(\.[0-9]+)?|\.[0-9]+|'[^']*'|("[^"]*"|[a-zA-Z0-9_]+)(\.("[^"]*"|[a-zA-Z0-9_]+))*)$"#,
        )
        .expect("invalid built-in parens-safety regex")
    })
    .is_match(rendered)
}

/// Collapse runs of blank lines left behind by empty pretty-printed groups.
fn collapse_blank_lines(text: &str) -> String {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"\n\s*\n").expect("invalid built-in blank-line regex"))
        .replace_all(text, "\n")
        .into_owned()
}

/// Append `$<index>` to `out`, skipping the formatting machinery on the
/// hottest emission path.
#[inline]
fn push_placeholder(out: &mut String, index: usize) {
    out.push('$');
    // Digits accumulate least significant first, then drain in reverse.
    // 20 slots cover any usize; the parameter cap keeps real indices at five.
    let mut digits = [0u8; 20];
    let mut n = index;
    let mut len = 0;
    loop {
        digits[len] = b'0' + (n % 10) as u8;
        len += 1;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    while len > 0 {
        len -= 1;
        out.push(char::from(digits[len]));
    }
}

#[inline]
fn push_spaces(out: &mut String, n: usize) {
    for _ in 0..n {
        out.push(' ');
    }
}
