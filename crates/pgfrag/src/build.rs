//! Fragment constructors.
//!
//! Everything here returns immutable, shareable [`Fragment`]s. The only
//! constructor that trusts its caller blindly is [`raw`]; the rest escape,
//! parameterize, or compose already-trusted inputs.

use std::sync::{Once, OnceLock};

use crate::error::{FragError, FragResult, frag_warn};
use crate::fragment::{Fragment, Node, Piece};
use crate::ident::IdentPart;
use crate::intern::{blank, intern_raw, intern_template_text, sql_false, sql_null, sql_true};
use crate::scalar::Scalar;
use crate::symbol::SqlSymbol;

/// Build a fragment from raw SQL text, emitted verbatim.
///
/// This is the one deliberately dangerous entry point: nothing is escaped or
/// parameterized, so the text must never contain untrusted input. Prefer
/// [`sql!`](crate::sql), [`identifier`], [`value`] or [`literal`]. The first
/// call in a process logs a warning.
///
/// Returned fragments are interned by text.
pub fn raw(text: impl AsRef<str>) -> Fragment {
    static WARN_ONCE: Once = Once::new();
    WARN_ONCE.call_once(|| {
        frag_warn(
            "pgfrag::raw builds SQL from an unchecked string; \
             the caller must guarantee the text is trusted",
        );
    });
    intern_raw(text.as_ref())
}

/// Build a dotted identifier from names and/or symbols.
///
/// Name parts are double-quote-escaped eagerly; symbol parts render as
/// deterministic aliases assigned during compilation. At least one part is
/// required.
///
/// # Example
/// ```
/// let frag = pgfrag::identifier(["users", "id"])?;
/// let compiled = pgfrag::compile(&frag, &Default::default())?;
/// assert_eq!(compiled.text, r#""users"."id""#);
/// # Ok::<(), pgfrag::FragError>(())
/// ```
pub fn identifier<I>(parts: I) -> FragResult<Fragment>
where
    I: IntoIterator,
    I::Item: Into<IdentPart>,
{
    let parts: Vec<IdentPart> = parts.into_iter().map(Into::into).collect();
    if parts.is_empty() {
        return Err(FragError::EmptyIdentifier);
    }
    Ok(Fragment::new(Node::Identifier(parts)))
}

/// Bind a scalar as a `$n` parameter.
///
/// Accepts text, finite numbers, booleans, options (None binds NULL), and
/// (possibly nested) lists of scalars. Non-finite numbers are rejected.
pub fn value(v: impl Into<Scalar>) -> FragResult<Fragment> {
    let scalar = v.into();
    scalar.check_finite()?;
    Ok(Fragment::new(Node::Value(scalar)))
}

fn inline_safe(s: &str) -> bool {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r#"^[-a-zA-Z0-9_@!$ :".]*$"#).expect("invalid built-in literal regex")
    })
    .is_match(s)
}

/// Inline a value into the SQL text when that is safely possible, otherwise
/// fall back to a bound parameter.
///
/// Inlined forms: benign strings as `'…'`, integral numbers as-is,
/// non-integral numbers as `'<n>'::float`, booleans as `TRUE`/`FALSE`, None
/// as `NULL`. Strings outside the benign alphabet parameterize via [`value`].
pub fn literal(v: impl Into<Scalar>) -> FragResult<Fragment> {
    let scalar = v.into();
    match &scalar {
        Scalar::Bool(true) => Ok(sql_true()),
        Scalar::Bool(false) => Ok(sql_false()),
        Scalar::Null => Ok(sql_null()),
        Scalar::Text(s) if inline_safe(s) => Ok(intern_raw(&format!("'{s}'"))),
        Scalar::Int(i) => Ok(intern_raw(&i.to_string())),
        Scalar::Float(f) if f.is_finite() && f.fract() == 0.0 => Ok(intern_raw(&format!("{f}"))),
        Scalar::Float(f) if f.is_finite() => Ok(intern_raw(&format!("'{f}'::float"))),
        _ => value(scalar),
    }
}

/// Join fragments with a separator.
///
/// Query items are inlined, and an interned separator is placed between
/// items when `separator` is non-empty. An empty input yields the blank
/// fragment; a single item is returned unchanged.
///
/// # Example
/// ```
/// let frag = pgfrag::join(
///     [pgfrag::value(1)?, pgfrag::value(2)?, pgfrag::value(3)?],
///     ", ",
/// );
/// let compiled = pgfrag::compile(&frag, &Default::default())?;
/// assert_eq!(compiled.text, "$1, $2, $3");
/// # Ok::<(), pgfrag::FragError>(())
/// ```
pub fn join<I>(items: I, separator: &str) -> Fragment
where
    I: IntoIterator<Item = Fragment>,
{
    let mut iter = items.into_iter();
    let Some(first) = iter.next() else {
        return blank();
    };
    let Some(second) = iter.next() else {
        return first;
    };

    let sep = if separator.is_empty() {
        None
    } else {
        Some(intern_raw(separator))
    };

    let mut nodes = Vec::new();
    first.flatten_into(&mut nodes);
    for item in std::iter::once(second).chain(iter) {
        if let Some(sep) = &sep {
            nodes.push(sep.clone());
        }
        item.flatten_into(&mut nodes);
    }
    Fragment::new(Node::Query(nodes))
}

/// Wrap `fragment` in an indentation marker when pretty rendering is on.
///
/// With pretty rendering off this is the identity function. Indentation is a
/// rendering-only concern; it never changes values, placeholder numbering, or
/// identifier aliases.
pub fn indent(fragment: Fragment) -> Fragment {
    if crate::compile::pretty_enabled() {
        Fragment::new(Node::Indent(fragment))
    } else {
        fragment
    }
}

/// [`indent`], but only when `cond` also holds.
pub fn indent_if(cond: bool, fragment: Fragment) -> Fragment {
    if cond { indent(fragment) } else { fragment }
}

/// Parenthesize `fragment` unless its rendering is self-delimiting.
///
/// `force` wraps even when the rendered content would be safe to embed bare.
/// Wrapping an empty fragment is an error.
pub fn parens(fragment: Fragment, force: bool) -> FragResult<Fragment> {
    match &*fragment.node {
        Node::Query(nodes) => {
            if nodes.is_empty() {
                return Err(FragError::EmptyParens);
            }
            if let [only] = nodes.as_slice() {
                return parens(only.clone(), force);
            }
        }
        Node::Parens {
            content,
            force: prior,
        } => {
            // A forced wrap satisfies any request; only upgrading
            // non-forced to forced needs a rebuild.
            if *prior || !force {
                return Ok(fragment.clone());
            }
            return Ok(Fragment::new(Node::Parens {
                content: content.clone(),
                force: true,
            }));
        }
        Node::Indent(inner) => {
            if let Node::Query(children) = &*inner.node {
                if let [only] = children.as_slice() {
                    if let Node::Parens {
                        content,
                        force: false,
                    } = &*only.node
                    {
                        return Ok(Fragment::new(Node::Parens {
                            content: content.clone(),
                            force,
                        }));
                    }
                }
            }
        }
        _ => {}
    }
    Ok(Fragment::new(Node::Parens {
        content: fragment,
        force,
    }))
}

/// Declare that two symbols must render to the same alias.
///
/// Emits no text itself. Safe to place before either symbol has been seen;
/// compilation fails only if both already hold different aliases by the time
/// this node is reached.
pub fn symbol_alias(a: &SqlSymbol, b: &SqlSymbol) -> Fragment {
    Fragment::new(Node::SymbolAlias(a.clone(), b.clone()))
}

/// A compile-time substitution point keyed by `symbol`.
///
/// Resolved through the `placeholder_values` map of
/// [`CompileOptions`](crate::CompileOptions); when the caller supplies no
/// value, `fallback` is rendered instead. Compilation fails when both are
/// absent.
pub fn placeholder(symbol: &SqlSymbol, fallback: Option<Fragment>) -> Fragment {
    Fragment::new(Node::Placeholder {
        symbol: symbol.clone(),
        fallback,
    })
}

/// Compose interleaved trusted text and fragments.
///
/// The text pieces are `&'static str` — source literals, trusted by origin —
/// so no warning fires for them. Zero pieces yield the blank fragment and a
/// lone text piece is served from the template cache. Most callers want the
/// [`sql!`](crate::sql) macro instead.
pub fn template<I>(pieces: I) -> Fragment
where
    I: IntoIterator<Item = Piece>,
{
    let mut iter = pieces.into_iter();
    let Some(first) = iter.next() else {
        return blank();
    };
    let Some(second) = iter.next() else {
        return match first {
            Piece::Text(text) => intern_template_text(text),
            Piece::Fragment(fragment) => fragment,
        };
    };

    let mut nodes = Vec::new();
    let rest = [first, second].into_iter().chain(iter);
    for piece in rest {
        match piece {
            Piece::Text("") => {}
            Piece::Text(text) => nodes.push(intern_raw(text)),
            Piece::Fragment(fragment) => fragment.flatten_into(&mut nodes),
        }
    }
    Fragment::new(Node::Query(nodes))
}

/// Compose a SQL fragment from interleaved text literals and fragments.
///
/// Each argument converts through [`Piece`]: string literals are trusted
/// text, everything else must already be a [`Fragment`].
///
/// # Example
/// ```
/// let frag = pgfrag::sql!(
///     "select ",
///     pgfrag::identifier(["users", "id"])?,
///     " from ",
///     pgfrag::identifier(["users"])?,
/// );
/// let compiled = pgfrag::compile(&frag, &Default::default())?;
/// assert_eq!(compiled.text, r#"select "users"."id" from "users""#);
/// # Ok::<(), pgfrag::FragError>(())
/// ```
#[macro_export]
macro_rules! sql {
    () => {
        $crate::blank()
    };
    ($($piece:expr),+ $(,)?) => {
        $crate::template([$($crate::Piece::from($piece)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile::{CompileOptions, compile};

    fn text_of(fragment: &Fragment) -> String {
        compile(fragment, &CompileOptions::default()).unwrap().text
    }

    #[test]
    fn raw_is_interned_by_text() {
        let a = raw("select 1");
        let b = raw("select 1");
        assert!(a.same_as(&b));
    }

    #[test]
    fn literal_booleans_and_null_are_singletons() {
        assert!(literal(true).unwrap().same_as(&sql_true()));
        assert!(literal(false).unwrap().same_as(&sql_false()));
        assert!(literal(None::<i64>).unwrap().same_as(&sql_null()));
    }

    #[test]
    fn literal_inlines_benign_strings() {
        assert_eq!(text_of(&literal("hello").unwrap()), "'hello'");
        assert_eq!(text_of(&literal("a-b_c@d!e$f:g.h").unwrap()), "'a-b_c@d!e$f:g.h'");
    }

    #[test]
    fn literal_parameterizes_hostile_strings() {
        let compiled = compile(&literal("it's").unwrap(), &CompileOptions::default()).unwrap();
        assert_eq!(compiled.text, "$1");
        assert_eq!(compiled.values, vec![Scalar::Text("it's".to_string())]);
    }

    #[test]
    fn literal_inlines_numbers() {
        assert_eq!(text_of(&literal(42_i64).unwrap()), "42");
        assert_eq!(text_of(&literal(-7_i64).unwrap()), "-7");
        assert_eq!(text_of(&literal(3.0_f64).unwrap()), "3");
        assert_eq!(text_of(&literal(0.5_f64).unwrap()), "'0.5'::float");
    }

    #[test]
    fn literal_rejects_non_finite_numbers() {
        assert!(literal(f64::NAN).is_err());
        assert!(literal(f64::INFINITY).is_err());
    }

    #[test]
    fn value_rejects_non_finite_numbers() {
        assert!(value(f64::NAN).is_err());
        assert!(value(vec![1.0_f64, f64::INFINITY]).is_err());
    }

    #[test]
    fn join_of_nothing_is_blank() {
        assert!(join([], ", ").is_blank());
    }

    #[test]
    fn join_of_one_is_identity() {
        let item = value(1).unwrap();
        let joined = join([item.clone()], ", ");
        assert!(joined.same_as(&item));
    }

    #[test]
    fn join_inlines_query_items() {
        let inner = sql!("a", "b");
        let joined = join([inner, raw("c")], " / ");
        assert_eq!(text_of(&joined), "ab / c");
    }

    #[test]
    fn join_without_separator_concatenates() {
        let joined = join([raw("a"), raw("b")], "");
        assert_eq!(text_of(&joined), "ab");
    }

    #[test]
    fn parens_rejects_blank() {
        assert!(matches!(
            parens(crate::blank(), false),
            Err(FragError::EmptyParens)
        ));
    }

    #[test]
    fn parens_unwraps_singleton_queries() {
        let inner = value(7).unwrap();
        let singleton = Fragment::new(Node::Query(vec![inner.clone()]));
        let wrapped = parens(singleton, false).unwrap();
        // The Query shell is recursed into, so the result wraps the Value
        // itself.
        assert!(matches!(
            wrapped.node(),
            Node::Parens { content, force: false } if content.same_as(&inner)
        ));
    }

    #[test]
    fn parens_is_idempotent() {
        let once = parens(sql!("a", " = ", "b"), false).unwrap();
        let twice = parens(once.clone(), false).unwrap();
        assert!(once.same_as(&twice));
    }

    #[test]
    fn parens_keeps_forced_wrapping() {
        let forced = parens(raw("x"), true).unwrap();
        let again = parens(forced.clone(), false).unwrap();
        assert!(forced.same_as(&again));
    }

    #[test]
    fn parens_upgrades_to_forced() {
        let soft = parens(sql!("a", " = ", "b"), false).unwrap();
        let hard = parens(soft, true).unwrap();
        assert!(matches!(hard.node(), Node::Parens { force: true, .. }));
    }

    #[test]
    fn template_empty_is_blank_singleton() {
        assert!(sql!().same_as(&crate::blank()));
    }

    #[test]
    fn template_single_text_is_cached() {
        let a = sql!("select count(*) from t");
        let b = sql!("select count(*) from t");
        assert!(a.same_as(&b));
    }

    #[test]
    fn template_single_fragment_is_identity() {
        let v = value(1).unwrap();
        assert!(sql!(&v).same_as(&v));
    }

    #[test]
    fn template_flattens_nested_queries() {
        let inner = sql!("b", "c");
        let outer = sql!("a", inner, "d");
        let Node::Query(nodes) = outer.node() else {
            panic!("expected a query");
        };
        assert_eq!(nodes.len(), 4);
        assert!(nodes.iter().all(|n| !matches!(n.node(), Node::Query(_))));
    }

    #[test]
    fn identifier_requires_parts() {
        assert!(matches!(
            identifier(Vec::<&str>::new()),
            Err(FragError::EmptyIdentifier)
        ));
    }
}
