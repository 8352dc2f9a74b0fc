//! Symbol rewriting with structural sharing.

use crate::fragment::{Fragment, Node};
use crate::ident::IdentPart;
use crate::symbol::SqlSymbol;

/// Return a fragment with every occurrence of `needle` replaced by
/// `replacement`: in identifier parts, indent and parens contents, symbol
/// alias sides, and placeholder symbols and fallbacks. Raw text and values
/// are never touched.
///
/// Untouched subtrees are shared: when nothing changes beneath a node, the
/// original handle comes back.
pub fn replace_symbol(
    fragment: &Fragment,
    needle: &SqlSymbol,
    replacement: &SqlSymbol,
) -> Fragment {
    if needle == replacement {
        return fragment.clone();
    }
    rewrite(fragment, needle, replacement).unwrap_or_else(|| fragment.clone())
}

/// `Some(new)` when the subtree contained the needle, `None` otherwise.
fn rewrite(fragment: &Fragment, needle: &SqlSymbol, replacement: &SqlSymbol) -> Option<Fragment> {
    match fragment.node() {
        Node::Raw(_) | Node::Value(_) => None,
        Node::Identifier(parts) => {
            let hit = parts
                .iter()
                .any(|p| matches!(p, IdentPart::Symbol(s) if s == needle));
            if !hit {
                return None;
            }
            let parts = parts
                .iter()
                .map(|part| match part {
                    IdentPart::Symbol(s) if s == needle => IdentPart::Symbol(replacement.clone()),
                    other => other.clone(),
                })
                .collect();
            Some(Fragment::new(Node::Identifier(parts)))
        }
        Node::Indent(content) => {
            rewrite(content, needle, replacement).map(|c| Fragment::new(Node::Indent(c)))
        }
        Node::Parens { content, force } => rewrite(content, needle, replacement).map(|c| {
            Fragment::new(Node::Parens {
                content: c,
                force: *force,
            })
        }),
        Node::SymbolAlias(a, b) => {
            if a != needle && b != needle {
                return None;
            }
            let pick = |s: &SqlSymbol| {
                if s == needle {
                    replacement.clone()
                } else {
                    s.clone()
                }
            };
            Some(Fragment::new(Node::SymbolAlias(pick(a), pick(b))))
        }
        Node::Placeholder { symbol, fallback } => {
            let new_fallback = fallback
                .as_ref()
                .and_then(|f| rewrite(f, needle, replacement));
            if symbol != needle && new_fallback.is_none() {
                return None;
            }
            Some(Fragment::new(Node::Placeholder {
                symbol: if symbol == needle {
                    replacement.clone()
                } else {
                    symbol.clone()
                },
                fallback: new_fallback.or_else(|| fallback.clone()),
            }))
        }
        Node::Query(nodes) => {
            let mut changed = false;
            let mut out = Vec::with_capacity(nodes.len());
            for node in nodes {
                match rewrite(node, needle, replacement) {
                    Some(new) => {
                        changed = true;
                        out.push(new);
                    }
                    None => out.push(node.clone()),
                }
            }
            if changed {
                Some(Fragment::new(Node::Query(out)))
            } else {
                None
            }
        }
    }
}
