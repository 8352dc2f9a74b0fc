//! Structural equivalence of fragments.
//!
//! Used upstream for query deduplication and memoization: two fragments that
//! compile identically should compare equivalent without compiling them.
//! Equivalence is parameterized by a symbol substitution map, so a query
//! built around one symbol can be recognized as the same query built around
//! another.

use std::collections::HashMap;

use crate::error::{FragError, FragResult};
use crate::fragment::{Fragment, Node};
use crate::ident::IdentPart;
use crate::symbol::SqlSymbol;

/// Substitution chains longer than this are assumed to be cyclic.
const MAX_SUBSTITUTION_HOPS: usize = 1000;

/// A mapping that treats one symbol as another for equivalence purposes.
#[derive(Debug, Clone, Default)]
pub struct SymbolSubstitutions {
    map: HashMap<SqlSymbol, SqlSymbol>,
}

impl SymbolSubstitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `from` as `to`. Chains are allowed (a to b, b to c); cycles and
    /// self-loops are detected at resolution time.
    pub fn insert(&mut self, from: &SqlSymbol, to: &SqlSymbol) {
        self.map.insert(from.clone(), to.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Follow the substitution chain for `symbol` to its fixed point.
    fn resolve(&self, symbol: &SqlSymbol) -> FragResult<SqlSymbol> {
        let mut current = symbol.clone();
        for _ in 0..MAX_SUBSTITUTION_HOPS {
            match self.map.get(&current) {
                None => return Ok(current),
                Some(next) if next == &current => {
                    return Err(FragError::SelfSubstitution {
                        symbol: current.description().to_string(),
                    });
                }
                Some(next) => current = next.clone(),
            }
        }
        Err(FragError::SubstitutionCycle {
            symbol: symbol.description().to_string(),
        })
    }
}

/// Structural equality of two fragments up to symbol substitution.
///
/// Pointer-identical fragments short-circuit to true. `SymbolAlias` nodes
/// never compare equal by value — an alias declaration is an instruction to
/// the compiler, not a piece of SQL with an identity of its own.
pub fn is_equivalent(
    a: &Fragment,
    b: &Fragment,
    substitutions: &SymbolSubstitutions,
) -> FragResult<bool> {
    if a.same_as(b) {
        return Ok(true);
    }

    match (a.node(), b.node()) {
        (Node::Query(xs), Node::Query(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                if !is_equivalent(x, y, substitutions)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (Node::Raw(x), Node::Raw(y)) => Ok(x == y),
        (Node::Value(x), Node::Value(y)) => Ok(x == y),
        (Node::Indent(x), Node::Indent(y)) => is_equivalent(x, y, substitutions),
        (
            Node::Parens {
                content: x,
                force: fx,
            },
            Node::Parens {
                content: y,
                force: fy,
            },
        ) => Ok(fx == fy && is_equivalent(x, y, substitutions)?),
        (Node::Identifier(xs), Node::Identifier(ys)) => {
            if xs.len() != ys.len() {
                return Ok(false);
            }
            for (x, y) in xs.iter().zip(ys) {
                let same = match (x, y) {
                    (IdentPart::Name(nx), IdentPart::Name(ny)) => nx == ny,
                    (IdentPart::Symbol(sx), IdentPart::Symbol(sy)) => {
                        sx.description() == sy.description()
                            && symbols_match(sx, sy, substitutions)?
                    }
                    _ => false,
                };
                if !same {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (
            Node::Placeholder { symbol: sx, .. },
            Node::Placeholder { symbol: sy, .. },
        ) => symbols_match(sx, sy, substitutions),
        // SymbolAlias nodes and mismatched kinds.
        _ => Ok(false),
    }
}

fn symbols_match(
    a: &SqlSymbol,
    b: &SqlSymbol,
    substitutions: &SymbolSubstitutions,
) -> FragResult<bool> {
    Ok(substitutions.resolve(a)? == substitutions.resolve(b)?)
}
