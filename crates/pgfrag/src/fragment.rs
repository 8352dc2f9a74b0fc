//! The fragment tree.
//!
//! [`Fragment`] is the only currency of this crate: every constructor returns
//! one and every consumer takes one. The node enum behind it is private, so a
//! fragment can only come out of this crate's constructors — that privacy is
//! the injection barrier. A bare user string cannot appear at a fragment
//! position; it has to pass through a constructor that escapes, parameterizes,
//! or (for [`raw`](crate::raw)) explicitly vouches for it.
//!
//! Fragments are immutable and cheap to clone (one `Arc` bump). They
//! deliberately implement neither `Serialize` nor `Deserialize`: a fragment
//! cannot cross a serialization boundary and come back trusted.

use std::fmt;
use std::sync::Arc;

use crate::ident::IdentPart;
use crate::scalar::Scalar;
use crate::symbol::SqlSymbol;

/// A trusted piece of SQL.
#[derive(Clone)]
pub struct Fragment {
    pub(crate) node: Arc<Node>,
}

/// The closed set of fragment shapes.
///
/// `Query` holds no `Query` children; composition flattens on insertion.
#[derive(Debug)]
pub(crate) enum Node {
    /// Verbatim SQL text.
    Raw(String),
    /// A bound parameter, compiled to `$n`.
    Value(Scalar),
    /// A dotted identifier.
    Identifier(Vec<IdentPart>),
    /// Pretty-print marker, semantically transparent.
    Indent(Fragment),
    /// Conditional parenthesization.
    Parens { content: Fragment, force: bool },
    /// Two symbols that must render to the same alias.
    SymbolAlias(SqlSymbol, SqlSymbol),
    /// Compile-time substitution point.
    Placeholder {
        symbol: SqlSymbol,
        fallback: Option<Fragment>,
    },
    /// Flat ordered sequence of non-Query nodes.
    Query(Vec<Fragment>),
}

impl Fragment {
    pub(crate) fn new(node: Node) -> Self {
        Fragment {
            node: Arc::new(node),
        }
    }

    pub(crate) fn node(&self) -> &Node {
        &self.node
    }

    /// Pointer identity: true when both handles share one node.
    ///
    /// Interned fragments (raw text, singletons, cached templates) compare
    /// true here across independent call sites.
    pub fn same_as(&self, other: &Fragment) -> bool {
        Arc::ptr_eq(&self.node, &other.node)
    }

    /// True for the empty fragment.
    pub fn is_blank(&self) -> bool {
        matches!(&*self.node, Node::Query(nodes) if nodes.is_empty())
    }

    /// Append this fragment to `out`, inlining Query children.
    pub(crate) fn flatten_into(&self, out: &mut Vec<Fragment>) {
        match &*self.node {
            Node::Query(nodes) => out.extend(nodes.iter().cloned()),
            _ => out.push(self.clone()),
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.node, f)
    }
}

/// One slot of the template composer.
///
/// Text pieces must be `&'static str`: a static string is a source-code
/// literal, which is what makes it trusted by origin at call time. Runtime
/// strings have to go through [`raw`](crate::raw) (dangerous, warns) or a
/// safe constructor.
#[derive(Debug, Clone)]
pub enum Piece {
    /// Trusted text known at call time.
    Text(&'static str),
    /// An already-built fragment.
    Fragment(Fragment),
}

impl From<&'static str> for Piece {
    fn from(text: &'static str) -> Self {
        Piece::Text(text)
    }
}

impl From<Fragment> for Piece {
    fn from(fragment: Fragment) -> Self {
        Piece::Fragment(fragment)
    }
}

impl From<&Fragment> for Piece {
    fn from(fragment: &Fragment) -> Self {
        Piece::Fragment(fragment.clone())
    }
}
