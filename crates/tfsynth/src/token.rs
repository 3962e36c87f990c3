//! deferred values and the token side table
//!
//! A [Deferred] stands in for a value that is only known after terraform planned/applied the configuration (for
//! example the id of a resource). It carries a unique [DeferredId] and a rule that produces its replacement during
//! synthesis. Two deferred values are the same unknown if and only if their ids are equal.
//!
//! Deferred values and expressions can be placed anywhere a [Value] is expected. Strings are the exception: to mix a
//! deferred value into ordinary text it is registered in a [TokenRegistry], which hands out a marker string:
//!
//! ```
//! use tfsynth::expression::reference;
//! use tfsynth::token::TokenRegistry;
//!
//! let tokens = TokenRegistry::new();
//! let text = format!("arn of bucket: {}", tokens.as_string(reference("aws_s3_bucket.b.arn")));
//! ```
//!
//! Markers are built from code points of the unicode private use area, `U+E000 <registry>.<index> U+E001`, and are
//! only meaningful to the registry that created them.
use crate::expression;
use crate::value::Value;
use std::cell::RefCell;
use std::fmt::{Debug, Display, Formatter};
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

const MARKER_START: char = '\u{E000}';
const MARKER_END: char = '\u{E001}';

/// Unique identifier of a [Deferred]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DeferredId(usize);

impl DeferredId {
    fn next() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for DeferredId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "deferred#{}", self.0)
    }
}

/// Identity of one synthesis scope (a stack)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ScopeId(usize);

impl ScopeId {
    pub fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ScopeId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ScopeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "scope#{}", self.0)
    }
}

/// What a deferred rule can see while it runs
#[derive(Debug, Clone, Copy, derive_new::new)]
pub struct ResolveContext {
    scope: ScopeId,
}

impl ResolveContext {
    /// The scope that is currently being synthesized
    pub fn scope(&self) -> ScopeId {
        self.scope
    }
}

type Rule = dyn Fn(&ResolveContext) -> Value;

/// A value that is not known yet
#[derive(Clone)]
pub struct Deferred {
    id: DeferredId,
    origin: Option<ScopeId>,
    rule: Rc<Rule>,
}

impl Deferred {
    /// A deferred value that may be resolved in any scope
    pub fn new(rule: impl Fn(&ResolveContext) -> Value + 'static) -> Self {
        Self {
            id: DeferredId::next(),
            origin: None,
            rule: Rc::new(rule),
        }
    }

    /// A deferred value that belongs to `origin`
    ///
    /// Resolving it in any other scope goes through a [crate::resolve::CrossScopeBridge].
    pub fn scoped(origin: ScopeId, rule: impl Fn(&ResolveContext) -> Value + 'static) -> Self {
        Self {
            origin: Some(origin),
            ..Self::new(rule)
        }
    }

    /// A deferred attribute of `origin` that resolves to a bare reference
    pub fn reference(origin: ScopeId, path: impl Into<String>) -> Self {
        let path = path.into();
        Self::scoped(origin, move |_| expression::reference(path.clone()).into())
    }

    pub fn id(&self) -> DeferredId {
        self.id
    }

    pub fn origin(&self) -> Option<ScopeId> {
        self.origin
    }

    /// Run the resolution rule
    pub(crate) fn produce(&self, context: &ResolveContext) -> Value {
        (self.rule)(context)
    }
}

impl PartialEq for Deferred {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Debug for Deferred {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deferred")
            .field("id", &self.id)
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Side table from string markers to the values they stand for
///
/// Append-only. Entries are never removed, so a marker stays valid as long as its registry lives.
#[derive(Debug)]
pub struct TokenRegistry {
    id: usize,
    entries: RefCell<Vec<Value>>,
}

impl TokenRegistry {
    pub fn new() -> Self {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        Self {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            entries: Default::default(),
        }
    }

    /// Register `value` and return a marker string that can be embedded in text
    pub fn as_string(&self, value: impl Into<Value>) -> String {
        let mut entries = self.entries.borrow_mut();
        let index = entries.len();
        entries.push(value.into());
        tracing::trace!(registry = self.id, index, "token registered");

        format!("{MARKER_START}{}.{index}{MARKER_END}", self.id)
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up the inner part of a marker (as yielded by [split_markers])
    pub(crate) fn lookup(&self, marker: &str) -> Option<Value> {
        let (registry, index) = marker.split_once('.')?;
        if registry.parse::<usize>().ok()? != self.id {
            return None;
        }

        let index: usize = index.parse().ok()?;
        self.entries.borrow().get(index).cloned()
    }
}

impl Default for TokenRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Part of a string as seen by the resolver
#[derive(Debug, PartialEq)]
pub(crate) enum Piece<'s> {
    Literal(&'s str),
    /// inner part of a marker, without the delimiting code points
    Marker(&'s str),
}

/// Split `text` into literal text and markers
///
/// Returns `None` when `text` contains no (complete) marker. An unterminated marker start is kept as literal text.
pub(crate) fn split_markers(text: &str) -> Option<Vec<Piece<'_>>> {
    if !text.contains(MARKER_START) {
        return None;
    }

    let mut pieces = vec![];
    let mut rest = text;
    let mut found = false;

    while let Some(start) = rest.find(MARKER_START) {
        let after_start = &rest[start + MARKER_START.len_utf8()..];
        let Some(end) = after_start.find(MARKER_END) else {
            break;
        };

        if start > 0 {
            pieces.push(Piece::Literal(&rest[..start]));
        }
        pieces.push(Piece::Marker(&after_start[..end]));
        found = true;

        rest = &after_start[end + MARKER_END.len_utf8()..];
    }

    if !rest.is_empty() {
        pieces.push(Piece::Literal(rest));
    }

    found.then_some(pieces)
}
