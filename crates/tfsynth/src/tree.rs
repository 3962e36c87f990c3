//! construct tree contract
//!
//! The synthesizer does not own the tree. It only needs every node to list its children and to tell whether it
//! contributes a fragment to the document.
use crate::merge::deep_merge;
use crate::value::Value;

/// A node that contributes to the synthesized document
pub trait Contributor {
    /// Called at most once per synthesis
    fn to_fragment(&self) -> Value;
}

pub trait Node {
    fn id(&self) -> &str;

    /// Children in declaration order
    fn children(&self) -> Vec<&dyn Node> {
        vec![]
    }

    /// `Some` if this node contributes a fragment
    fn contributor(&self) -> Option<&dyn Contributor> {
        None
    }
}

/// Merge the fragments of `node` and all its descendants into `document`
///
/// Depth-first, pre-order: a node's own fragment is merged before the fragments of its children.
#[tracing::instrument(level = "trace", skip_all, fields(node = node.id()))]
pub fn collect_fragments(node: &dyn Node, document: &mut Value) {
    if let Some(contributor) = node.contributor() {
        deep_merge(document, contributor.to_fragment());
        tracing::trace!("fragment merged");
    }

    for child in node.children() {
        collect_fragments(child, document);
    }
}

/// A general purpose tree node with an optional fixed fragment
#[derive(Debug, Clone)]
pub struct Construct {
    id: String,
    fragment: Option<Value>,
    children: Vec<Construct>,
}

impl Construct {
    /// A node that only groups its children
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fragment: None,
            children: vec![],
        }
    }

    pub fn with_fragment(id: impl Into<String>, fragment: impl Into<Value>) -> Self {
        Self {
            fragment: Some(fragment.into()),
            ..Self::new(id)
        }
    }

    pub fn add_child(&mut self, child: Construct) -> &mut Self {
        self.children.push(child);
        self
    }

    /// Builder style [Construct::add_child]
    pub fn child(mut self, child: Construct) -> Self {
        self.children.push(child);
        self
    }
}

impl Contributor for Construct {
    fn to_fragment(&self) -> Value {
        self.fragment.clone().unwrap_or_else(Value::object)
    }
}

impl Node for Construct {
    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&dyn Node> {
        self.children.iter().map(|child| child as &dyn Node).collect()
    }

    fn contributor(&self) -> Option<&dyn Contributor> {
        self.fragment.as_ref().map(|_| self as &dyn Contributor)
    }
}
