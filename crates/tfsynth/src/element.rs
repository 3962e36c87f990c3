//! terraform elements
//!
//! Typed tree nodes for the most common top-level terraform blocks. Their attributes are [Deferred] values that
//! belong to the scope the element was created in.
use crate::token::{Deferred, ScopeId};
use crate::tree::{Contributor, Node};
use crate::value::Value;
use indexmap::IndexMap;
use std::cell::RefCell;

/// A `resource "<type>" "<name>"` block
#[derive(Debug, Clone)]
pub struct Resource {
    scope: ScopeId,
    resource_type: String,
    name: String,
    config: IndexMap<String, Value>,
    /// one deferred value per attribute name
    attributes: RefCell<IndexMap<String, Deferred>>,
}

impl Resource {
    pub fn new(scope: ScopeId, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            scope,
            resource_type: resource_type.into(),
            name: name.into(),
            config: IndexMap::new(),
            attributes: Default::default(),
        }
    }

    /// Set a configuration argument
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// `<type>.<name>`
    pub fn address(&self) -> String {
        format!("{}.{}", self.resource_type, self.name)
    }

    /// An attribute that is only known after apply
    pub fn attribute(&self, attribute: &str) -> Deferred {
        self.attributes
            .borrow_mut()
            .entry(attribute.to_string())
            .or_insert_with(|| {
                Deferred::reference(self.scope, format!("{}.{attribute}", self.address()))
            })
            .clone()
    }
}

impl Contributor for Resource {
    fn to_fragment(&self) -> Value {
        let block = Value::from_iter([(self.name.clone(), Value::Object(self.config.clone()))]);
        let by_type = Value::from_iter([(self.resource_type.clone(), block)]);
        Value::from_iter([("resource", by_type)])
    }
}

impl Node for Resource {
    fn id(&self) -> &str {
        &self.name
    }

    fn contributor(&self) -> Option<&dyn Contributor> {
        Some(self)
    }
}

/// An `output "<name>"` block
#[derive(Debug, Clone)]
pub struct Output {
    name: String,
    value: Value,
    sensitive: bool,
}

impl Output {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            sensitive: false,
        }
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

impl Contributor for Output {
    fn to_fragment(&self) -> Value {
        let mut block = IndexMap::from([("value".to_string(), self.value.clone())]);
        if self.sensitive {
            block.insert("sensitive".to_string(), true.into());
        }

        let outputs = Value::from_iter([(self.name.clone(), Value::Object(block))]);
        Value::from_iter([("output", outputs)])
    }
}

impl Node for Output {
    fn id(&self) -> &str {
        &self.name
    }

    fn contributor(&self) -> Option<&dyn Contributor> {
        Some(self)
    }
}
