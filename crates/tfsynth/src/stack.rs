//! stacks: the unit of synthesis
//!
//! A [Stack] is the root of a construct tree and produces exactly one terraform json document. Synthesis runs in
//! three steps:
//!
//! 1. walk the tree and deep merge all fragments ([crate::tree::collect_fragments])
//! 2. deep merge the raw overrides on top ([crate::merge::Overrides])
//! 3. resolve all deferred values and expressions ([crate::resolve::Resolver])
use crate::merge::{deep_merge, OverrideError, Overrides};
use crate::render::RenderOptions;
use crate::resolve::{CrossScopeBridge, ResolveError, Resolver};
use crate::token::{ScopeId, TokenRegistry};
use crate::tree::{collect_fragments, Node};
use crate::value::Value;

pub struct Stack {
    id: String,
    scope: ScopeId,
    tokens: TokenRegistry,
    constructs: Vec<Box<dyn Node>>,
    overrides: Overrides,
    bridge: Option<Box<dyn CrossScopeBridge>>,
    options: RenderOptions,
}

#[derive(thiserror::Error, Debug)]
pub enum SynthError {
    #[error("Unable to resolve stack {stack}")]
    Resolve {
        stack: String,
        #[source]
        source: ResolveError,
    },
    #[error("Unable to serialize stack {stack}")]
    Serialize {
        stack: String,
        #[source]
        source: serde_json::Error,
    },
}

impl Stack {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scope: ScopeId::new(),
            tokens: TokenRegistry::new(),
            constructs: vec![],
            overrides: Default::default(),
            bridge: None,
            options: Default::default(),
        }
    }

    pub fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Registry for embedding deferred values in strings of this stack
    pub fn tokens(&self) -> &TokenRegistry {
        &self.tokens
    }

    pub fn add(&mut self, node: impl Node + 'static) -> &mut Self {
        self.constructs.push(Box::new(node));
        self
    }

    /// Override the synthesized document at a dotted path
    ///
    /// Overrides are deep merged like fragments: scalars and objects replace or extend what is there, but an array
    /// is appended to an array already present at the same path.
    ///
    /// ```
    /// # use tfsynth::stack::Stack;
    /// let mut stack = Stack::new("example");
    /// stack.add_override("terraform.backend.local.path", "state.tfstate").unwrap();
    /// ```
    pub fn add_override(&mut self, path: &str, value: impl Into<Value>) -> Result<(), OverrideError> {
        self.overrides.add(path, value)
    }

    pub fn set_bridge(&mut self, bridge: impl CrossScopeBridge + 'static) -> &mut Self {
        self.bridge = Some(Box::new(bridge));
        self
    }

    pub fn set_options(&mut self, options: RenderOptions) -> &mut Self {
        self.options = options;
        self
    }

    /// File name of the synthesized document
    pub fn artifact_file(&self) -> String {
        format!("{}.tf.json", self.id)
    }

    /// Synthesize the document
    #[tracing::instrument(level = "debug", skip_all, fields(stack = %self.id))]
    pub fn to_document(&self) -> Result<serde_json::Value, ResolveError> {
        let mut document = Value::object();
        collect_fragments(self, &mut document);

        if !self.overrides.is_empty() {
            tracing::debug!("applying overrides");
            deep_merge(&mut document, self.overrides.to_value());
        }

        let mut resolver = Resolver::new(self.scope, &self.tokens, &self.options);
        if let Some(bridge) = &self.bridge {
            resolver = resolver.with_bridge(bridge.as_ref());
        }

        resolver.resolve(&document)
    }

    /// Synthesize the document as two-space indented json
    pub fn to_json(&self) -> Result<String, SynthError> {
        let document = self.to_document().map_err(|source| SynthError::Resolve {
            stack: self.id.clone(),
            source,
        })?;

        serde_json::to_string_pretty(&document).map_err(|source| SynthError::Serialize {
            stack: self.id.clone(),
            source,
        })
    }
}

impl Node for Stack {
    fn id(&self) -> &str {
        &self.id
    }

    fn children(&self) -> Vec<&dyn Node> {
        self.constructs
            .iter()
            .map(|node| node.as_ref() as &dyn Node)
            .collect()
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .field("constructs", &self.constructs.len())
            .field("overrides", &self.overrides)
            .field("bridged", &self.bridge.is_some())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::element::{Output, Resource};
    use crate::expression::{call, reference};
    use crate::resolve::{BridgeError, BridgeRequest};
    use crate::tree::Construct;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn overrides_replace_synthesized_values() {
        let mut stack = Stack::new("main");
        stack.add(Construct::with_fragment(
            "element",
            json!({"resource": {"type_a": {"id1": {"attr": 5}}}}),
        ));
        stack.add_override("resource.type_a.id1.attr", 6).unwrap();

        assert_eq!(
            stack.to_document().unwrap(),
            json!({"resource": {"type_a": {"id1": {"attr": 6}}}})
        );
    }

    #[test]
    fn overrides_create_missing_paths() {
        let mut stack = Stack::new("main");
        stack.add(Construct::with_fragment("element", json!({"resource": {}})));
        stack.add_override("terraform.required_version", ">= 1.0").unwrap();

        assert_eq!(
            stack.to_document().unwrap(),
            json!({"resource": {}, "terraform": {"required_version": ">= 1.0"}})
        );
    }

    #[test]
    fn overrides_win_over_deferred_values() {
        let mut stack = Stack::new("main");
        let mut bucket = Resource::new(stack.scope(), "aws_s3_bucket", "b");
        bucket.set("bucket", reference("var.name"));
        stack.add(bucket);
        stack
            .add_override("resource.aws_s3_bucket.b.bucket", "fixed")
            .unwrap();

        assert_eq!(
            stack.to_document().unwrap(),
            json!({"resource": {"aws_s3_bucket": {"b": {"bucket": "fixed"}}}})
        );
    }

    #[test]
    fn array_overrides_append() {
        let mut stack = Stack::new("main");
        stack.add(Construct::with_fragment(
            "element",
            json!({"provider": {"aws": [{"region": "a"}]}}),
        ));
        stack
            .add_override("provider.aws", json!([{"region": "b"}]))
            .unwrap();

        assert_eq!(
            stack.to_document().unwrap(),
            json!({"provider": {"aws": [{"region": "a"}, {"region": "b"}]}})
        );
    }

    #[test]
    fn markers_in_keys_are_resolved() {
        let mut stack = Stack::new("main");
        let key = stack.tokens().as_string(reference("var.key"));
        stack.add(Construct::with_fragment(
            "element",
            Value::from_iter([("locals", Value::from_iter([(key, 1)]))]),
        ));

        let json = stack.to_json().unwrap();
        assert!(!json.contains('\u{E000}'));
        assert_eq!(
            stack.to_document().unwrap(),
            json!({"locals": {"${var.key}": 1}})
        );
    }

    #[test]
    fn repeated_blocks_accumulate() {
        let mut stack = Stack::new("main");
        stack
            .add(Construct::with_fragment("one", json!({"provider": {"aws": [{"region": "a"}]}})))
            .add(Construct::with_fragment("two", json!({"provider": {"aws": [{"region": "b"}]}})));

        assert_eq!(
            stack.to_document().unwrap(),
            json!({"provider": {"aws": [{"region": "a"}, {"region": "b"}]}})
        );
    }

    #[test]
    fn resources_reference_each_other() {
        let mut stack = Stack::new("source");
        let mut int = Resource::new(stack.scope(), "random_integer", "int");
        int.set("min", 0).set("max", 6);
        let result = int.attribute("result");

        let mut file = Resource::new(stack.scope(), "local_file", "num");
        file.set("filename", "../num")
            .set("content", stack.tokens().as_string(result.clone()))
            .set("description", format!("value: {}", stack.tokens().as_string(result)));

        stack.add(int).add(file);

        assert_eq!(
            stack.to_json().unwrap(),
            r#"{
  "resource": {
    "random_integer": {
      "int": {
        "min": 0,
        "max": 6
      }
    },
    "local_file": {
      "num": {
        "filename": "../num",
        "content": "${random_integer.int.result}",
        "description": "value: ${random_integer.int.result}"
      }
    }
  }
}"#
        );
    }

    #[test]
    fn synthesis_is_deterministic() {
        let mut stack = Stack::new("main");
        let mut resource = Resource::new(stack.scope(), "null_resource", "n");
        resource.set("triggers", json!({"z": 1, "a": 2, "m": 3}));
        stack.add(resource);
        stack.add(Output::new("sum", call("sum", vec![vec![1, 2].into()])));

        assert_eq!(stack.to_json().unwrap(), stack.to_json().unwrap());
        assert!(stack.to_json().unwrap().find("\"z\"") < stack.to_json().unwrap().find("\"a\""));
    }

    #[test]
    fn artifact_file_name() {
        assert_eq!(Stack::new("source").artifact_file(), "source.tf.json");
    }

    struct RemoteState {
        origin: ScopeId,
    }

    impl CrossScopeBridge for RemoteState {
        fn bridge(&self, request: BridgeRequest<'_>) -> Result<Value, BridgeError> {
            if request.origin != self.origin {
                return Err("unknown origin".into());
            }
            Ok(reference("data.terraform_remote_state.source.outputs.num").into())
        }
    }

    #[test]
    fn cross_stack_references_go_through_the_bridge() {
        let source = Stack::new("source");
        let int = Resource::new(source.scope(), "random_integer", "int");

        let mut consumer = Stack::new("consumer");
        consumer.add(Output::new("num", int.attribute("result")));

        let error = consumer.to_json().expect_err("no bridge configured");
        assert!(matches!(
            error,
            SynthError::Resolve {
                source: ResolveError::Unbridged { .. },
                ..
            }
        ));

        consumer.set_bridge(RemoteState {
            origin: source.scope(),
        });
        assert_eq!(
            consumer.to_document().unwrap(),
            json!({"output": {"num": {"value": "${data.terraform_remote_state.source.outputs.num}"}}})
        );
    }
}
