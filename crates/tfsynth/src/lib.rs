//! # tfsynth - terraform json synthesis
//!
//! Turns a tree of constructs holding deferred values into terraform json documents.
//!
//! ## Introduction for developers
//!
//! Read this to understand how `tfsynth` works internally.
//!
//! ### Values
//!
//! Everything a construct contributes is a [value::Value]: plain json-like data that may contain two kinds of
//! placeholders at any depth:
//!
//! - a [token::Deferred]: a value that is only known at synthesis time (produced by a rule)
//! - an [expression::Expression]: a terraform expression such as `${aws_instance.web.id}` or `${max(1, 2)}`
//!
//! Strings cannot hold either of them directly. Instead a placeholder is registered in a [token::TokenRegistry]
//! which returns a marker string that can be concatenated like any other text:
//!
//! ```
//! # use tfsynth::{expression::reference, token::TokenRegistry};
//! let tokens = TokenRegistry::new();
//! let name = format!("web-{}", tokens.as_string(reference("var.env")));
//! ```
//!
//! ### Collecting
//!
//! see [tree::collect_fragments]
//!
//! A [stack::Stack] is the root of a tree of [tree::Node]s. Every node that is also a [tree::Contributor] returns a
//! fragment, a partial document such as:
//!
//! ```json
//! { "resource": { "random_integer": { "int": { "min": 0, "max": 6 } } } }
//! ```
//!
//! Fragments are deep merged in pre-order ([merge::deep_merge]):
//!
//! - objects are merged key by key
//! - arrays are concatenated (repeated blocks accumulate)
//! - anything else: the later value wins
//!
//! Raw overrides ([merge::Overrides]) are merged on top last.
//!
//! ### Resolving
//!
//! see [resolve::Resolver]
//!
//! The merged document is walked once more and every placeholder is replaced:
//!
//! | **input**                                | **output**                          |
//! |------------------------------------------|-------------------------------------|
//! | `Expression` (e.g. `mul(2, 3)`)          | `"${(2 * 3)}"`                      |
//! | `Deferred` producing `7`                 | `7`                                 |
//! | string that is exactly one marker        | the resolved value, type preserved  |
//! | string mixing text and markers           | text with `${...}` spliced in       |
//!
//! Deferred values that were created in another stack go through a [resolve::CrossScopeBridge].
//! A deferred value that (transitively) produces itself is reported as a cycle.
//!
//! ### Output
//!
//! [stack::Stack::to_json] serializes the resolved document with two-space indentation. Key order is insertion order.
//!
//! The `tfsynth` binary reads stacks from json manifests ([manifest]) written in the [wire] format.
//!
pub mod element;
pub mod expression;
pub mod manifest;
pub mod merge;
pub mod render;
pub mod resolve;
pub mod stack;
pub mod token;
pub mod tree;
pub mod value;
pub mod wire;
