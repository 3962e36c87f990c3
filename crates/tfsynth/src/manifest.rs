//! collection of stack manifests (json stack descriptions and path to source file)
//!
//! A manifest file holds one stack or an array of stacks:
//!
//! ```json
//! {
//!   "stack": "source",
//!   "constructs": [
//!     { "id": "int", "fragment": { "resource": { "random_integer": { "int": { "max": 6 } } } } },
//!     { "id": "group", "children": [ { "id": "out", "fragment": { "output": { "num": { "value": { "$ref": "random_integer.int.result" } } } } } ] }
//!   ],
//!   "overrides": [ { "path": "resource.random_integer.int.min", "value": 1 } ]
//! }
//! ```
//!
//! Fragments and override values use the [crate::wire] format.
//! [Manifests] tracks the source path of each stack so errors can point to it.
use crate::merge::OverrideError;
use crate::render::RenderOptions;
use crate::stack::Stack;
use crate::token::TokenRegistry;
use crate::tree::Construct;
use crate::wire::{from_wire, WireError};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackManifest {
    pub stack: String,
    #[serde(default)]
    pub constructs: Vec<ConstructManifest>,
    #[serde(default)]
    pub overrides: Vec<OverrideManifest>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConstructManifest {
    pub id: String,
    #[serde(default)]
    pub fragment: Option<serde_json::Value>,
    #[serde(default)]
    pub children: Vec<ConstructManifest>,
}

#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OverrideManifest {
    pub path: String,
    pub value: serde_json::Value,
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ManifestFile {
    Many(Vec<StackManifest>),
    One(StackManifest),
}

#[derive(Default, Debug)]
pub struct Manifests {
    sources: Vec<Source>,
    stacks: Vec<(usize, StackManifest)>,
}

impl Manifests {
    /// Inserts a stack manifest
    pub fn insert(&mut self, manifest: StackManifest, path: impl Into<Option<PathBuf>>) {
        let source_index = self.sources.len();
        self.sources.push(path.into());
        self.stacks.push((source_index, manifest));
    }

    /// Parses `text` (one stack or an array of stacks) and inserts every stack
    pub fn insert_str(
        &mut self,
        text: &str,
        path: impl Into<Option<PathBuf>>,
    ) -> Result<(), LoadError> {
        let source_index = self.sources.len();
        self.sources.push(path.into());

        let stacks = match serde_json::from_str(text)? {
            ManifestFile::Many(stacks) => stacks,
            ManifestFile::One(stack) => vec![stack],
        };

        self.stacks
            .extend(stacks.into_iter().map(|stack| (source_index, stack)));
        Ok(())
    }

    pub fn stacks(&self) -> impl Iterator<Item = SourceStack> {
        self.stacks
            .iter()
            .map(|(source_index, stack)| (&self.sources[*source_index], stack))
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Turn every manifest into a [Stack]
    ///
    /// Stack ids name the artifacts and must be unique.
    pub fn build(&self, options: &RenderOptions) -> Result<Vec<Stack>, LoadError> {
        let mut seen: IndexMap<&str, &Source> = IndexMap::new();
        for (source, manifest) in self.stacks() {
            if let Some(first) = seen.insert(&manifest.stack, source) {
                return Err(LoadError::DuplicateStack {
                    stack: manifest.stack.clone(),
                    first: first.clone(),
                    second: source.clone(),
                });
            }
        }

        self.stacks()
            .map(|(source, manifest)| {
                tracing::debug!(stack = %manifest.stack, source = ?source, "building stack");
                build_stack(manifest, options)
            })
            .collect()
    }
}

fn build_stack(manifest: &StackManifest, options: &RenderOptions) -> Result<Stack, LoadError> {
    let mut stack = Stack::new(&manifest.stack);
    stack.set_options(options.clone());

    let wire_error = |source| LoadError::Wire {
        stack: manifest.stack.clone(),
        source,
    };

    for construct in &manifest.constructs {
        let construct = build_construct(construct, stack.tokens()).map_err(wire_error)?;
        stack.add(construct);
    }

    for entry in &manifest.overrides {
        let value = from_wire(&entry.value, stack.tokens()).map_err(wire_error)?;
        stack
            .add_override(&entry.path, value)
            .map_err(|source| LoadError::Override {
                stack: manifest.stack.clone(),
                source,
            })?;
    }

    Ok(stack)
}

fn build_construct(
    manifest: &ConstructManifest,
    tokens: &TokenRegistry,
) -> Result<Construct, WireError> {
    let mut construct = match &manifest.fragment {
        Some(fragment) => Construct::with_fragment(&manifest.id, from_wire(fragment, tokens)?),
        None => Construct::new(&manifest.id),
    };

    for child in &manifest.children {
        construct.add_child(build_construct(child, tokens)?);
    }

    Ok(construct)
}

impl Manifests {
    pub fn load_file(&mut self, file_path: &Path) -> Result<(), LoadError> {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading file");

        let file_contents = std::fs::read_to_string(&file_path)?;
        self.insert_str(&file_contents, Some(file_path))
    }

    pub fn load_directory(&mut self, dir_path: &Path) -> Result<(), LoadError> {
        let mut any_files_loaded = false;

        let mut file_paths = vec![];
        for dir_entry in std::fs::read_dir(dir_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }

            let is_manifest = dir_entry
                .file_name()
                .to_string_lossy()
                .ends_with("stack.json");
            if !is_manifest {
                continue;
            }

            file_paths.push(dir_entry.path());
        }

        // read_dir order is platform dependent
        file_paths.sort();
        for file_path in file_paths {
            self.load_file(&file_path)?;
            any_files_loaded = true;
        }

        if !any_files_loaded {
            return Err(LoadError::NoFilesFound);
        }

        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub enum LoadError {
    #[error("No files found in directory")]
    NoFilesFound,
    #[error("IO error")]
    IoError(#[from] std::io::Error),
    #[error("Unable to parse manifest")]
    JsonParseFailed(#[from] serde_json::Error),
    #[error("Stack {stack} is defined twice ({first:?} and {second:?})")]
    DuplicateStack {
        stack: String,
        first: Source,
        second: Source,
    },
    #[error("Invalid value in stack {stack}")]
    Wire {
        stack: String,
        #[source]
        source: WireError,
    },
    #[error("Invalid override in stack {stack}")]
    Override {
        stack: String,
        #[source]
        source: OverrideError,
    },
}

/// Utility macro to create [Manifests]
///
/// Create from a single manifest
/// ```
/// # use tfsynth::manifests;
/// manifests!(r#"{"stack": "main"}"#);
/// ```
///
/// Create from multiple manifests (path required)
/// ```
/// # use tfsynth::manifests;
/// manifests! {
///   "one.stack.json" => r#"{"stack": "one"}"#,
///   "two.stack.json" => r#"[{"stack": "two"}, {"stack": "three"}]"#
/// };
/// ```
///
/// # Panic
/// Panics on invalid input
///
/// ```should_panic
/// # use tfsynth::manifests;
/// manifests!(r#"{"not": "a manifest"}"#);
/// ```
#[macro_export]
macro_rules! manifests {
    // single manifest without source
    { $text:expr } => {{
        let mut manifests = $crate::manifest::Manifests::default();
        manifests.insert_str($text, None).expect("manifest must parse");
        manifests
    }};
    // multiple manifests with sources
    { $($source:expr => $text:expr),+ } => {{
        let mut manifests = $crate::manifest::Manifests::default();
        $(
            manifests
                .insert_str($text, Some(::std::path::PathBuf::from($source)))
                .expect("manifest must parse");
        )+

        manifests
    }};
}

pub type Source = Option<PathBuf>;
pub type SourceStack<'a> = (&'a Source, &'a StackManifest);

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn iterators() {
        let manifests = manifests! {
            "a.stack.json" => r#"{"stack": "a"}"#,
            "b.stack.json" => r#"[{"stack": "b"}, {"stack": "c"}]"#
        };

        assert_eq!(manifests.source_count(), 2);
        let names: Vec<_> = manifests
            .stacks()
            .map(|(source, stack)| (source.clone(), stack.stack.clone()))
            .collect();
        assert_eq!(
            names,
            [
                (Some(PathBuf::from("a.stack.json")), "a".to_string()),
                (Some(PathBuf::from("b.stack.json")), "b".to_string()),
                (Some(PathBuf::from("b.stack.json")), "c".to_string()),
            ]
        );
    }

    #[test]
    fn builds_stacks() {
        let manifests = manifests!(
            r#"{
                "stack": "main",
                "constructs": [
                    {"id": "bucket", "fragment": {"resource": {"aws_s3_bucket": {"b": {"bucket": "logs"}}}}},
                    {"id": "outputs", "children": [
                        {"id": "name", "fragment": {"output": {"name": {"value": {"$ref": "aws_s3_bucket.b.bucket"}}}}}
                    ]}
                ],
                "overrides": [{"path": "resource.aws_s3_bucket.b.force_destroy", "value": true}]
            }"#
        );

        let stacks = manifests.build(&RenderOptions::default()).unwrap();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].artifact_file(), "main.tf.json");
        assert_eq!(
            stacks[0].to_document().unwrap(),
            json!({
                "resource": {"aws_s3_bucket": {"b": {"bucket": "logs", "force_destroy": true}}},
                "output": {"name": {"value": "${aws_s3_bucket.b.bucket}"}}
            })
        );
    }

    #[test]
    fn templates_use_the_stack_registry() {
        let manifests = manifests!(
            r#"{"stack": "main", "constructs": [
                {"id": "x", "fragment": {"locals": {"greeting": {"$template": ["hello ", {"$ref": "var.name"}]}}}}
            ]}"#
        );

        let stacks = manifests.build(&RenderOptions::default()).unwrap();
        assert_eq!(
            stacks[0].to_document().unwrap(),
            json!({"locals": {"greeting": "hello ${var.name}"}})
        );
    }

    #[test]
    fn invalid_override_path() {
        let manifests = manifests!(r#"{"stack": "main", "overrides": [{"path": "", "value": 1}]}"#);

        let error = manifests.build(&RenderOptions::default()).unwrap_err();
        assert!(matches!(
            error,
            LoadError::Override {
                source: OverrideError::EmptyPath,
                ..
            }
        ));
    }

    #[test]
    fn invalid_wire_value() {
        let manifests = manifests!(
            r#"{"stack": "main", "constructs": [{"id": "x", "fragment": {"a": {"$what": 1}}}]}"#
        );

        let error = manifests.build(&RenderOptions::default()).unwrap_err();
        assert!(matches!(error, LoadError::Wire { stack, .. } if stack == "main"));
    }

    #[test]
    fn duplicate_stack_ids_are_rejected() {
        let manifests = manifests! {
            "a.stack.json" => r#"{"stack": "main"}"#,
            "b.stack.json" => r#"[{"stack": "other"}, {"stack": "main"}]"#
        };

        let (stack, first, second) = match manifests.build(&RenderOptions::default()) {
            Err(LoadError::DuplicateStack {
                stack,
                first,
                second,
            }) => (stack, first, second),
            other => panic!("expected a duplicate stack error, got {other:?}"),
        };
        assert_eq!(stack, "main");
        assert_eq!(first, Some(PathBuf::from("a.stack.json")));
        assert_eq!(second, Some(PathBuf::from("b.stack.json")));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut manifests = Manifests::default();
        let result = manifests.insert_str(r#"{"stack": "main", "constructz": []}"#, None);
        assert!(matches!(result, Err(LoadError::JsonParseFailed(_))));
    }
}
