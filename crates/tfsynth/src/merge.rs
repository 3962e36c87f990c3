//! merging document fragments
use crate::value::Value;
use indexmap::IndexMap;

/// Deep merge `src` into `dst`
///
/// - objects: union of keys, shared keys are merged recursively, new keys are appended in `src` order
/// - arrays: `src` is appended to `dst`
/// - anything else: `src` replaces `dst`
pub fn deep_merge(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Object(dst), Value::Object(src)) => {
            for (key, src_value) in src {
                match dst.get_mut(&key) {
                    Some(dst_value) => deep_merge(dst_value, src_value),
                    None => {
                        dst.insert(key, src_value);
                    }
                }
            }
        }
        (Value::Array(dst), Value::Array(src)) => dst.extend(src),
        (dst, src) => *dst = src,
    }
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum OverrideError {
    #[error("override path must not be empty")]
    EmptyPath,
    #[error("override path {path:?} contains an empty segment")]
    EmptySegment { path: String },
}

/// Raw overrides, applied on top of the synthesized document
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    root: IndexMap<String, Value>,
}

impl Overrides {
    /// Set `value` at the dotted `path`
    ///
    /// Intermediate values that are not objects are replaced by empty objects. Later calls win.
    #[tracing::instrument(level = "trace", skip(self, value))]
    pub fn add(&mut self, path: &str, value: impl Into<Value>) -> Result<(), OverrideError> {
        if path.is_empty() {
            return Err(OverrideError::EmptyPath);
        }

        let segments: Vec<&str> = path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(OverrideError::EmptySegment {
                path: path.to_string(),
            });
        }

        let Some((last, parents)) = segments.split_last() else {
            return Err(OverrideError::EmptyPath);
        };

        let mut current = &mut self.root;
        for key in parents {
            current = child_object(current, key);
        }
        current.insert(last.to_string(), value.into());

        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// The override tree as a mergeable value
    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }
}

fn child_object<'m>(
    map: &'m mut IndexMap<String, Value>,
    key: &str,
) -> &'m mut IndexMap<String, Value> {
    let slot = map.entry(key.to_string()).or_insert_with(Value::object);
    if !matches!(slot, Value::Object(_)) {
        tracing::trace!(key, "replacing non-object with object");
        *slot = Value::object();
    }

    match slot {
        Value::Object(object) => object,
        _ => unreachable!("slot was just made an object"),
    }
}
