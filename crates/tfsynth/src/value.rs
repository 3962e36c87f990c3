//! value representation
//!
//! The synthesis input model contains the following data types
//! - null
//! - boolean (true/false)
//! - integer (signed, i64)
//! - decimal (f64)
//! - string (utf-8, may contain token markers, see [crate::token])
//! - array ("list" of values)
//! - object (order-preserving "map"/"dictionary", where the key is of type string)
//! - deferred (a [Deferred] placeholder, resolved during synthesis)
//! - expression (an [Expression] node, rendered during synthesis)
//!
//! Additionally:
//! - every variant may appear at any depth, e.g. a deferred value inside an array inside an object
//! - the resolved output model is [serde_json::Value], which has no room for deferred data
//!
use crate::expression::Expression;
use crate::token::Deferred;
use indexmap::IndexMap;

/// All possible value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    String(String),
    Array(Vec<Value>),
    Object(IndexMap<String, Value>),
    Deferred(Deferred),
    Expression(Box<Expression>),
}

impl Value {
    /// An empty object
    pub fn object() -> Self {
        Value::Object(IndexMap::new())
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Follow a path of object keys
    pub fn pointer<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&Value> {
        path.into_iter()
            .try_fold(self, |current, key| current.as_object()?.get(key))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Integer(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::Array(value.into_iter().map(Into::into).collect())
    }
}

impl<K: ToString, V: Into<Value>> From<IndexMap<K, V>> for Value {
    fn from(value: IndexMap<K, V>) -> Self {
        value.into_iter().collect()
    }
}

impl<K: ToString, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(
            iter.into_iter()
                .map(|(k, v)| (k.to_string(), v.into()))
                .collect(),
        )
    }
}

impl From<Deferred> for Value {
    fn from(value: Deferred) -> Self {
        Value::Deferred(value)
    }
}

impl From<Expression> for Value {
    fn from(value: Expression) -> Self {
        Value::Expression(Box::new(value))
    }
}

impl From<serde_json::Number> for Value {
    fn from(value: serde_json::Number) -> Self {
        if let Some(int) = value.as_i64() {
            return Value::Integer(int);
        }

        // u64 beyond i64::MAX and all floats end up here
        match value.as_f64() {
            Some(decimal) => Value::Decimal(decimal),
            None => Value::Null,
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Value {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => b.into(),
            serde_json::Value::Number(n) => n.into(),
            serde_json::Value::String(s) => s.into(),
            serde_json::Value::Array(a) => a.into(),
            serde_json::Value::Object(o) => o.into_iter().collect(),
        }
    }
}
