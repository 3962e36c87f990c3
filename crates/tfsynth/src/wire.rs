//! wire format: deferred data written as json
//!
//! Plain json maps 1:1 to [Value]. Objects tagged with one of the following `$` keys describe expressions instead:
//!
//! | wire                                                   | value                                   |
//! |--------------------------------------------------------|-----------------------------------------|
//! | `{"$ref": "aws_instance.web.id"}`                      | [expression::reference]                 |
//! | `{"$raw": "text"}`                                     | [expression::raw_string]                |
//! | `{"$call": "max", "args": [1, 2]}`                     | [expression::call]                      |
//! | `{"$unary": "not", "operand": true}`                   | [expression::unary]                     |
//! | `{"$binary": "add", "left": 1, "right": 2}`            | [expression::binary]                    |
//! | `{"$if": true, "then": 1, "else": 0}`                  | [expression::conditional]               |
//! | `{"$access": {"$ref": "a.b"}, "path": [0, "name"]}`    | [expression::property_access]           |
//! | `{"$template": ["id: ", {"$ref": "a.id"}]}`            | string with embedded token markers      |
//!
//! Operator names are those of [BinaryOperator::name] and [UnaryOperator::name]. A tagged object may not carry any
//! other keys. Plain keys that start with `$` are written with a doubled `$`: `{"$$schema": 1}` is `{"$schema": 1}`.
use crate::expression::{self, BinaryOperator, Segment, UnaryOperator};
use crate::token::TokenRegistry;
use crate::value::Value;
use serde_json::{Map, Value as Json};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum WireError {
    #[error("unknown tag {0:?}")]
    UnknownTag(String),
    #[error("{tag} is missing {field:?}")]
    MissingField { tag: &'static str, field: &'static str },
    #[error("{tag}: {field:?} must be {expected}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        expected: &'static str,
    },
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),
    #[error("{tag} does not take {field:?}")]
    UnexpectedField { tag: String, field: String },
}

/// Decode a wire value, registering template parts in `tokens`
pub fn from_wire(json: &Json, tokens: &TokenRegistry) -> Result<Value, WireError> {
    match json {
        Json::Array(items) => items
            .iter()
            .map(|item| from_wire(item, tokens))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Json::Object(object) => match object.keys().find(|key| is_tag(key)) {
            Some(tag) => tagged(tag, object, tokens),
            None => object
                .iter()
                .map(|(key, value)| from_wire(value, tokens).map(|value| (literal_key(key), value)))
                .collect::<Result<Vec<_>, _>>()
                .map(|entries| entries.into_iter().collect()),
        },
        scalar => Ok(scalar.clone().into()),
    }
}

fn is_tag(key: &str) -> bool {
    key.starts_with('$') && !key.starts_with("$$")
}

/// `$$key` is the literal key `$key`
fn literal_key(key: &str) -> String {
    match key.strip_prefix('$') {
        Some(rest) if rest.starts_with('$') => rest.to_string(),
        _ => key.to_string(),
    }
}

fn tagged(tag: &str, object: &Map<String, Json>, tokens: &TokenRegistry) -> Result<Value, WireError> {
    let fields: &[&str] = match tag {
        "$ref" | "$raw" | "$template" => &[],
        "$call" => &["args"],
        "$unary" => &["operand"],
        "$binary" => &["left", "right"],
        "$if" => &["then", "else"],
        "$access" => &["path"],
        unknown => return Err(WireError::UnknownTag(unknown.to_string())),
    };

    if let Some(field) = object
        .keys()
        .find(|key| key.as_str() != tag && !fields.contains(&key.as_str()))
    {
        return Err(WireError::UnexpectedField {
            tag: tag.to_string(),
            field: field.clone(),
        });
    }

    let fields = Fields {
        object,
        tokens,
        tag: "",
    };

    let expression = match tag {
        "$ref" => expression::reference(fields.tag("$ref").string("$ref")?),
        "$raw" => expression::raw_string(fields.tag("$raw").string("$raw")?),
        "$call" => {
            let fields = fields.tag("$call");
            let args = match object.get("args") {
                Some(_) => fields.array("args")?,
                None => vec![],
            };
            expression::call(fields.string("$call")?, args)
        }
        "$unary" => {
            let fields = fields.tag("$unary");
            let name = fields.string("$unary")?;
            let operator =
                UnaryOperator::from_name(&name).ok_or(WireError::UnknownOperator(name))?;
            expression::unary(operator, fields.value("operand")?)
        }
        "$binary" => {
            let fields = fields.tag("$binary");
            let name = fields.string("$binary")?;
            let operator =
                BinaryOperator::from_name(&name).ok_or(WireError::UnknownOperator(name))?;
            expression::binary(operator, fields.value("left")?, fields.value("right")?)
        }
        "$if" => {
            let fields = fields.tag("$if");
            expression::conditional(
                fields.value("$if")?,
                fields.value("then")?,
                fields.value("else")?,
            )
        }
        "$access" => {
            let fields = fields.tag("$access");
            expression::property_access(fields.value("$access")?, fields.path("path")?)
        }
        "$template" => return fields.tag("$template").template("$template"),
        unknown => return Err(WireError::UnknownTag(unknown.to_string())),
    };

    Ok(expression.into())
}

/// Typed access to the fields of a tagged object
#[derive(Clone, Copy)]
struct Fields<'j> {
    object: &'j Map<String, Json>,
    tokens: &'j TokenRegistry,
    tag: &'static str,
}

impl<'j> Fields<'j> {
    fn tag(self, tag: &'static str) -> Self {
        Self { tag, ..self }
    }

    fn get(&self, field: &'static str) -> Result<&'j Json, WireError> {
        self.object.get(field).ok_or(WireError::MissingField {
            tag: self.tag,
            field,
        })
    }

    fn invalid(&self, field: &'static str, expected: &'static str) -> WireError {
        WireError::InvalidField {
            tag: self.tag,
            field,
            expected,
        }
    }

    fn value(&self, field: &'static str) -> Result<Value, WireError> {
        from_wire(self.get(field)?, self.tokens)
    }

    fn string(&self, field: &'static str) -> Result<String, WireError> {
        self.get(field)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.invalid(field, "a string"))
    }

    fn array(&self, field: &'static str) -> Result<Vec<Value>, WireError> {
        self.get(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "an array"))?
            .iter()
            .map(|item| from_wire(item, self.tokens))
            .collect()
    }

    fn path(&self, field: &'static str) -> Result<Vec<Segment>, WireError> {
        self.get(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "an array"))?
            .iter()
            .map(|segment| match segment {
                Json::String(key) => Ok(Segment::Key(key.clone())),
                Json::Number(index) => index
                    .as_i64()
                    .map(Segment::Index)
                    .ok_or_else(|| self.invalid(field, "integers and strings")),
                _ => Err(self.invalid(field, "integers and strings")),
            })
            .collect()
    }

    /// Concatenate literal strings with markers for every other part
    fn template(&self, field: &'static str) -> Result<Value, WireError> {
        let parts = self
            .get(field)?
            .as_array()
            .ok_or_else(|| self.invalid(field, "an array"))?;

        let mut text = String::new();
        for part in parts {
            match part {
                Json::String(literal) => text.push_str(literal),
                other => text.push_str(&self.tokens.as_string(from_wire(other, self.tokens)?)),
            }
        }

        Ok(text.into())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::expression::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn decode(json: Json) -> Result<Value, WireError> {
        from_wire(&json, &TokenRegistry::new())
    }

    #[test]
    fn plain_json() {
        assert_eq!(
            decode(json!({"a": [1, "b", null], "c": {"d": true}})),
            Ok(Value::from(json!({"a": [1, "b", null], "c": {"d": true}})))
        );
    }

    #[test]
    fn expressions() {
        assert_eq!(decode(json!({"$ref": "a.b"})), Ok(reference("a.b").into()));
        assert_eq!(decode(json!({"$raw": "\""})), Ok(raw_string("\"").into()));
        assert_eq!(
            decode(json!({"$call": "length", "args": [{"$ref": "a.b"}]})),
            Ok(call("length", vec![reference("a.b").into()]).into())
        );
        assert_eq!(
            decode(json!({"$call": "timestamp"})),
            Ok(call("timestamp", vec![]).into())
        );
        assert_eq!(
            decode(json!({"$unary": "negate", "operand": 1})),
            Ok(negate(1).into())
        );
        assert_eq!(
            decode(json!({"$binary": "mul", "left": 2, "right": 3})),
            Ok(mul(2, 3).into())
        );
        assert_eq!(
            decode(json!({"$if": true, "then": 1, "else": 0})),
            Ok(conditional(true, 1, 0).into())
        );
        assert_eq!(
            decode(json!({"$access": {"$ref": "a.list"}, "path": [0, "name"]})),
            Ok(property_access(reference("a.list"), vec![0.into(), "name".into()]).into())
        );
    }

    #[test]
    fn nested_in_plain_data() {
        assert_eq!(
            decode(json!({"resource": {"x": {"y": {"count": {"$ref": "var.n"}}}}})),
            Ok(Value::from_iter([(
                "resource",
                Value::from_iter([(
                    "x",
                    Value::from_iter([("y", Value::from_iter([("count", reference("var.n"))]))])
                )])
            )]))
        );
    }

    #[test]
    fn templates_register_markers() {
        let tokens = TokenRegistry::new();
        let value = from_wire(
            &json!({"$template": ["id: ", {"$ref": "a.id"}, "!"]}),
            &tokens,
        )
        .unwrap();

        let Value::String(text) = value else {
            panic!("expected a string, got {value:?}");
        };
        assert!(text.starts_with("id: "));
        assert!(text.ends_with('!'));
        assert_eq!(tokens.len(), 1);
    }

    #[test]
    fn errors() {
        assert_eq!(
            decode(json!({"$nope": 1})),
            Err(WireError::UnknownTag("$nope".into()))
        );
        assert_eq!(
            decode(json!({"$binary": "pow", "left": 1, "right": 2})),
            Err(WireError::UnknownOperator("pow".into()))
        );
        assert_eq!(
            decode(json!({"$binary": "add", "left": 1})),
            Err(WireError::MissingField {
                tag: "$binary",
                field: "right"
            })
        );
        assert_eq!(
            decode(json!({"$ref": 5})),
            Err(WireError::InvalidField {
                tag: "$ref",
                field: "$ref",
                expected: "a string"
            })
        );
        assert!(decode(json!({"$access": {"$ref": "a"}, "path": [true]})).is_err());
    }

    #[test]
    fn tagged_objects_reject_other_keys() {
        assert_eq!(
            decode(json!({"$ref": "a.b", "comment": "x"})),
            Err(WireError::UnexpectedField {
                tag: "$ref".into(),
                field: "comment".into()
            })
        );
        assert_eq!(
            decode(json!({"$ref": "a.b", "$raw": "x"})),
            Err(WireError::UnexpectedField {
                tag: "$ref".into(),
                field: "$raw".into()
            })
        );
    }

    #[test]
    fn doubled_dollar_keys_are_literal() {
        assert_eq!(
            decode(json!({"policy": {"$$schema": "v1", "$$$id": 1, "a$b": true}})),
            Ok(Value::from(
                json!({"policy": {"$schema": "v1", "$$id": 1, "a$b": true}})
            ))
        );
    }
}
