//! Resolution of deferred data into a plain document
//!
//! [Resolver::resolve] walks a [Value] and replaces every [Deferred] and [Expression] with concrete data. The result is
//! a [serde_json::Value], so an unresolved placeholder can not make it into the output.
//!
//! Where a value ends up decides how it is written:
//!
//! | position                          | expression `a.b` becomes | string `x{marker}y` becomes |
//! |-----------------------------------|--------------------------|-----------------------------|
//! | document                          | `"${a.b}"`               | `"x${a.b}y"`                |
//! | operand of another expression     | `a.b`                    | `"x${a.b}y"` (escaped)      |
//!
//! A string that consists of exactly one marker is replaced by the marker's value, which keeps its type.
use crate::expression::{Expression, Segment};
use crate::render::{self, RenderOptions};
use crate::token::{split_markers, Deferred, DeferredId, Piece, ResolveContext, ScopeId, TokenRegistry};
use crate::value::Value;
use std::fmt::Write;

pub type BridgeError = Box<dyn std::error::Error + Send + Sync>;

/// Resolves deferred values that originate from a different scope
///
/// Implementations typically export the value from its origin and return an expression that reads it back (for
/// example through a remote state data source).
pub trait CrossScopeBridge {
    fn bridge(&self, request: BridgeRequest<'_>) -> Result<Value, BridgeError>;
}

#[derive(Debug)]
pub struct BridgeRequest<'d> {
    pub deferred: &'d Deferred,
    /// scope the deferred value belongs to
    pub origin: ScopeId,
    /// scope that is being resolved
    pub scope: ScopeId,
}

#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("{id} depends on itself")]
    Cycle { id: DeferredId },
    #[error("text contains a token marker ({marker:?}) that is unknown to this scope")]
    UnknownMarker { marker: String },
    #[error("{id} originates from {origin} and can not be resolved in {scope} without a cross-scope bridge")]
    Unbridged {
        id: DeferredId,
        origin: ScopeId,
        scope: ScopeId,
    },
    #[error("object key resolved to {value}, which is not a string")]
    NonStringKey { value: String },
    #[error("cross-scope bridge failed for {id}")]
    Bridge {
        id: DeferredId,
        #[source]
        source: BridgeError,
    },
}

/// Where literal text ends up
#[derive(Debug, Clone, Copy)]
enum Text {
    /// a document string, taken verbatim
    Document,
    /// a quoted string inside an expression, escaped
    Quoted,
}

impl Text {
    fn push_literal(self, literal: &str, out: &mut String) {
        match self {
            Text::Document => out.push_str(literal),
            Text::Quoted => render::escape_into(literal, out),
        }
    }
}

pub struct Resolver<'a> {
    scope: ScopeId,
    tokens: &'a TokenRegistry,
    options: &'a RenderOptions,
    bridge: Option<&'a dyn CrossScopeBridge>,
    /// deferred values whose result is being resolved right now
    in_progress: Vec<DeferredId>,
}

impl<'a> Resolver<'a> {
    pub fn new(scope: ScopeId, tokens: &'a TokenRegistry, options: &'a RenderOptions) -> Self {
        Self {
            scope,
            tokens,
            options,
            bridge: None,
            in_progress: vec![],
        }
    }

    pub fn with_bridge(mut self, bridge: &'a dyn CrossScopeBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Turn `value` into plain data
    pub fn resolve(&mut self, value: &Value) -> Result<serde_json::Value, ResolveError> {
        match value {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Boolean(bool) => Ok((*bool).into()),
            Value::Integer(int) => Ok((*int).into()),
            Value::Decimal(decimal) => Ok(serde_json::Number::from_f64(*decimal)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| {
                    tracing::warn!(decimal, "non-finite number resolved to null");
                    serde_json::Value::Null
                })),
            Value::String(text) => self.resolve_string(text),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve(item))
                .collect::<Result<Vec<_>, _>>()
                .map(serde_json::Value::Array),
            Value::Object(object) => {
                let mut resolved = serde_json::Map::with_capacity(object.len());
                for (key, value) in object {
                    let key = self.resolve_key(key)?;
                    resolved.insert(key, self.resolve(value)?);
                }
                Ok(serde_json::Value::Object(resolved))
            }
            Value::Deferred(deferred) => {
                self.with_deferred(deferred, |resolver, produced| resolver.resolve(&produced))
            }
            Value::Expression(expression) => {
                Ok(render::interpolate(&self.render(expression)?).into())
            }
        }
    }

    /// Render an expression without the surrounding `${` and `}`
    pub fn render(&mut self, expression: &Expression) -> Result<String, ResolveError> {
        let rendered = match expression {
            Expression::Reference(path) => path.clone(),
            Expression::Unary { operator, operand } => {
                format!("{}{}", operator.symbol(), self.render_operand(operand)?)
            }
            Expression::Binary {
                operator,
                left,
                right,
            } => format!(
                "({} {} {})",
                self.render_operand(left)?,
                operator.symbol(),
                self.render_operand(right)?
            ),
            Expression::Conditional {
                condition,
                when_true,
                when_false,
            } => format!(
                "{} ? {} : {}",
                self.render_operand(condition)?,
                self.render_operand(when_true)?,
                self.render_operand(when_false)?
            ),
            Expression::Call { name, args } => {
                format!("{name}({})", self.render_list(args)?.join(", "))
            }
            Expression::PropertyAccess { target, path } => {
                let mut rendered = self.render_operand(target)?;
                for segment in path {
                    // writing to a String never fails
                    let _ = match segment {
                        Segment::Index(index) => write!(rendered, "[{index}]"),
                        Segment::Key(key) => write!(rendered, "[{}]", render::quote(key)),
                    };
                }
                rendered
            }
            Expression::RawString(text) => render::quote(text),
        };

        Ok(rendered)
    }

    /// Render a value that is used inside an expression
    fn render_operand(&mut self, value: &Value) -> Result<String, ResolveError> {
        Ok(match value {
            Value::Null => self.options.null_literal.as_str().to_string(),
            Value::Boolean(bool) => bool.to_string(),
            Value::Integer(int) => int.to_string(),
            Value::Decimal(decimal) => render::decimal(*decimal),
            Value::String(text) => self.render_string_operand(text)?,
            Value::Array(items) => format!("[{}]", self.render_list(items)?.join(", ")),
            Value::Object(object) => {
                let mut entries = Vec::with_capacity(object.len());
                for (key, value) in object {
                    entries.push(format!(
                        "{} = {}",
                        self.render_key(key)?,
                        self.render_operand(value)?
                    ));
                }
                format!("{{{}}}", entries.join(", "))
            }
            Value::Deferred(deferred) => self.with_deferred(deferred, |resolver, produced| {
                resolver.render_operand(&produced)
            })?,
            Value::Expression(expression) => self.render(expression)?,
        })
    }

    fn render_list(&mut self, items: &[Value]) -> Result<Vec<String>, ResolveError> {
        items.iter().map(|item| self.render_operand(item)).collect()
    }

    fn render_string_operand(&mut self, text: &str) -> Result<String, ResolveError> {
        let Some(pieces) = split_markers(text) else {
            return Ok(render::quote(text));
        };

        if let [Piece::Marker(marker)] = pieces.as_slice() {
            let value = self.lookup(marker)?;
            return self.render_operand(&value);
        }

        let mut out = String::from('"');
        self.write_pieces(&pieces, Text::Quoted, &mut out)?;
        out.push('"');
        Ok(out)
    }

    /// Object keys may contain markers too, but must end up as strings
    fn resolve_key(&mut self, key: &str) -> Result<String, ResolveError> {
        match self.resolve_string(key)? {
            serde_json::Value::String(key) => Ok(key),
            other => Err(ResolveError::NonStringKey {
                value: other.to_string(),
            }),
        }
    }

    /// Key of an object literal inside an expression
    fn render_key(&mut self, key: &str) -> Result<String, ResolveError> {
        let Some(pieces) = split_markers(key) else {
            return Ok(render::object_key(key));
        };

        if let [Piece::Marker(marker)] = pieces.as_slice() {
            let value = self.lookup(marker)?;
            return self.render_key_value(&value);
        }

        self.render_string_operand(key)
    }

    fn render_key_value(&mut self, value: &Value) -> Result<String, ResolveError> {
        match value {
            Value::String(text) => self.render_key(text),
            Value::Deferred(deferred) => self.with_deferred(deferred, |resolver, produced| {
                resolver.render_key_value(&produced)
            }),
            // computed keys are parenthesized
            Value::Expression(expression) => Ok(format!("({})", self.render(expression)?)),
            other => Err(ResolveError::NonStringKey {
                value: self.resolve(other)?.to_string(),
            }),
        }
    }

    fn resolve_string(&mut self, text: &str) -> Result<serde_json::Value, ResolveError> {
        let Some(pieces) = split_markers(text) else {
            return Ok(text.into());
        };

        if let [Piece::Marker(marker)] = pieces.as_slice() {
            let value = self.lookup(marker)?;
            return self.resolve(&value);
        }

        let mut out = String::new();
        self.write_pieces(&pieces, Text::Document, &mut out)?;
        Ok(out.into())
    }

    fn write_pieces(
        &mut self,
        pieces: &[Piece<'_>],
        context: Text,
        out: &mut String,
    ) -> Result<(), ResolveError> {
        for piece in pieces {
            match piece {
                Piece::Literal(literal) => context.push_literal(literal, out),
                Piece::Marker(marker) => {
                    let value = self.lookup(marker)?;
                    self.splice(&value, context, out)?;
                }
            }
        }

        Ok(())
    }

    /// Write a marker's value into surrounding text
    fn splice(&mut self, value: &Value, context: Text, out: &mut String) -> Result<(), ResolveError> {
        match value {
            Value::String(text) => match split_markers(text) {
                Some(pieces) => self.write_pieces(&pieces, context, out),
                None => {
                    context.push_literal(text, out);
                    Ok(())
                }
            },
            Value::Deferred(deferred) => self.with_deferred(deferred, |resolver, produced| {
                resolver.splice(&produced, context, out)
            }),
            Value::Null => Ok(()),
            Value::Boolean(_) | Value::Integer(_) | Value::Decimal(_) => {
                out.push_str(&self.render_operand(value)?);
                Ok(())
            }
            Value::Array(_) | Value::Object(_) | Value::Expression(_) => {
                out.push_str(&render::interpolate(&self.render_operand(value)?));
                Ok(())
            }
        }
    }

    fn lookup(&self, marker: &str) -> Result<Value, ResolveError> {
        self.tokens
            .lookup(marker)
            .ok_or_else(|| ResolveError::UnknownMarker {
                marker: marker.to_string(),
            })
    }

    /// Produce the value of `deferred` and continue with it
    ///
    /// `deferred` is marked as in progress until `next` returns, meeting it again in the meantime is a cycle.
    fn with_deferred<T>(
        &mut self,
        deferred: &Deferred,
        next: impl FnOnce(&mut Self, Value) -> Result<T, ResolveError>,
    ) -> Result<T, ResolveError> {
        let id = deferred.id();
        if self.in_progress.contains(&id) {
            tracing::debug!(%id, in_progress=?self.in_progress, "cycle detected");
            return Err(ResolveError::Cycle { id });
        }

        let produced = self.produce(deferred)?;

        self.in_progress.push(id);
        let result = next(self, produced);
        self.in_progress.pop();

        result
    }

    #[tracing::instrument(level = "trace", skip_all, fields(id = %deferred.id()))]
    fn produce(&self, deferred: &Deferred) -> Result<Value, ResolveError> {
        let id = deferred.id();

        match deferred.origin() {
            Some(origin) if origin != self.scope => {
                let Some(bridge) = self.bridge else {
                    return Err(ResolveError::Unbridged {
                        id,
                        origin,
                        scope: self.scope,
                    });
                };

                tracing::debug!(%origin, scope=%self.scope, "resolving through cross-scope bridge");
                bridge
                    .bridge(BridgeRequest {
                        deferred,
                        origin,
                        scope: self.scope,
                    })
                    .map_err(|source| ResolveError::Bridge { id, source })
            }
            _ => Ok(deferred.produce(&ResolveContext::new(self.scope))),
        }
    }
}
