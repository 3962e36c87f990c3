//! text rules of the terraform interpolation syntax
//!
//! The structural part of rendering (walking an [crate::expression::Expression]) lives in
//! [crate::resolve::Resolver::render] because operands may contain deferred values that need resolving first. This
//! module holds the pieces that only deal with text.
use std::fmt::{Display, Formatter};

/// Interpolation open-delimiter
pub const OPEN: &str = "${";
/// Interpolation close-delimiter
pub const CLOSE: &str = "}";

/// Options that change how operands are rendered
#[derive(Debug, Clone, Default, derive_new::new)]
pub struct RenderOptions {
    pub null_literal: NullLiteral,
}

/// Text emitted for a `null` operand inside an expression
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NullLiteral {
    /// `undefined`, matching the output of existing tooling
    #[default]
    Undefined,
    /// `null`, the terraform literal
    Null,
}

impl NullLiteral {
    pub fn as_str(self) -> &'static str {
        match self {
            NullLiteral::Undefined => "undefined",
            NullLiteral::Null => "null",
        }
    }
}

impl Display for NullLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wrap rendered expression text in `${` and `}`
pub fn interpolate(expression: &str) -> String {
    format!("{OPEN}{expression}{CLOSE}")
}

/// Escape literal text for use inside a quoted template string
///
/// - `\` becomes `\\`
/// - `"` becomes `\"`
/// - a newline becomes `\n`
/// - `${` becomes `$${`
/// - `%{` becomes `%%{`
pub fn escape_into(text: &str, out: &mut String) {
    let mut chars = text.chars().peekable();
    while let Some(char) = chars.next() {
        match char {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '$' if chars.peek() == Some(&'{') => out.push_str("$$"),
            '%' if chars.peek() == Some(&'{') => out.push_str("%%"),
            other => out.push(other),
        }
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(text, &mut out);
    out
}

/// `text` as a quoted, escaped string literal
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    escape_into(text, &mut out);
    out.push('"');
    out
}

/// Object keys are emitted bare when they are valid identifiers
pub fn object_key(key: &str) -> String {
    if hcl::Identifier::new(key).is_ok() {
        key.to_string()
    } else {
        quote(key)
    }
}

/// Shortest representation that reads back as the same number
pub fn decimal(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        tracing::warn!(value, "non-finite number rendered as null");
        "null".to_string()
    }
}
