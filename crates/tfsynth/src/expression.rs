//! terraform expression syntax tree
//!
//! An [Expression] is a structured description of what ends up inside a `${...}` interpolation. Operands are
//! [Value]s, so any operand may itself be a literal, a deferred value or another expression.
//!
//! The free functions in this module are the intended way to build expressions:
//!
//! ```
//! use tfsynth::expression::{add, call, reference};
//!
//! let expr = call("max", vec![add(reference("var.a"), 1).into(), 10.into()]);
//! ```
use crate::value::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Dotted attribute path into the configuration, rendered bare
    Reference(String),
    Unary {
        operator: UnaryOperator,
        operand: Value,
    },
    Binary {
        operator: BinaryOperator,
        left: Value,
        right: Value,
    },
    Conditional {
        condition: Value,
        when_true: Value,
        when_false: Value,
    },
    Call {
        name: String,
        args: Vec<Value>,
    },
    PropertyAccess {
        target: Value,
        path: Vec<Segment>,
    },
    /// A string emitted as a quoted expression literal
    RawString(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Negate,
}

impl UnaryOperator {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOperator::Not => "!",
            UnaryOperator::Negate => "-",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            UnaryOperator::Not => "not",
            UnaryOperator::Negate => "negate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [UnaryOperator::Not, UnaryOperator::Negate]
            .into_iter()
            .find(|operator| operator.name() == name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Mul,
    Div,
    Mod,
    Add,
    Sub,
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
    And,
    Or,
}

impl BinaryOperator {
    const ALL: [BinaryOperator; 13] = [
        BinaryOperator::Mul,
        BinaryOperator::Div,
        BinaryOperator::Mod,
        BinaryOperator::Add,
        BinaryOperator::Sub,
        BinaryOperator::Gt,
        BinaryOperator::Gte,
        BinaryOperator::Lt,
        BinaryOperator::Lte,
        BinaryOperator::Eq,
        BinaryOperator::Neq,
        BinaryOperator::And,
        BinaryOperator::Or,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Mod => "%",
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Gt => ">",
            BinaryOperator::Gte => ">=",
            BinaryOperator::Lt => "<",
            BinaryOperator::Lte => "<=",
            BinaryOperator::Eq => "==",
            BinaryOperator::Neq => "!=",
            BinaryOperator::And => "&&",
            BinaryOperator::Or => "||",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BinaryOperator::Mul => "mul",
            BinaryOperator::Div => "div",
            BinaryOperator::Mod => "mod",
            BinaryOperator::Add => "add",
            BinaryOperator::Sub => "sub",
            BinaryOperator::Gt => "gt",
            BinaryOperator::Gte => "gte",
            BinaryOperator::Lt => "lt",
            BinaryOperator::Lte => "lte",
            BinaryOperator::Eq => "eq",
            BinaryOperator::Neq => "neq",
            BinaryOperator::And => "and",
            BinaryOperator::Or => "or",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|operator| operator.name() == name)
    }
}

/// One step of a [Expression::PropertyAccess]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// `[0]`
    Index(i64),
    /// `["key"]`
    Key(String),
}

impl From<i64> for Segment {
    fn from(value: i64) -> Self {
        Segment::Index(value)
    }
}

impl From<i32> for Segment {
    fn from(value: i32) -> Self {
        Segment::Index(value.into())
    }
}

impl From<&str> for Segment {
    fn from(value: &str) -> Self {
        Segment::Key(value.to_string())
    }
}

impl From<String> for Segment {
    fn from(value: String) -> Self {
        Segment::Key(value)
    }
}

pub fn reference(path: impl Into<String>) -> Expression {
    Expression::Reference(path.into())
}

pub fn raw_string(text: impl Into<String>) -> Expression {
    Expression::RawString(text.into())
}

pub fn call(name: impl Into<String>, args: Vec<Value>) -> Expression {
    Expression::Call {
        name: name.into(),
        args,
    }
}

pub fn conditional(
    condition: impl Into<Value>,
    when_true: impl Into<Value>,
    when_false: impl Into<Value>,
) -> Expression {
    Expression::Conditional {
        condition: condition.into(),
        when_true: when_true.into(),
        when_false: when_false.into(),
    }
}

pub fn property_access(target: impl Into<Value>, path: Vec<Segment>) -> Expression {
    Expression::PropertyAccess {
        target: target.into(),
        path,
    }
}

pub fn unary(operator: UnaryOperator, operand: impl Into<Value>) -> Expression {
    Expression::Unary {
        operator,
        operand: operand.into(),
    }
}

pub fn not(operand: impl Into<Value>) -> Expression {
    unary(UnaryOperator::Not, operand)
}

pub fn negate(operand: impl Into<Value>) -> Expression {
    unary(UnaryOperator::Negate, operand)
}

pub fn binary(
    operator: BinaryOperator,
    left: impl Into<Value>,
    right: impl Into<Value>,
) -> Expression {
    Expression::Binary {
        operator,
        left: left.into(),
        right: right.into(),
    }
}

macro_rules! binary_constructors {
    ($($name:ident => $operator:ident),+ $(,)?) => {
        $(
            pub fn $name(left: impl Into<Value>, right: impl Into<Value>) -> Expression {
                binary(BinaryOperator::$operator, left, right)
            }
        )+
    };
}

binary_constructors! {
    mul => Mul,
    div => Div,
    modulo => Mod,
    add => Add,
    sub => Sub,
    gt => Gt,
    gte => Gte,
    lt => Lt,
    lte => Lte,
    eq => Eq,
    neq => Neq,
    and => And,
    or => Or,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn operator_names_round_trip() {
        for operator in BinaryOperator::ALL {
            assert_eq!(BinaryOperator::from_name(operator.name()), Some(operator));
        }
        assert_eq!(UnaryOperator::from_name("negate"), Some(UnaryOperator::Negate));
        assert_eq!(BinaryOperator::from_name("pow"), None);
    }

    #[test]
    fn constructors_convert_operands() {
        assert_eq!(
            modulo(5, 3),
            Expression::Binary {
                operator: BinaryOperator::Mod,
                left: Value::Integer(5),
                right: Value::Integer(3),
            }
        );

        assert_eq!(
            property_access(reference("a.b"), vec![0.into(), "name".into()]),
            Expression::PropertyAccess {
                target: Value::Expression(Box::new(Expression::Reference("a.b".into()))),
                path: vec![Segment::Index(0), Segment::Key("name".into())],
            }
        );
    }
}
