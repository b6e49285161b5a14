use ordered_float::NotNan;
use serde_json::{Number, Value};
use std::fmt::{self, Display};

use crate::parser::{short::ShortValue, ParserError, Result};

#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Primitive {
    String(String),
    Int(i64),
    Float(NotNan<f64>),
    Bool(bool),
    Null,
}

impl Primitive {
    pub fn from_value(value: &Value) -> Result<Primitive> {
        match value {
            Value::Null => Ok(Primitive::Null),
            Value::Bool(b) => Ok(Primitive::Bool(*b)),
            Value::String(s) => Ok(Primitive::String(s.clone())),
            Value::Number(n) => Self::from_number(n),
            other => ParserError::invalid(format!("primitive value must be a scalar, got {}", other)).err(),
        }
    }

    pub fn from_number(n: &Number) -> Result<Primitive> {
        if let Some(i) = n.as_i64() {
            return Ok(Primitive::Int(i));
        }

        n.as_f64()
            .and_then(|f| NotNan::new(f).ok())
            .map(Primitive::Float)
            .ok_or_else(|| ParserError::invalid(format!("invalid number {}", n)))
    }

    pub fn to_value(&self) -> Value {
        match self {
            Primitive::String(s) => Value::String(s.clone()),
            Primitive::Int(i) => Value::Number(Number::from(*i)),
            Primitive::Float(f) => Number::from_f64(f.into_inner()).map_or(Value::Null, Value::Number),
            Primitive::Bool(b) => Value::Bool(*b),
            Primitive::Null => Value::Null,
        }
    }

    pub fn to_short_value(&self) -> ShortValue {
        match self {
            Primitive::String(s) => ShortValue::String(s.clone()),
            Primitive::Int(i) => ShortValue::Number(Number::from(*i)),
            Primitive::Float(f) => Number::from_f64(f.into_inner()).map_or(ShortValue::Null, ShortValue::Number),
            Primitive::Bool(b) => ShortValue::Bool(*b),
            Primitive::Null => ShortValue::Null,
        }
    }

    /// SQL literal, identical for every backend.
    pub fn to_sql(&self) -> String {
        match self {
            Primitive::String(s) => quote_literal(s),
            Primitive::Int(i) => i.to_string(),
            Primitive::Float(f) => f.into_inner().to_string(),
            Primitive::Bool(true) => "TRUE".to_string(),
            Primitive::Bool(false) => "FALSE".to_string(),
            Primitive::Null => "NULL".to_string(),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Primitive::String(s) => Some(s),
            _ => None,
        }
    }
}

pub fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(s) => write!(f, "s: \"{}\"", s),
            Primitive::Int(i) => write!(f, "i: {}", i),
            Primitive::Float(n) => write!(f, "f: {}", n.into_inner()),
            Primitive::Bool(b) => write!(f, "b: {}", b),
            Primitive::Null => write!(f, "n: NULL"),
        }
    }
}

impl fmt::Debug for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Primitive::String(_) => write!(f, "String({})", self),
            Primitive::Int(_) => write!(f, "Int({})", self),
            Primitive::Float(_) => write!(f, "Float({})", self),
            Primitive::Bool(_) => write!(f, "Bool({})", self),
            Primitive::Null => write!(f, "Null(n: NULL)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::ast::Primitive;

    #[test]
    pub fn test_from_value() {
        assert_eq!(Primitive::from_value(&json!(3)).unwrap(), Primitive::Int(3));
        assert_eq!(Primitive::from_value(&json!("a")).unwrap(), Primitive::String("a".into()));
        assert_eq!(Primitive::from_value(&json!(null)).unwrap(), Primitive::Null);
        assert!(matches!(Primitive::from_value(&json!(1.5)).unwrap(), Primitive::Float(_)));
        assert!(Primitive::from_value(&json!([1])).is_err());
    }

    #[test]
    pub fn test_to_sql() {
        assert_eq!(Primitive::String("it's".into()).to_sql(), "'it''s'");
        assert_eq!(Primitive::Bool(true).to_sql(), "TRUE");
        assert_eq!(Primitive::Null.to_sql(), "NULL");
        assert_eq!(Primitive::from_value(&json!(2.5)).unwrap().to_sql(), "2.5");
    }
}
