use std::fmt;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Number, Value};

/// Tokens that can be written without quotes.
static BARE_STRING: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.*:/\-]+$").ok());

/// One argument of a short expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ShortValue {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Array(Vec<ShortValue>),
    /// Raw `{...}` JSON.
    Json(Value),
    Short(ShortExpression),
}

/// `@name(positional.., key=value..)`
#[derive(Debug, Clone, PartialEq)]
pub struct ShortExpression {
    /// Lowercased form name.
    pub name: String,
    pub positional: Vec<ShortValue>,
    pub named: IndexMap<String, ShortValue>,
}

impl ShortExpression {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_ascii_lowercase(), positional: vec![], named: IndexMap::new() }
    }

    pub fn arg(mut self, value: ShortValue) -> Self {
        self.positional.push(value);
        self
    }

    pub fn with_named(mut self, key: &str, value: ShortValue) -> Self {
        self.set_named(key, value);
        self
    }

    pub fn set_named(&mut self, key: &str, value: ShortValue) {
        self.named.insert(key.to_string(), value);
    }
}

impl ShortValue {
    /// Plain QL value; nested shorts stay wrapped so the tree builder decides
    /// whether they are kept.
    pub fn to_ql(&self) -> Value {
        match self {
            ShortValue::Null => Value::Null,
            ShortValue::Bool(b) => Value::Bool(*b),
            ShortValue::Number(n) => Value::Number(n.clone()),
            ShortValue::String(s) => Value::String(s.clone()),
            ShortValue::Array(values) => Value::Array(values.iter().map(ShortValue::to_ql).collect()),
            ShortValue::Json(value) => value.clone(),
            ShortValue::Short(expression) => serde_json::json!({ "type": "short", "value": expression.to_string() }),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ShortValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            ShortValue::Null => "null",
            ShortValue::Bool(_) => "boolean",
            ShortValue::Number(_) => "number",
            ShortValue::String(_) => "string",
            ShortValue::Array(_) => "array",
            ShortValue::Json(_) => "json",
            ShortValue::Short(_) => "short expression",
        }
    }
}

fn can_be_bare(s: &str) -> bool {
    let matches = BARE_STRING.as_ref().is_some_and(|re| re.is_match(s));
    matches
        && !matches!(s.to_ascii_lowercase().as_str(), "true" | "false" | "null")
        && serde_json::from_str::<Number>(s).is_err()
}

fn write_string(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    if can_be_bare(s) {
        return write!(f, "{}", s);
    }

    write!(f, "'")?;
    for c in s.chars() {
        if c == '\'' || c == '\\' {
            write!(f, "\\")?;
        }
        write!(f, "{}", c)?;
    }
    write!(f, "'")
}

impl fmt::Display for ShortValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortValue::Null => write!(f, "null"),
            ShortValue::Bool(b) => write!(f, "{}", b),
            ShortValue::Number(n) => write!(f, "{}", n),
            ShortValue::String(s) => write_string(f, s),
            ShortValue::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            },
            ShortValue::Json(value) => write!(f, "{}", value),
            ShortValue::Short(expression) => write!(f, "{}", expression),
        }
    }
}

impl fmt::Display for ShortExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}(", self.name)?;
        let mut first = true;
        for value in &self.positional {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}", value)?;
        }
        for (key, value) in &self.named {
            if !first {
                write!(f, ",")?;
            }
            first = false;
            write!(f, "{}={}", key, value)?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Number};

    use crate::parser::short::{ShortExpression, ShortValue};

    #[test]
    pub fn test_display_quotes_only_when_needed() {
        let expression = ShortExpression::new("List")
            .arg(ShortValue::Array(vec![
                ShortValue::String("abc".into()),
                ShortValue::String("a b".into()),
                ShortValue::String("12".into()),
                ShortValue::String("true".into()),
                ShortValue::String("it's".into()),
                ShortValue::Number(Number::from(12)),
                ShortValue::Null,
            ]))
            .with_named("as", ShortValue::String("x".into()));

        assert_eq!(expression.to_string(), r"@list([abc,'a b','12','true','it\'s',12,null],as=x)");
    }

    #[test]
    pub fn test_nested_short_to_ql() {
        let value = ShortValue::Array(vec![ShortValue::Short(ShortExpression::new("column").arg(ShortValue::String("a".into())))]);
        assert_eq!(value.to_ql(), json!([{ "type": "short", "value": "@column(a)" }]));
    }
}
