use serde_json::{Map, Value};

use crate::parser::{registry::{CastType, ExpressionType}, ParserError, Result};

/// Alias and cast read off a QL object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub alias: Option<String>,
    pub cast: Option<CastType>,
}

/// Typed read access to one QL object (`{ "type": ..., ... }`).
///
/// `null` fields are treated as absent.
#[derive(Debug, Clone, Copy)]
pub struct QlObject<'a> {
    pub map: &'a Map<String, Value>,
    pub expression_type: ExpressionType,
}

impl<'a> QlObject<'a> {
    pub fn from_value(value: &'a Value) -> Result<Self> {
        let map = value.as_object()
            .ok_or_else(|| ParserError::invalid(format!("expected an expression object, got {}", value)))?;

        let type_name = map.get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ParserError::invalid("expression object requires a 'type'"))?;

        Ok(Self { map, expression_type: ExpressionType::parse(type_name)? })
    }

    pub fn is_type(value: &Value, expression_type: ExpressionType) -> bool {
        value.get("type")
            .and_then(Value::as_str)
            .and_then(|name| ExpressionType::parse(name).ok())
            == Some(expression_type)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.get(key).filter(|value| !value.is_null())
    }

    pub fn required(&self, key: &str) -> Result<&'a Value> {
        self.get(key).ok_or_else(|| self.error(format!("missing '{}'", key)))
    }

    /// Required, non-empty string.
    pub fn str(&self, key: &str) -> Result<&'a str> {
        match self.opt_str(key)? {
            Some(value) => Ok(value),
            None => Err(self.error(format!("missing '{}'", key))),
        }
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&'a str>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) if !s.is_empty() => Ok(Some(s)),
            Some(Value::String(_)) => Err(self.error(format!("'{}' cannot be empty", key))),
            Some(other) => Err(self.error(format!("'{}' must be a string, got {}", key, other))),
        }
    }

    pub fn array(&self, key: &str) -> Result<&'a Vec<Value>> {
        match self.opt_array(key)? {
            Some(values) => Ok(values),
            None => Err(self.error(format!("missing '{}'", key))),
        }
    }

    pub fn opt_array(&self, key: &str) -> Result<Option<&'a Vec<Value>>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Array(values)) => Ok(Some(values)),
            Some(other) => Err(self.error(format!("'{}' must be an array, got {}", key, other))),
        }
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.error(format!("'{}' must be a boolean, got {}", key, other))),
        }
    }

    /// Rejects keys outside `allowed`; `type`, `as` and `cast` are always accepted.
    pub fn check_keys(&self, allowed: &[&str]) -> Result<()> {
        for key in self.map.keys() {
            if matches!(key.as_str(), "type" | "as" | "cast") || allowed.contains(&key.as_str()) {
                continue;
            }
            return Err(self.error(format!("unexpected key '{}'", key)));
        }
        Ok(())
    }

    pub fn meta(&self) -> Result<Meta> {
        let alias = self.opt_str("as")?.map(str::to_string);
        let cast = self.opt_str("cast")?.map(CastType::parse).transpose()?;
        Ok(Meta { alias, cast })
    }

    pub fn error(&self, message: impl AsRef<str>) -> ParserError {
        ParserError::invalid(format!("{}: {}", self.expression_type, message.as_ref()))
    }
}
