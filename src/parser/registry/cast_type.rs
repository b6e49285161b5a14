use std::fmt;

use crate::parser::{ParserError, Result};

/// Target types accepted by `cast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastType {
    Boolean,
    Integer,
    Bigint,
    Real,
    Double,
    Numeric,
    Text,
    Date,
    Timestamp,
    Timestamptz,
    Time,
    Interval,
    Json,
    Jsonb,
    Geometry,
}

impl CastType {
    /// Canonical QL name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CastType::Boolean => "boolean",
            CastType::Integer => "integer",
            CastType::Bigint => "bigint",
            CastType::Real => "real",
            CastType::Double => "double",
            CastType::Numeric => "numeric",
            CastType::Text => "text",
            CastType::Date => "date",
            CastType::Timestamp => "timestamp",
            CastType::Timestamptz => "timestamptz",
            CastType::Time => "time",
            CastType::Interval => "interval",
            CastType::Json => "json",
            CastType::Jsonb => "jsonb",
            CastType::Geometry => "geometry",
        }
    }

    pub fn pg_name(&self) -> &'static str {
        match self {
            CastType::Double => "double precision",
            other => other.as_str(),
        }
    }

    pub fn trino_name(&self) -> &'static str {
        match self {
            CastType::Numeric => "decimal",
            CastType::Text => "varchar",
            CastType::Timestamptz => "timestamp with time zone",
            CastType::Interval => "interval day to second",
            CastType::Jsonb => "json",
            other => other.as_str(),
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, CastType::Date | CastType::Timestamp | CastType::Timestamptz | CastType::Time)
    }

    /// Parses a canonical name or one of the accepted aliases.
    pub fn parse(name: &str) -> Result<CastType> {
        let normalized = name.split_whitespace().collect::<Vec<_>>().join(" ").to_ascii_lowercase();
        let cast = match normalized.as_str() {
            "boolean" | "bool" => CastType::Boolean,
            "integer" | "int" | "int4" => CastType::Integer,
            "bigint" | "int8" => CastType::Bigint,
            "real" | "float" | "float4" => CastType::Real,
            "double" | "double precision" | "float8" => CastType::Double,
            "numeric" | "decimal" => CastType::Numeric,
            "text" | "varchar" | "string" => CastType::Text,
            "date" => CastType::Date,
            "timestamp" | "timestamp without time zone" => CastType::Timestamp,
            "timestamptz" | "timestamp with time zone" => CastType::Timestamptz,
            "time" => CastType::Time,
            "interval" => CastType::Interval,
            "json" => CastType::Json,
            "jsonb" => CastType::Jsonb,
            "geometry" => CastType::Geometry,
            _ => return ParserError::InvalidCast(name.to_string()).err(),
        };
        Ok(cast)
    }
}

impl fmt::Display for CastType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::{registry::CastType, ParserError};

    #[test]
    pub fn test_parse_aliases() {
        assert_eq!(CastType::parse("INT").unwrap(), CastType::Integer);
        assert_eq!(CastType::parse("double   precision").unwrap(), CastType::Double);
        assert_eq!(CastType::parse("Timestamp With Time Zone").unwrap(), CastType::Timestamptz);
        assert_eq!(CastType::parse("varchar").unwrap(), CastType::Text);
    }

    #[test]
    pub fn test_parse_unknown() {
        match CastType::parse("money") {
            Err(ParserError::InvalidCast(name)) => assert_eq!(name, "money"),
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_backend_names() {
        assert_eq!(CastType::Text.pg_name(), "text");
        assert_eq!(CastType::Text.trino_name(), "varchar");
        assert_eq!(CastType::Double.pg_name(), "double precision");
        assert_eq!(CastType::Double.trino_name(), "double");
        assert_eq!(CastType::Jsonb.trino_name(), "json");
    }
}
