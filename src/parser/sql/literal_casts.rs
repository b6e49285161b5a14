use chrono::DateTime;
use serde_json::{json, Value};
use sqlparser::ast::DataType;

use crate::parser::{
    registry::CastType,
    short::temporal::{parse_date, parse_datetime, Interval, DATE_FORMAT},
    ParserError, Result,
};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Maps a SQL type name onto a supported cast. Sized types such as
/// `varchar(10)` are rejected.
pub fn cast_type_of(data_type: &DataType) -> Result<CastType> {
    CastType::parse(&data_type.to_string())
}

/// Lowers `'text'::type` for the types that have a canonical QL literal form.
/// Returns `None` when the cast should simply be attached to the string.
pub fn lower_literal_cast(text: &str, cast: CastType) -> Result<Option<Value>> {
    let lowered = match cast {
        CastType::Date => {
            let date = parse_date(text).ok_or_else(|| ParserError::invalid(format!("invalid date literal '{}'", text)))?;
            json!({ "type": "primitive", "value": date.format(DATE_FORMAT).to_string(), "cast": "date" })
        },
        CastType::Timestamp => {
            let datetime = parse_datetime(text)
                .ok_or_else(|| ParserError::invalid(format!("invalid timestamp literal '{}'", text)))?;
            json!({ "type": "primitive", "value": datetime.format(TIMESTAMP_FORMAT).to_string(), "cast": "timestamp" })
        },
        CastType::Timestamptz => {
            let value = match DateTime::parse_from_rfc3339(text.trim()) {
                Ok(datetime) => datetime.to_rfc3339(),
                Err(_) => parse_datetime(text)
                    .ok_or_else(|| ParserError::invalid(format!("invalid timestamp literal '{}'", text)))?
                    .format(TIMESTAMP_FORMAT)
                    .to_string(),
            };
            json!({ "type": "primitive", "value": value, "cast": "timestamptz" })
        },
        CastType::Interval => {
            json!({ "type": "primitive", "value": Interval::parse(text)?.to_literal(), "cast": "interval" })
        },
        CastType::Geometry => json!({ "type": "geometry", "geometryType": "wkt", "args": [text] }),
        _ => return Ok(None),
    };
    Ok(Some(lowered))
}
