use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};

use crate::parser::{
    ast::attach_meta,
    registry::GeometryType,
    short::{temporal::{date_literal, datetime_literal, Interval}, ShortExpression, ShortValue},
    ParserError, Result,
};

/// Arguments of one short form after positional slots were mapped to names.
pub struct ShortArgs<'a> {
    form: &'static str,
    values: IndexMap<&'static str, &'a ShortValue>,
}

type Expand = fn(&ShortArgs) -> Result<Value>;

/// A short form: its positional template and how it lowers to QL.
pub struct ShortForm {
    pub name: &'static str,
    pub template: &'static [&'static str],
    pub expand: Expand,
}

/// Namespace for the short form table.
pub struct ShortForms;

static FORMS: Lazy<HashMap<&'static str, ShortForm>> = Lazy::new(|| {
    let forms = [
        ShortForm { name: "param", template: &["name"], expand: expand_param },
        ShortForm { name: "view", template: &["view"], expand: expand_view },
        ShortForm { name: "column", template: &["column", "view"], expand: expand_column },
        ShortForm { name: "function", template: &["name", "args", "distinct"], expand: expand_function },
        ShortForm { name: "geo", template: &["type", "args"], expand: expand_geo },
        ShortForm { name: "point", template: &["lon", "lat"], expand: expand_point },
        ShortForm { name: "wkt", template: &["text"], expand: expand_wkt },
        ShortForm { name: "fsa", template: &["id"], expand: |args| expand_place(args, GeometryType::CaFsa) },
        ShortForm { name: "postalcode", template: &["id"], expand: |args| expand_place(args, GeometryType::CaPostalcode) },
        ShortForm { name: "da", template: &["id"], expand: |args| expand_place(args, GeometryType::CaDa) },
        ShortForm { name: "ct", template: &["id"], expand: |args| expand_place(args, GeometryType::CaCt) },
        ShortForm { name: "array", template: &["values"], expand: |args| expand_values(args, "array") },
        ShortForm { name: "list", template: &["values"], expand: |args| expand_values(args, "list") },
        ShortForm { name: "cast", template: &["value", "type"], expand: expand_cast },
        ShortForm { name: "primitive", template: &["value"], expand: expand_primitive },
        ShortForm { name: "date", template: &["year", "month", "day", "delta"], expand: expand_date },
        ShortForm {
            name: "datetime",
            template: &["year", "month", "day", "hour", "minute", "second", "delta"],
            expand: expand_datetime,
        },
        ShortForm {
            name: "timedelta",
            template: &["years", "months", "weeks", "days", "hours", "minutes", "seconds"],
            expand: expand_timedelta,
        },
        ShortForm { name: "operator", template: &["operator", "operands", "qualifier"], expand: expand_operator },
        ShortForm { name: "and", template: &["operands"], expand: |args| expand_logical(args, "and") },
        ShortForm { name: "or", template: &["operands"], expand: |args| expand_logical(args, "or") },
        ShortForm { name: "sql", template: &["sql"], expand: expand_sql },
    ];

    forms.into_iter().map(|form| (form.name, form)).collect()
});

impl ShortForms {
    pub fn get(name: &str) -> Option<&'static ShortForm> {
        FORMS.get(name.to_ascii_lowercase().as_str())
    }

    /// Lowers a parsed short expression into its QL object, with `as`/`cast`
    /// attached.
    pub fn expand(expression: &ShortExpression) -> Result<Value> {
        let form = Self::get(&expression.name)
            .ok_or_else(|| ParserError::InvalidShort(format!("unknown short expression '@{}'", expression.name)))?;

        let args = ShortArgs::bind(form, expression)?;
        let value = (form.expand)(&args)?;

        let alias = args.opt_string("as")?;
        let cast = args.opt_string("cast")?;
        Ok(attach_meta(value, alias, cast))
    }
}

impl<'a> ShortArgs<'a> {
    fn bind(form: &'static ShortForm, expression: &'a ShortExpression) -> Result<Self> {
        if expression.positional.len() > form.template.len() {
            return ParserError::InvalidShort(format!(
                "@{} takes at most {} positional arguments, got {}",
                form.name,
                form.template.len(),
                expression.positional.len()
            )).err();
        }

        let mut values: IndexMap<&'static str, &'a ShortValue> = form.template.iter()
            .copied()
            .zip(expression.positional.iter())
            .collect();

        for (key, value) in &expression.named {
            let slot = form.template.iter()
                .copied()
                .chain(["as", "cast"])
                .find(|slot| *slot == key.as_str())
                .ok_or_else(|| ParserError::InvalidShort(format!("@{} has no argument '{}'", form.name, key)))?;

            if values.contains_key(slot) {
                return ParserError::InvalidShort(format!("@{}: argument '{}' given twice", form.name, key)).err();
            }
            values.insert(slot, value);
        }

        Ok(Self { form: form.name, values })
    }

    fn error(&self, message: impl AsRef<str>) -> ParserError {
        ParserError::InvalidShort(format!("@{}: {}", self.form, message.as_ref()))
    }

    /// Present and not `null`.
    pub fn get(&self, key: &str) -> Option<&'a ShortValue> {
        self.values.get(key).copied().filter(|value| **value != ShortValue::Null)
    }

    pub fn required(&self, key: &str) -> Result<&'a ShortValue> {
        self.get(key).ok_or_else(|| self.error(format!("missing '{}'", key)))
    }

    pub fn string(&self, key: &str) -> Result<String> {
        self.opt_string(key)?.ok_or_else(|| self.error(format!("missing '{}'", key)))
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<String>> {
        match self.get(key) {
            None => Ok(None),
            Some(ShortValue::String(s)) => Ok(Some(s.clone())),
            Some(ShortValue::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(self.error(format!("'{}' must be a string, got {}", key, other.type_name()))),
        }
    }

    pub fn opt_int(&self, key: &str) -> Result<Option<i64>> {
        match self.get(key) {
            None => Ok(None),
            Some(ShortValue::Number(n)) => n.as_i64()
                .map(Some)
                .ok_or_else(|| self.error(format!("'{}' must be an integer, got {}", key, n))),
            Some(ShortValue::String(s)) => s.trim().parse::<i64>()
                .map(Some)
                .map_err(|_| self.error(format!("'{}' must be an integer, got '{}'", key, s))),
            Some(other) => Err(self.error(format!("'{}' must be an integer, got {}", key, other.type_name()))),
        }
    }

    pub fn int(&self, key: &str) -> Result<i64> {
        self.opt_int(key)?.ok_or_else(|| self.error(format!("missing '{}'", key)))
    }

    pub fn opt_bool(&self, key: &str) -> Result<Option<bool>> {
        match self.get(key) {
            None => Ok(None),
            Some(ShortValue::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(self.error(format!("'{}' must be a boolean, got {}", key, other.type_name()))),
        }
    }

    /// QL form of an argument.
    pub fn ql(&self, key: &str) -> Result<Value> {
        Ok(self.required(key)?.to_ql())
    }

    /// QL list from an array argument; a single value is taken as a
    /// one-element list.
    pub fn ql_list(&self, key: &str) -> Result<Vec<Value>> {
        match self.get(key) {
            None => Ok(vec![]),
            Some(ShortValue::Array(values)) => Ok(values.iter().map(ShortValue::to_ql).collect()),
            Some(value) => Ok(vec![value.to_ql()]),
        }
    }
}

fn expand_param(args: &ShortArgs) -> Result<Value> {
    Ok(json!({ "type": "parameter", "value": args.string("name")? }))
}

fn expand_view(args: &ShortArgs) -> Result<Value> {
    Ok(json!({ "type": "view", "view": args.string("view")? }))
}

fn expand_column(args: &ShortArgs) -> Result<Value> {
    let mut object = Map::new();
    object.insert("type".into(), Value::String("column".into()));
    object.insert("column".into(), Value::String(args.string("column")?));
    if let Some(view) = args.opt_string("view")? {
        object.insert("view".into(), Value::String(view));
    }
    Ok(Value::Object(object))
}

fn expand_function(args: &ShortArgs) -> Result<Value> {
    let mut object = Map::new();
    object.insert("type".into(), Value::String("function".into()));
    object.insert("value".into(), Value::String(args.string("name")?));
    object.insert("args".into(), Value::Array(args.ql_list("args")?));
    if args.opt_bool("distinct")?.unwrap_or(false) {
        object.insert("distinct".into(), Value::Bool(true));
    }
    Ok(Value::Object(object))
}

fn geometry(geometry_type: &str, args: Vec<Value>) -> Value {
    json!({ "type": "geometry", "geometryType": geometry_type, "args": args })
}

fn expand_geo(args: &ShortArgs) -> Result<Value> {
    let geometry_type = GeometryType::parse(&args.string("type")?)?;
    Ok(geometry(geometry_type.as_str(), args.ql_list("args")?))
}

fn expand_point(args: &ShortArgs) -> Result<Value> {
    Ok(geometry(GeometryType::Point.as_str(), vec![args.ql("lon")?, args.ql("lat")?]))
}

fn expand_wkt(args: &ShortArgs) -> Result<Value> {
    Ok(geometry(GeometryType::Wkt.as_str(), vec![args.ql("text")?]))
}

fn expand_place(args: &ShortArgs, geometry_type: GeometryType) -> Result<Value> {
    Ok(geometry(geometry_type.as_str(), vec![args.ql("id")?]))
}

fn expand_values(args: &ShortArgs, expression_type: &str) -> Result<Value> {
    Ok(json!({ "type": expression_type, "values": args.ql_list("values")? }))
}

fn expand_cast(args: &ShortArgs) -> Result<Value> {
    Ok(json!({ "type": "cast", "value": args.ql("value")?, "cast": args.string("type")? }))
}

fn expand_primitive(args: &ShortArgs) -> Result<Value> {
    let value = match args.get("value") {
        None => Value::Null,
        Some(ShortValue::Array(_) | ShortValue::Json(_) | ShortValue::Short(_)) => {
            return Err(args.error("value must be a string, number, boolean or null"));
        },
        Some(value) => value.to_ql(),
    };
    Ok(json!({ "type": "primitive", "value": value }))
}

/// `base + delta`, cast back to the base's type.
fn with_delta(args: &ShortArgs, base: Value, cast: &str) -> Result<Value> {
    let Some(delta) = args.get("delta") else {
        return Ok(base);
    };

    let delta = match delta {
        ShortValue::String(text) => json!({ "type": "primitive", "value": Interval::parse(text)?.to_literal(), "cast": "interval" }),
        ShortValue::Short(_) => delta.to_ql(),
        other => return Err(args.error(format!("delta must be an interval string or @timedelta, got {}", other.type_name()))),
    };

    Ok(json!({ "type": "operator", "value": "+", "operands": [base, delta], "cast": cast }))
}

fn expand_date(args: &ShortArgs) -> Result<Value> {
    let literal = date_literal(args.int("year")?, args.int("month")?, args.int("day")?)?;
    let base = json!({ "type": "primitive", "value": literal, "cast": "date" });
    with_delta(args, base, "date")
}

fn expand_datetime(args: &ShortArgs) -> Result<Value> {
    let literal = datetime_literal(
        args.int("year")?,
        args.int("month")?,
        args.int("day")?,
        args.opt_int("hour")?.unwrap_or(0),
        args.opt_int("minute")?.unwrap_or(0),
        args.opt_int("second")?.unwrap_or(0),
    )?;
    let base = json!({ "type": "primitive", "value": literal, "cast": "timestamp" });
    with_delta(args, base, "timestamp")
}

fn expand_timedelta(args: &ShortArgs) -> Result<Value> {
    let part = |key: &str| args.opt_int(key).map(|n| n.unwrap_or(0));
    let interval = Interval {
        years: part("years")?,
        months: part("months")?,
        weeks: part("weeks")?,
        days: part("days")?,
        hours: part("hours")?,
        minutes: part("minutes")?,
        seconds: part("seconds")?,
    };
    interval.total_days()?;
    Ok(json!({ "type": "primitive", "value": interval.to_literal(), "cast": "interval" }))
}

fn expand_operator(args: &ShortArgs) -> Result<Value> {
    let mut object = Map::new();
    object.insert("type".into(), Value::String("operator".into()));
    object.insert("value".into(), Value::String(args.string("operator")?));
    object.insert("operands".into(), Value::Array(args.ql_list("operands")?));
    if let Some(qualifier) = args.opt_string("qualifier")? {
        object.insert("qualifier".into(), Value::String(qualifier));
    }
    Ok(Value::Object(object))
}

fn expand_logical(args: &ShortArgs, expression_type: &str) -> Result<Value> {
    Ok(json!({ "type": expression_type, "operands": args.ql_list("operands")? }))
}

fn expand_sql(args: &ShortArgs) -> Result<Value> {
    Ok(json!({ "type": "sql", "value": args.string("sql")? }))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{short::{ShortForms, ShortParser}, ParserError};

    fn expand(text: &str) -> crate::parser::Result<serde_json::Value> {
        ShortForms::expand(&ShortParser::parse(text)?)
    }

    #[test]
    pub fn test_column_and_meta() {
        assert_eq!(
            expand("@column(a, v, as=b, cast=text)").expect("Failed to expand"),
            json!({ "type": "column", "column": "a", "view": "v", "as": "b", "cast": "text" })
        );
        assert_eq!(
            expand("@column(view=v, column=a)").expect("Failed to expand"),
            json!({ "type": "column", "column": "a", "view": "v" })
        );
    }

    #[test]
    pub fn test_template_errors() {
        assert!(matches!(expand("@column(a, column=b)"), Err(ParserError::InvalidShort(_))));
        assert!(matches!(expand("@column(a, v, x)"), Err(ParserError::InvalidShort(_))));
        assert!(matches!(expand("@column(a, bogus=1)"), Err(ParserError::InvalidShort(_))));
        assert!(matches!(expand("@nope(a)"), Err(ParserError::InvalidShort(_))));
    }

    #[test]
    pub fn test_nested_shorts_stay_wrapped() {
        assert_eq!(
            expand("@operator(between, [@column(col), 1, 10])").expect("Failed to expand"),
            json!({
                "type": "operator",
                "value": "between",
                "operands": [{ "type": "short", "value": "@column(col)" }, 1, 10]
            })
        );
    }

    #[test]
    pub fn test_geo_shorthands() {
        assert_eq!(
            expand("@fsa(M5V)").unwrap(),
            json!({ "type": "geometry", "geometryType": "ca-fsa", "args": ["M5V"] })
        );
        assert_eq!(
            expand("@point(-79.4, 43.6)").unwrap(),
            json!({ "type": "geometry", "geometryType": "point", "args": [-79.4, 43.6] })
        );
    }

    #[test]
    pub fn test_dates() {
        assert_eq!(
            expand("@date(2024, 2, 29)").unwrap(),
            json!({ "type": "primitive", "value": "2024-02-29", "cast": "date" })
        );
        assert!(matches!(expand("@date(2023, 2, 29)"), Err(ParserError::InvalidShort(_))));

        assert_eq!(
            expand("@date(2024, 1, 1, delta='2 weeks')").unwrap(),
            json!({
                "type": "operator",
                "value": "+",
                "operands": [
                    { "type": "primitive", "value": "2024-01-01", "cast": "date" },
                    { "type": "primitive", "value": "2 weeks", "cast": "interval" }
                ],
                "cast": "date"
            })
        );

        assert_eq!(
            expand("@datetime(2024, 1, 1, 13)").unwrap(),
            json!({ "type": "primitive", "value": "2024-01-01T13:00:00", "cast": "timestamp" })
        );
        assert_eq!(
            expand("@timedelta(days=1, hours=2)").unwrap(),
            json!({ "type": "primitive", "value": "1 days 2 hours", "cast": "interval" })
        );
        assert!(matches!(
            expand("@timedelta(weeks=2000000000000000000)"),
            Err(ParserError::InvalidExpression(_))
        ));
    }

    #[test]
    pub fn test_meta_cast_over_form_cast_wraps() {
        assert_eq!(
            expand("@date(2024, 1, 1, cast=text)").unwrap(),
            json!({
                "type": "cast",
                "value": { "type": "primitive", "value": "2024-01-01", "cast": "date" },
                "cast": "text"
            })
        );
    }
}
