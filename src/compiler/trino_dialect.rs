use crate::{
    compiler::{geometry_arity_error, place_lookup, unquote_literal, SqlDialect},
    parser::{
        ast::{quote_literal, Limit, Primitive},
        registry::{CastType, GeometryType, OperatorSpec, Qualifier},
        short::temporal::Interval,
        ParserError, Result,
    },
};

pub const TRINO_PLACE_TABLE: &str = "locus_place.public.geo_place";

/// Lambda parameter used for `any_match`/`all_match`.
const ELEMENT: &str = "q_elem";

/// Trino (Presto).
pub struct TrinoDialect;

impl TrinoDialect {
    fn render_interval(interval: &Interval) -> Result<String> {
        let terms: Vec<String> = interval.terms()?.iter()
            .map(|(n, unit)| format!("INTERVAL '{}' {}", n, unit))
            .collect();

        Ok(match terms.as_slice() {
            [single] => single.clone(),
            _ => format!("({})", terms.join(" + ")),
        })
    }

    /// `EXTRACT` takes a keyword, so the field has to be a known literal.
    fn date_part(field: &str, value: &str) -> Result<String> {
        let keyword = match unquote_literal(field).map(|f| f.to_ascii_lowercase()).as_deref() {
            Some("year") => "YEAR",
            Some("quarter") => "QUARTER",
            Some("month") => "MONTH",
            Some("week") => "WEEK",
            Some("day") => "DAY",
            Some("dow") => "DOW",
            Some("doy") => "DOY",
            Some("hour") => "HOUR",
            Some("minute") => "MINUTE",
            Some("second") => "SECOND",
            _ => return ParserError::invalid(format!("date_part: trino cannot extract {}", field)).err(),
        };
        Ok(format!("extract({} FROM {})", keyword, value))
    }

    /// `'$.a.b'` when every path element is a literal, a `concat` otherwise.
    fn json_path(path: &[String]) -> String {
        let literals: Option<Vec<String>> = path.iter().map(|p| unquote_literal(p)).collect();
        match literals {
            Some(keys) => quote_literal(&format!("$.{}", keys.join("."))),
            None => {
                let parts: Vec<String> = path.iter().map(|p| format!("'.', {}", p)).collect();
                format!("concat('$', {})", parts.join(", "))
            },
        }
    }
}

impl SqlDialect for TrinoDialect {
    fn name(&self) -> &'static str {
        "trino"
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        cast.trino_name()
    }

    fn render_cast(&self, sql: &str, cast: CastType, literal: Option<&Primitive>) -> Result<String> {
        let text = literal.and_then(Primitive::as_str);
        Ok(match (cast, text) {
            (CastType::Date, Some(_)) => format!("from_iso8601_date({})", sql),
            (CastType::Timestamp, Some(_)) => format!("CAST(from_iso8601_timestamp({}) AS timestamp)", sql),
            (CastType::Timestamptz, Some(_)) => format!("from_iso8601_timestamp({})", sql),
            (CastType::Interval, Some(text)) => Self::render_interval(&Interval::parse(text)?)?,
            (CastType::Geometry, _) => format!("ST_GeometryFromText({})", sql),
            _ => format!("CAST({} AS {})", sql, self.cast_type_name(cast)),
        })
    }

    fn render_geometry(&self, geometry_type: GeometryType, args: &[String]) -> Result<String> {
        Ok(match (geometry_type, args) {
            (GeometryType::Point, [lon, lat]) => format!("ST_Point({}, {})", lon, lat),
            (GeometryType::Wkt, [text]) => format!("ST_GeometryFromText({})", text),
            (place, [id]) if place.is_place() => place_lookup(TRINO_PLACE_TABLE, "ST_GeomFromBinary(geometry)", place, id),
            _ => return geometry_arity_error(geometry_type, args),
        })
    }

    fn render_function(&self, name: &str, args: &[String], distinct: bool) -> Result<Option<String>> {
        let sql = match (name, args) {
            ("date_part", [field, value]) => Self::date_part(field, value)?,
            ("json_extract", [json, path @ ..]) => format!("json_extract({}, {})", json, Self::json_path(path)),
            ("array_length", [array]) => format!("cardinality({})", array),
            ("string_agg", [value, separator]) => {
                let distinct = if distinct { "DISTINCT " } else { "" };
                format!("array_join(array_agg({}{}), {})", distinct, value, separator)
            },
            ("geo_intersects", [a, b]) => format!("ST_Intersects({}, {})", a, b),
            ("geo_within", [a, b]) => format!("ST_Within({}, {})", a, b),
            ("geo_distance", [a, b]) => format!("ST_Distance(to_spherical_geography({}), to_spherical_geography({}))", a, b),
            ("geo_area", [a]) => format!("ST_Area(to_spherical_geography({}))", a),
            _ => return Ok(None),
        };
        Ok(Some(sql))
    }

    fn render_operator(&self, spec: &OperatorSpec, operands: &[String]) -> Option<String> {
        let [left, right] = operands else {
            return None;
        };
        let sql = match spec.name {
            "~" => format!("regexp_like({}, {})", left, right),
            "~*" => format!("regexp_like({}, concat('(?i)', {}))", left, right),
            "!~" => format!("(NOT regexp_like({}, {}))", left, right),
            "ilike" => format!("(lower({}) LIKE lower({}))", left, right),
            "not ilike" => format!("(lower({}) NOT LIKE lower({}))", left, right),
            "&&" => format!("arrays_overlap({}, {})", left, right),
            "@>" => format!("(cardinality(array_except({}, {})) = 0)", right, left),
            "<@" => format!("(cardinality(array_except({}, {})) = 0)", left, right),
            _ => return None,
        };
        Some(sql)
    }

    fn render_qualified(&self, spec: &OperatorSpec, qualifier: Qualifier, left: &str, right: &str) -> String {
        if spec.name == "=" && qualifier == Qualifier::Any {
            return format!("contains({}, {})", right, left);
        }

        let comparison = self.render_operator(spec, &[left.to_string(), ELEMENT.to_string()])
            .unwrap_or_else(|| format!("{} {} {}", left, spec.sql, ELEMENT));
        let function = match qualifier {
            Qualifier::Any => "any_match",
            Qualifier::All => "all_match",
        };
        format!("{}({}, {} -> {})", function, right, ELEMENT, comparison)
    }

    /// Trino wants OFFSET before LIMIT.
    fn render_limit_offset(&self, limit: Option<Limit>, offset: Option<u64>) -> Vec<String> {
        let mut clauses = Vec::new();
        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }
        match limit {
            Some(Limit::Count(count)) => clauses.push(format!("LIMIT {}", count)),
            Some(Limit::All) => clauses.push("LIMIT ALL".to_string()),
            None => {},
        }
        clauses
    }
}
