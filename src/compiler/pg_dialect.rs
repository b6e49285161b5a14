use crate::{
    compiler::{geometry_arity_error, place_lookup, SqlDialect},
    parser::{registry::{CastType, GeometryType}, Result},
};

pub const PG_PLACE_TABLE: &str = "geo_place";

/// PostgreSQL with PostGIS.
pub struct PgDialect;

impl SqlDialect for PgDialect {
    fn name(&self) -> &'static str {
        "pg"
    }

    fn cast_type_name(&self, cast: CastType) -> &'static str {
        cast.pg_name()
    }

    fn render_geometry(&self, geometry_type: GeometryType, args: &[String]) -> Result<String> {
        Ok(match (geometry_type, args) {
            (GeometryType::Point, [lon, lat]) => format!("ST_SetSRID(ST_MakePoint({}, {}), 4326)", lon, lat),
            (GeometryType::Wkt, [text]) => format!("ST_GeomFromText({}, 4326)", text),
            (place, [id]) if place.is_place() => place_lookup(PG_PLACE_TABLE, "geometry", place, id),
            _ => return geometry_arity_error(geometry_type, args),
        })
    }

    fn render_function(&self, name: &str, args: &[String], _distinct: bool) -> Result<Option<String>> {
        let sql = match (name, args) {
            ("json_extract", [json, path @ ..]) => format!("json_extract_path({}, {})", json, path.join(", ")),
            ("array_length", [array]) => format!("array_length({}, 1)", array),
            ("geo_intersects", [a, b]) => format!("ST_Intersects({}, {})", a, b),
            ("geo_within", [a, b]) => format!("ST_Within({}, {})", a, b),
            ("geo_distance", [a, b]) => format!("ST_Distance(({})::geography, ({})::geography)", a, b),
            ("geo_area", [a]) => format!("ST_Area(({})::geography)", a),
            _ => return Ok(None),
        };
        Ok(Some(sql))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        compiler::{PgDialect, SqlDialect},
        parser::{ast::Limit, registry::{CastType, GeometryType, OperatorSpec, Qualifier}},
    };

    #[test]
    pub fn test_geometry() {
        let d = PgDialect;
        assert_eq!(
            d.render_geometry(GeometryType::Point, &["-79.4".into(), "43.6".into()]).unwrap(),
            "ST_SetSRID(ST_MakePoint(-79.4, 43.6), 4326)"
        );
        assert_eq!(
            d.render_geometry(GeometryType::CaFsa, &["'M5V'".into()]).unwrap(),
            "(SELECT geometry FROM geo_place WHERE type = 'ca-fsa' AND local_id = 'M5V')"
        );
    }

    #[test]
    pub fn test_overrides() {
        let d = PgDialect;
        assert_eq!(
            d.render_function("json_extract", &["\"v\".\"j\"".into(), "'a'".into(), "'b'".into()], false).unwrap().as_deref(),
            Some("json_extract_path(\"v\".\"j\", 'a', 'b')")
        );
        assert_eq!(d.render_function("sum", &["1".into()], false).unwrap(), None);

        let eq = OperatorSpec::lookup("=").unwrap();
        assert_eq!(d.render_qualified(eq, Qualifier::Any, "x", "ARRAY[1, 2]"), "(x = ANY(ARRAY[1, 2]))");
    }

    #[test]
    pub fn test_cast_and_limit() {
        let d = PgDialect;
        assert_eq!(d.render_cast("x", CastType::Double, None).unwrap(), "CAST(x AS double precision)");
        assert_eq!(d.render_limit_offset(Some(Limit::All), Some(5)), vec!["LIMIT ALL", "OFFSET 5"]);
    }
}
