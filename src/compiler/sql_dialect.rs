use crate::parser::{
    ast::{Limit, Primitive},
    registry::{CastType, GeometryType, OperatorSpec, Qualifier},
    ParserError, Result,
};

/// Per-backend SQL rendering.
///
/// Nodes render themselves and only call into the dialect where PostgreSQL
/// and Trino disagree. Implementations are stateless and shared between
/// threads.
pub trait SqlDialect: Send + Sync {
    /// Engine name used by `QueryTree::to` ("pg", "trino", ...).
    fn name(&self) -> &'static str;

    fn cast_type_name(&self, cast: CastType) -> &'static str;

    /// Wraps `sql` in a cast. `literal` is set when the casted node is a
    /// primitive, so literal-specific syntax can be used.
    fn render_cast(&self, sql: &str, cast: CastType, _literal: Option<&Primitive>) -> Result<String> {
        Ok(format!("CAST({} AS {})", sql, self.cast_type_name(cast)))
    }

    fn render_geometry(&self, geometry_type: GeometryType, args: &[String]) -> Result<String>;

    /// Backend override for a function call; `None` falls back to
    /// `name(args)`.
    fn render_function(&self, _name: &str, _args: &[String], _distinct: bool) -> Result<Option<String>> {
        Ok(None)
    }

    /// Backend override for an operator; `None` falls back to the operator's
    /// shape.
    fn render_operator(&self, _spec: &OperatorSpec, _operands: &[String]) -> Option<String> {
        None
    }

    /// `left op ANY|ALL (right)`
    fn render_qualified(&self, spec: &OperatorSpec, qualifier: Qualifier, left: &str, right: &str) -> String {
        format!("({} {} {}({}))", left, spec.sql, qualifier.as_str().to_ascii_uppercase(), right)
    }

    fn render_array(&self, values: &[String]) -> String {
        format!("ARRAY[{}]", values.join(", "))
    }

    /// Trailing LIMIT/OFFSET clauses, in the order the backend expects.
    fn render_limit_offset(&self, limit: Option<Limit>, offset: Option<u64>) -> Vec<String> {
        let mut clauses = Vec::new();
        match limit {
            Some(Limit::Count(count)) => clauses.push(format!("LIMIT {}", count)),
            Some(Limit::All) => clauses.push("LIMIT ALL".to_string()),
            None => {},
        }
        if let Some(offset) = offset {
            clauses.push(format!("OFFSET {}", offset));
        }
        clauses
    }
}

/// Subquery reading a place shape by type and id.
pub fn place_lookup(table: &str, geometry: &str, geometry_type: GeometryType, id: &str) -> String {
    format!(
        "(SELECT {} FROM {} WHERE type = '{}' AND local_id = {})",
        geometry,
        table,
        geometry_type.as_str(),
        id
    )
}

pub fn geometry_arity_error<T>(geometry_type: GeometryType, args: &[String]) -> Result<T> {
    ParserError::ArgsLength {
        name: geometry_type.as_str().to_string(),
        message: format!("cannot render {} arguments", args.len()),
    }.err()
}

/// Inner text of a single-quoted SQL literal, if `sql` is exactly one.
pub fn unquote_literal(sql: &str) -> Option<String> {
    let inner = sql.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let mut out = String::with_capacity(inner.len());
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.next() != Some('\'') {
                return None;
            }
        }
        out.push(c);
    }
    Some(out)
}
