use serde_json::{json, Map, Number, Value};
use sqlparser::ast::{
    self, BinaryOperator, CastKind, DuplicateTreatment, Expr, Function, FunctionArg, FunctionArgExpr, FunctionArguments,
    UnaryOperator, Value as SqlValue,
};

use crate::parser::{
    ast::attach_meta,
    sql::{cast_type_of, lower_literal_cast, SqlIngest},
    ParserError, Result,
};

fn operator(name: &str, operands: Vec<Value>) -> Value {
    json!({ "type": "operator", "value": name, "operands": operands })
}

fn function(name: &str, args: Vec<Value>) -> Value {
    json!({ "type": "function", "value": name, "args": args })
}

impl SqlIngest {
    pub(super) fn exprs_to_ql(&self, exprs: &[Expr]) -> Result<Vec<Value>> {
        exprs.iter().map(|expr| self.expr_to_ql(expr)).collect()
    }

    pub(super) fn expr_to_ql(&self, expr: &Expr) -> Result<Value> {
        match expr {
            Expr::Identifier(ident) => Ok(json!({ "type": "column", "column": ident.value })),
            Expr::CompoundIdentifier(idents) => match idents.as_slice() {
                [view, column] => Ok(json!({ "type": "column", "column": column.value, "view": view.value })),
                _ => Err(self.unsupported(format!("column names with more than two parts are not supported: {}", expr), &expr.to_string())),
            },
            Expr::Value(value) => self.value_to_ql(value),
            Expr::Nested(inner) => self.expr_to_ql(inner),

            Expr::BinaryOp { left, op, right } => self.binary_to_ql(op, left, right),
            Expr::UnaryOp { op, expr: inner } => match (op, inner.as_ref()) {
                (UnaryOperator::Minus, Expr::Value(SqlValue::Number(n, _))) => self.number_to_ql(&format!("-{}", n)),
                (UnaryOperator::Minus, _) => Ok(operator("-", vec![self.expr_to_ql(inner)?])),
                (UnaryOperator::Plus, _) => self.expr_to_ql(inner),
                (UnaryOperator::Not, _) => Ok(operator("not", vec![self.expr_to_ql(inner)?])),
                _ => Err(self.unsupported(format!("unary operator {} is not supported", op), &op.to_string())),
            },

            Expr::IsNull(inner) => Ok(operator("is", vec![self.expr_to_ql(inner)?, Value::Null])),
            Expr::IsNotNull(inner) => Ok(operator("is not", vec![self.expr_to_ql(inner)?, Value::Null])),
            Expr::IsTrue(inner) => Ok(operator("is", vec![self.expr_to_ql(inner)?, json!(true)])),
            Expr::IsNotTrue(inner) => Ok(operator("is not", vec![self.expr_to_ql(inner)?, json!(true)])),
            Expr::IsFalse(inner) => Ok(operator("is", vec![self.expr_to_ql(inner)?, json!(false)])),
            Expr::IsNotFalse(inner) => Ok(operator("is not", vec![self.expr_to_ql(inner)?, json!(false)])),

            Expr::Between { expr: inner, negated, low, high } => {
                let name = if *negated { "not between" } else { "between" };
                Ok(operator(name, vec![self.expr_to_ql(inner)?, self.expr_to_ql(low)?, self.expr_to_ql(high)?]))
            },
            Expr::InList { expr: inner, list, negated } => {
                let name = if *negated { "not in" } else { "in" };
                let values = json!({ "type": "list", "values": self.exprs_to_ql(list)? });
                Ok(operator(name, vec![self.expr_to_ql(inner)?, values]))
            },
            Expr::InSubquery { expr: inner, subquery, negated } => {
                let name = if *negated { "not in" } else { "in" };
                Ok(operator(name, vec![self.expr_to_ql(inner)?, self.query_to_ql(subquery)?]))
            },
            Expr::Exists { subquery, negated } => {
                let name = if *negated { "not exists" } else { "exists" };
                Ok(operator(name, vec![self.query_to_ql(subquery)?]))
            },
            Expr::Subquery(query) => self.query_to_ql(query),

            Expr::Like { negated, expr: inner, pattern, escape_char, .. } => {
                if escape_char.is_some() {
                    return Err(self.unsupported("LIKE ... ESCAPE is not supported", "escape"));
                }
                let name = if *negated { "not like" } else { "like" };
                Ok(operator(name, vec![self.expr_to_ql(inner)?, self.expr_to_ql(pattern)?]))
            },
            Expr::ILike { negated, expr: inner, pattern, escape_char, .. } => {
                if escape_char.is_some() {
                    return Err(self.unsupported("ILIKE ... ESCAPE is not supported", "escape"));
                }
                let name = if *negated { "not ilike" } else { "ilike" };
                Ok(operator(name, vec![self.expr_to_ql(inner)?, self.expr_to_ql(pattern)?]))
            },
            Expr::AnyOp { left, compare_op, right, .. } => self.qualified_to_ql(compare_op, left, right, "any"),
            Expr::AllOp { left, compare_op, right, .. } => self.qualified_to_ql(compare_op, left, right, "all"),

            Expr::Case { operand, conditions, results, else_result } => {
                let mut cases = Vec::with_capacity(conditions.len());
                for (condition, result) in conditions.iter().zip(results) {
                    let condition = match operand {
                        Some(operand) => operator("=", vec![self.expr_to_ql(operand)?, self.expr_to_ql(condition)?]),
                        None => self.expr_to_ql(condition)?,
                    };
                    cases.push(json!([condition, self.expr_to_ql(result)?]));
                }

                let mut object = Map::new();
                object.insert("type".into(), json!("case"));
                object.insert("cases".into(), Value::Array(cases));
                if let Some(else_result) = else_result {
                    object.insert("defaultCase".into(), self.expr_to_ql(else_result)?);
                }
                Ok(Value::Object(object))
            },

            Expr::Cast { kind, expr: inner, data_type, format } => {
                if !matches!(kind, CastKind::Cast | CastKind::DoubleColon) || format.is_some() {
                    return Err(self.unsupported(format!("cast form is not supported: {}", expr), ""));
                }
                let cast = cast_type_of(data_type)?;
                if let Expr::Value(SqlValue::SingleQuotedString(text)) = inner.as_ref() {
                    if let Some(lowered) = lower_literal_cast(text, cast)? {
                        return Ok(lowered);
                    }
                }
                Ok(attach_meta(self.expr_to_ql(inner)?, None, Some(cast.to_string())))
            },
            Expr::TypedString { data_type, value } => {
                let cast = cast_type_of(data_type)?;
                match lower_literal_cast(value, cast)? {
                    Some(lowered) => Ok(lowered),
                    None => Ok(attach_meta(Value::String(value.clone()), None, Some(cast.to_string()))),
                }
            },
            Expr::Interval(interval) => self.interval_to_ql(interval),

            Expr::Function(call) => self.function_to_ql(call),
            Expr::Extract { field, expr: inner, .. } => {
                Ok(function("date_part", vec![json!(field.to_string().to_ascii_lowercase()), self.expr_to_ql(inner)?]))
            },
            Expr::Substring { expr: inner, substring_from, substring_for, .. } => {
                let mut args = vec![self.expr_to_ql(inner)?];
                args.push(match substring_from {
                    Some(from) => self.expr_to_ql(from)?,
                    None => json!(1),
                });
                if let Some(length) = substring_for {
                    args.push(self.expr_to_ql(length)?);
                }
                Ok(function("substring", args))
            },
            Expr::Ceil { expr: inner, .. } => Ok(function("ceil", vec![self.expr_to_ql(inner)?])),
            Expr::Floor { expr: inner, .. } => Ok(function("floor", vec![self.expr_to_ql(inner)?])),

            Expr::Array(array) => Ok(Value::Array(self.exprs_to_ql(&array.elem)?)),
            Expr::Tuple(values) => Ok(json!({ "type": "list", "values": self.exprs_to_ql(values)? })),

            other => Err(self.unsupported(format!("expression is not supported: {}", other), &other.to_string())),
        }
    }

    fn value_to_ql(&self, value: &SqlValue) -> Result<Value> {
        match value {
            SqlValue::Number(n, _) => self.number_to_ql(n),
            SqlValue::SingleQuotedString(s) | SqlValue::EscapedStringLiteral(s) => Ok(Value::String(s.clone())),
            SqlValue::Boolean(b) => Ok(Value::Bool(*b)),
            SqlValue::Null => Ok(Value::Null),
            SqlValue::Placeholder(placeholder) => match self.extracted.short(placeholder) {
                Some(short) => Ok(json!({ "type": "short", "value": short.to_string() })),
                None => Err(self.unsupported(format!("unexpected placeholder {}", placeholder), placeholder)),
            },
            other => Err(self.unsupported(format!("literal is not supported: {}", other), &other.to_string())),
        }
    }

    fn number_to_ql(&self, text: &str) -> Result<Value> {
        if let Ok(number) = serde_json::from_str::<Number>(text) {
            return Ok(Value::Number(number));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| ParserError::invalid(format!("invalid number literal {}", text)))
    }

    fn binary_to_ql(&self, op: &BinaryOperator, left: &Expr, right: &Expr) -> Result<Value> {
        let name = match op {
            BinaryOperator::And => return Ok(json!({ "type": "and", "operands": [self.expr_to_ql(left)?, self.expr_to_ql(right)?] })),
            BinaryOperator::Or => return Ok(json!({ "type": "or", "operands": [self.expr_to_ql(left)?, self.expr_to_ql(right)?] })),
            other => self.operator_name(other)?,
        };
        Ok(operator(name, vec![self.expr_to_ql(left)?, self.expr_to_ql(right)?]))
    }

    fn qualified_to_ql(&self, op: &BinaryOperator, left: &Expr, right: &Expr, qualifier: &str) -> Result<Value> {
        let name = self.operator_name(op)?;
        Ok(json!({
            "type": "operator",
            "value": name,
            "operands": [self.expr_to_ql(left)?, self.expr_to_ql(right)?],
            "qualifier": qualifier
        }))
    }

    fn operator_name(&self, op: &BinaryOperator) -> Result<&'static str> {
        Ok(match op {
            BinaryOperator::Plus => "+",
            BinaryOperator::Minus => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
            BinaryOperator::StringConcat => "||",
            BinaryOperator::Eq => "=",
            BinaryOperator::NotEq => "!=",
            BinaryOperator::Lt => "<",
            BinaryOperator::LtEq => "<=",
            BinaryOperator::Gt => ">",
            BinaryOperator::GtEq => ">=",
            BinaryOperator::PGRegexMatch => "~",
            BinaryOperator::PGRegexIMatch => "~*",
            BinaryOperator::PGRegexNotMatch => "!~",
            BinaryOperator::PGOverlap => "&&",
            BinaryOperator::AtArrow => "@>",
            BinaryOperator::ArrowAt => "<@",
            other => return Err(self.unsupported(format!("operator {} is not supported", other), &other.to_string())),
        })
    }

    fn interval_to_ql(&self, interval: &ast::Interval) -> Result<Value> {
        let Expr::Value(SqlValue::SingleQuotedString(text)) = interval.value.as_ref() else {
            return Err(self.unsupported(format!("interval must be a string literal: {}", interval), "interval"));
        };
        let text = match &interval.leading_field {
            Some(field) => format!("{} {}", text, field),
            None => text.clone(),
        };
        match lower_literal_cast(&text, crate::parser::registry::CastType::Interval)? {
            Some(lowered) => Ok(lowered),
            None => Err(ParserError::invalid(format!("invalid interval '{}'", text))),
        }
    }

    fn function_to_ql(&self, call: &Function) -> Result<Value> {
        let [ident] = call.name.0.as_slice() else {
            return Err(self.unsupported(format!("qualified function names are not supported: {}", call.name), &call.name.to_string()));
        };
        let name = ident.value.to_ascii_lowercase();

        if call.over.is_some() {
            return Err(self.unsupported("window functions (OVER) are not supported", "over"));
        }
        if call.filter.is_some() {
            return Err(self.unsupported("FILTER clauses are not supported", "filter"));
        }
        if !call.within_group.is_empty() {
            return Err(self.unsupported("WITHIN GROUP is not supported", "within group"));
        }
        if call.null_treatment.is_some() || !matches!(call.parameters, FunctionArguments::None) {
            return Err(self.unsupported(format!("function form is not supported: {}", call), &name));
        }

        let (args, distinct) = match &call.args {
            FunctionArguments::None => (Vec::new(), false),
            FunctionArguments::Subquery(_) => return Err(self.unsupported("subquery function arguments are not supported", &name)),
            FunctionArguments::List(list) => {
                if !list.clauses.is_empty() {
                    return Err(self.unsupported(format!("function argument clauses are not supported: {}", call), &name));
                }
                let distinct = matches!(list.duplicate_treatment, Some(DuplicateTreatment::Distinct));

                let mut args = Vec::with_capacity(list.args.len());
                for arg in &list.args {
                    match arg {
                        FunctionArg::Unnamed(FunctionArgExpr::Expr(expr)) => args.push(self.expr_to_ql(expr)?),
                        FunctionArg::Unnamed(FunctionArgExpr::Wildcard) if name == "count" && list.args.len() == 1 => {},
                        other => return Err(self.unsupported(format!("function argument is not supported: {}", other), &name)),
                    }
                }
                (args, distinct)
            },
        };

        // geometry('ca-fsa', x) names a geometry rather than a function
        if name == "geometry" {
            if let Some((Value::String(geometry_type), rest)) = args.split_first() {
                return Ok(json!({ "type": "geometry", "geometryType": geometry_type, "args": rest }));
            }
        }

        let mut object = Map::new();
        object.insert("type".into(), json!("function"));
        object.insert("value".into(), json!(name));
        object.insert("args".into(), Value::Array(args));
        if distinct {
            object.insert("distinct".into(), json!(true));
        }
        Ok(Value::Object(object))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{sql::SqlIngest, ParserError};

    #[test]
    pub fn test_case_with_operand() {
        let ql = SqlIngest::to_ql("CASE a WHEN 1 THEN 'one' ELSE 'other' END").expect("Failed to ingest sql");

        assert_eq!(ql, json!({
            "type": "case",
            "cases": [[{ "type": "operator", "value": "=", "operands": [{ "type": "column", "column": "a" }, 1] }, "one"]],
            "defaultCase": "other"
        }));
    }

    #[test]
    pub fn test_in_and_exists() {
        let ql = SqlIngest::to_ql("a NOT IN (1, 2)").expect("Failed to ingest sql");
        assert_eq!(ql, json!({
            "type": "operator",
            "value": "not in",
            "operands": [{ "type": "column", "column": "a" }, { "type": "list", "values": [1, 2] }]
        }));

        let ql = SqlIngest::to_ql("NOT EXISTS (SELECT 1 FROM v)").expect("Failed to ingest sql");
        assert_eq!(ql["value"], json!("not exists"));
        assert_eq!(ql["operands"][0]["type"], json!("select"));
    }

    #[test]
    pub fn test_qualified_comparison() {
        let ql = SqlIngest::to_ql("a > ALL(b)").expect("Failed to ingest sql");
        assert_eq!(ql, json!({
            "type": "operator",
            "value": ">",
            "operands": [{ "type": "column", "column": "a" }, { "type": "column", "column": "b" }],
            "qualifier": "all"
        }));
    }

    #[test]
    pub fn test_casts() {
        let ql = SqlIngest::to_ql("CAST(sum(x) AS REAL)").expect("Failed to ingest sql");
        assert_eq!(ql, json!({
            "type": "function",
            "value": "sum",
            "args": [{ "type": "column", "column": "x" }],
            "cast": "real"
        }));

        let ql = SqlIngest::to_ql("a::double precision").expect("Failed to ingest sql");
        assert_eq!(ql["cast"], json!("double"));
    }

    #[test]
    pub fn test_negative_numbers_and_arrays() {
        assert_eq!(SqlIngest::to_ql("-1.5").expect("Failed to ingest sql"), json!(-1.5));
        assert_eq!(SqlIngest::to_ql("ARRAY[1, 2]").expect("Failed to ingest sql"), json!([1, 2]));
    }

    #[test]
    pub fn test_geometry_function() {
        let ql = SqlIngest::to_ql("geometry('ca-fsa', v.fsa)").expect("Failed to ingest sql");
        assert_eq!(ql, json!({
            "type": "geometry",
            "geometryType": "ca-fsa",
            "args": [{ "type": "column", "column": "fsa", "view": "v" }]
        }));
    }

    #[test]
    pub fn test_unsupported_operator() {
        match SqlIngest::to_ql("a -> 'b'") {
            Err(ParserError::SyntaxNotSupported { offset, .. }) => assert_eq!(offset, Some(2)),
            _ => panic!(),
        }
    }
}
