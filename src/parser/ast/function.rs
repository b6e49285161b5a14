use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{to_ql_list, to_short_list, to_sql_list, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        registry::{CastType, FunctionCategory, FUNCTIONS},
        scope::Scope,
        short::{ShortExpression, ShortValue},
        QlOptions, Result,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionNode {
    /// Canonical (lowercase) registry name.
    pub name: String,
    pub args: Vec<Node>,
    pub distinct: bool,
}

impl FunctionNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["value", "args", "distinct"])?;

        let spec = FUNCTIONS.lookup(obj.str("value")?)?;
        let args = match obj.opt_array("args")? {
            Some(args) => builder.build_expressions(args, scope)?,
            None => vec![],
        };
        spec.arity.check(spec.name, args.len())?;

        let distinct = obj.opt_bool("distinct")?.unwrap_or(false);
        if distinct && !spec.is_aggregate() {
            return Err(obj.error(format!("distinct is only allowed on aggregates, not {}", spec.name)));
        }

        Ok(Node::new(NodeKind::Function(FunctionNode { name: spec.name.to_string(), args, distinct })))
    }

    pub fn default_cast(&self) -> Option<CastType> {
        FUNCTIONS.get(&self.name).and_then(|spec| spec.default_cast)
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let spec = FUNCTIONS.lookup(&self.name)?;
        if spec.category == FunctionCategory::Context {
            return w.context_value(spec.name);
        }

        let args = to_sql_list(&self.args, w)?;
        if let Some(sql) = w.dialect.render_function(spec.name, &args, self.distinct)? {
            return Ok(sql);
        }

        if args.is_empty() && spec.name == "count" {
            return Ok("count(*)".to_string());
        }

        let distinct = if self.distinct { "DISTINCT " } else { "" };
        Ok(format!("{}({}{})", spec.name, distinct, args.join(", ")))
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("function".into()));
        object.insert("value".into(), Value::String(self.name.clone()));
        object.insert("args".into(), to_ql_list(&self.args, options));
        if self.distinct {
            object.insert("distinct".into(), Value::Bool(true));
        }
        Value::Object(object)
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<ShortExpression> {
        let mut expression = ShortExpression::new("function")
            .arg(ShortValue::String(self.name.clone()))
            .arg(to_short_list(&self.args, options)?);
        if self.distinct {
            expression.set_named("distinct", ShortValue::Bool(true));
        }
        Ok(expression)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{ast::NodeKind, builder::TreeBuilder, registry::CastType, scope::Scope, ParseOptions, ParserError};

    #[test]
    pub fn test_build_applies_default_cast() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let node = builder.build_expression(&json!({
            "type": "function", "value": "SUM", "args": [{ "type": "column", "column": "x" }]
        }), &Scope::root()).expect("Failed to build function");

        assert!(matches!(&node.kind, NodeKind::Function(f) if f.name == "sum"));
        assert_eq!(node.cast(), None);
        assert_eq!(node.effective_cast(), Some(CastType::Real));
    }

    #[test]
    pub fn test_arity_is_checked() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "function", "value": "nullif", "args": [1] }), &Scope::root());
        assert!(matches!(result, Err(ParserError::ArgsLength { .. })));
    }

    #[test]
    pub fn test_unknown_function() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "function", "value": "pg_sleep", "args": [1] }), &Scope::root());
        assert!(matches!(result, Err(ParserError::InvalidFunction(_))));
    }

    #[test]
    pub fn test_distinct_only_on_aggregates() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({
            "type": "function", "value": "lower", "args": ["A"], "distinct": true
        }), &Scope::root());
        assert!(result.is_err());
    }
}
