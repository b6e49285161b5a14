use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{to_ql_list, to_short_list, to_sql_list, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        registry::{ExpressionType, OperatorShape, OperatorSpec, Qualifier},
        scope::Scope,
        short::{ShortExpression, ShortValue},
        ParserError, QlOptions, Result,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorNode {
    pub spec: &'static OperatorSpec,
    pub operands: Vec<Node>,
    pub qualifier: Option<Qualifier>,
}

impl OperatorNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        let spec = match obj.expression_type {
            ExpressionType::And => {
                obj.check_keys(&["operands"])?;
                OperatorSpec::lookup("and")?
            },
            ExpressionType::Or => {
                obj.check_keys(&["operands"])?;
                OperatorSpec::lookup("or")?
            },
            _ => {
                obj.check_keys(&["value", "operands", "qualifier"])?;
                OperatorSpec::lookup(obj.str("value")?)?
            },
        };

        let operands = builder.build_expressions(obj.array("operands")?, scope)?;
        let qualifier = obj.opt_str("qualifier")?.map(Qualifier::parse).transpose()?;

        Ok(Node::new(NodeKind::Operator(Self::new(spec, operands, qualifier)?)))
    }

    /// Validates operands against the spec. Nested `and`/`or` of the same
    /// operator without meta of their own are flattened into this one.
    pub fn new(spec: &'static OperatorSpec, operands: Vec<Node>, qualifier: Option<Qualifier>) -> Result<Self> {
        let operands = match spec.is_logical() {
            true => Self::flatten(spec, operands),
            false => operands,
        };

        spec.arity.check(spec.name, operands.len())?;

        if qualifier.is_some() && !spec.allows_qualifier {
            return ParserError::InvalidOperator(format!("{} does not accept a qualifier", spec.name)).err();
        }

        Ok(Self { spec, operands, qualifier })
    }

    fn flatten(spec: &'static OperatorSpec, operands: Vec<Node>) -> Vec<Node> {
        let mut flattened = Vec::with_capacity(operands.len());
        for operand in operands {
            let absorb = !operand.has_meta()
                && matches!(&operand.kind, NodeKind::Operator(inner) if inner.spec.name == spec.name);
            if !absorb {
                flattened.push(operand);
                continue;
            }
            if let NodeKind::Operator(inner) = operand.kind {
                flattened.extend(inner.operands);
            }
        }
        flattened
    }

    pub fn expression_type(&self) -> ExpressionType {
        match self.spec.name {
            "and" => ExpressionType::And,
            "or" => ExpressionType::Or,
            _ => ExpressionType::Operator,
        }
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let operands = to_sql_list(&self.operands, w)?;

        if let Some(qualifier) = self.qualifier {
            return match operands.as_slice() {
                [left, right] => Ok(w.dialect.render_qualified(self.spec, qualifier, left, right)),
                _ => ParserError::ArgsLength { name: self.spec.name.to_string(), message: "a qualified comparison takes 2 operands".into() }.err(),
            };
        }

        if let Some(sql) = w.dialect.render_operator(self.spec, &operands) {
            return Ok(sql);
        }

        let sql = match (self.spec.shape, operands.as_slice()) {
            (OperatorShape::Infix, [operand]) => format!("({}{})", self.spec.sql, operand),
            (OperatorShape::Infix, [left, right]) => format!("({} {} {})", left, self.spec.sql, right),
            (OperatorShape::Prefix, [operand]) => format!("({} {})", self.spec.sql, operand),
            (OperatorShape::Between, [value, low, high]) => format!("({} {} {} AND {})", value, self.spec.sql, low, high),
            (OperatorShape::Logical, operands) => format!("({})", operands.join(&format!(" {} ", self.spec.sql))),
            _ => {
                return ParserError::ArgsLength {
                    name: self.spec.name.to_string(),
                    message: format!("cannot render {} operands", operands.len()),
                }.err();
            },
        };
        Ok(sql)
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let mut object = Map::new();
        match self.expression_type() {
            ExpressionType::Operator => {
                object.insert("type".into(), Value::String("operator".into()));
                object.insert("value".into(), Value::String(self.spec.name.to_string()));
            },
            logical => {
                object.insert("type".into(), Value::String(logical.to_string()));
            },
        }
        object.insert("operands".into(), to_ql_list(&self.operands, options));
        if let Some(qualifier) = self.qualifier {
            object.insert("qualifier".into(), Value::String(qualifier.to_string()));
        }
        Value::Object(object)
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<ShortExpression> {
        let operands = to_short_list(&self.operands, options)?;
        let expression = match self.expression_type() {
            ExpressionType::Operator => ShortExpression::new("operator")
                .arg(ShortValue::String(self.spec.name.to_string()))
                .arg(operands),
            logical => ShortExpression::new(logical.as_str()).arg(operands),
        };

        Ok(match self.qualifier {
            Some(qualifier) => expression.arg(ShortValue::String(qualifier.to_string())),
            None => expression,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{ast::NodeKind, builder::TreeBuilder, registry::ExpressionType, scope::Scope, ParseOptions, ParserError, QlOptions};

    #[test]
    pub fn test_nested_and_is_flattened() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let node = builder.build_expression(&json!({
            "type": "and",
            "operands": [
                { "type": "operator", "value": "and", "operands": [true, false] },
                { "type": "and", "operands": [true], "as": "kept" },
                false
            ]
        }), &Scope::root()).expect("Failed to build");

        match &node.kind {
            NodeKind::Operator(op) => assert_eq!(op.operands.len(), 4),
            _ => panic!(),
        }
        assert_eq!(node.expression_type(), ExpressionType::And);
    }

    #[test]
    pub fn test_operator_and_round_trips_as_and() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let node = builder.build_expression(&json!({ "type": "operator", "value": "AND", "operands": [true, false] }), &Scope::root())
            .expect("Failed to build");
        assert_eq!(node.to_ql(&QlOptions::new()), json!({ "type": "and", "operands": [true, false] }));
    }

    #[test]
    pub fn test_between_arity() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let result = builder.build_expression(&json!({ "type": "operator", "value": "between", "operands": [1, 2] }), &Scope::root());
        assert!(matches!(result, Err(ParserError::ArgsLength { .. })));
    }

    #[test]
    pub fn test_qualifier_rules() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let ok = builder.build_expression(&json!({ "type": "operator", "value": "=", "operands": [1, [1, 2]], "qualifier": "any" }), &Scope::root());
        assert!(ok.is_ok());

        let bad = builder.build_expression(&json!({ "type": "operator", "value": "+", "operands": [1, [1, 2]], "qualifier": "any" }), &Scope::root());
        assert!(matches!(bad, Err(ParserError::InvalidOperator(_))));
    }
}
