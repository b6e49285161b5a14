use serde_json::{json, Value};

use crate::{
    compiler::SqlWriter,
    parser::{ast::{Node, NodeKind}, builder::{QlObject, TreeBuilder}, scope::Scope, short::{ShortExpression, ShortValue}, ParserError, Result},
};

/// A named placeholder, optionally bound to a value at parse time.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterNode {
    pub name: String,
    pub value: Option<Box<Node>>,
}

impl ParameterNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["value"])?;

        let name = obj.str("value")?;
        if name.starts_with("__") {
            return ParserError::InvalidParameter(format!("'{}': names starting with '__' are reserved", name)).err();
        }

        let value = match builder.options.parameter(name) {
            Some(bound) => Some(Box::new(builder.resolving(name)?.build_expression(bound, scope)?)),
            None if builder.options.params_must_have_values => {
                return ParserError::MissingParameter(name.to_string()).err();
            },
            None => None,
        };

        Ok(Node::new(NodeKind::Parameter(ParameterNode { name: name.to_string(), value })))
    }

    /// The bound value, unless references are kept.
    pub fn substitute(&self, keep_param_refs: bool) -> Option<&Node> {
        match keep_param_refs {
            true => None,
            false => self.value.as_deref(),
        }
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        match self.substitute(w.options.keep_param_refs) {
            Some(value) => value.to_sql(w),
            None => Ok("NULL".to_string()),
        }
    }

    pub fn to_ql(&self) -> Value {
        json!({ "type": "parameter", "value": self.name })
    }

    pub fn to_short(&self) -> ShortExpression {
        ShortExpression::new("param").arg(ShortValue::String(self.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use crate::parser::{ast::NodeKind, builder::TreeBuilder, scope::Scope, ParseOptions, ParserError, QlOptions};

    fn bound(name: &str, value: serde_json::Value) -> ParseOptions {
        let mut parameters = Map::new();
        parameters.insert(name.to_string(), value);
        ParseOptions::new().with_parameters(parameters)
    }

    #[test]
    pub fn test_reserved_name() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "parameter", "value": "__secret" }), &Scope::root());
        assert!(matches!(result, Err(ParserError::InvalidParameter(_))));
    }

    #[test]
    pub fn test_missing_required_value() {
        let options = ParseOptions::new().with_params_must_have_values();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "parameter", "value": "limit" }), &Scope::root());
        assert!(matches!(result, Err(ParserError::MissingParameter(name)) if name == "limit"));
    }

    #[test]
    pub fn test_cyclic_bindings_rejected() {
        let mut parameters = Map::new();
        parameters.insert("a".to_string(), json!({ "type": "parameter", "value": "b" }));
        parameters.insert("b".to_string(), json!({ "type": "parameter", "value": "a" }));
        let options = ParseOptions::new().with_parameters(parameters);
        let builder = TreeBuilder::new(&options);

        match builder.build_expression(&json!({ "type": "parameter", "value": "a" }), &Scope::root()) {
            Err(ParserError::InvalidParameter(message)) => assert!(message.contains("a -> b -> a")),
            _ => panic!(),
        }

        let options = bound("c", json!([1, { "type": "parameter", "value": "c" }]));
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "parameter", "value": "c" }), &Scope::root());
        assert!(matches!(result, Err(ParserError::InvalidParameter(_))));
    }

    #[test]
    pub fn test_shared_binding_is_not_a_cycle() {
        let mut parameters = Map::new();
        parameters.insert("lo".to_string(), json!(1));
        parameters.insert("range".to_string(), json!([
            { "type": "parameter", "value": "lo" },
            { "type": "parameter", "value": "lo" }
        ]));
        let options = ParseOptions::new().with_parameters(parameters);
        let builder = TreeBuilder::new(&options);

        let node = builder.build_expression(&json!({ "type": "parameter", "value": "range" }), &Scope::root())
            .expect("Failed to build parameter");
        assert_eq!(node.to_ql(&QlOptions::new()), json!([1, 1]));
    }

    #[test]
    pub fn test_bound_value_substitutes_in_ql() {
        let options = bound("start", json!({ "type": "primitive", "value": "2020-01-01", "cast": "date" }));
        let builder = TreeBuilder::new(&options);
        let node = builder.build_expression(&json!({ "type": "parameter", "value": "start" }), &Scope::root())
            .expect("Failed to build parameter");

        assert!(matches!(&node.kind, NodeKind::Parameter(p) if p.value.is_some()));
        assert_eq!(
            node.to_ql(&QlOptions::new()),
            json!({ "type": "primitive", "value": "2020-01-01", "cast": "date" })
        );
        assert_eq!(
            node.to_ql(&QlOptions::new().with_keep_param_refs()),
            json!({ "type": "parameter", "value": "start" })
        );
    }
}
