use serde_json::{json, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{to_ql_list, to_short_list, to_sql_list, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        scope::Scope,
        short::{ShortExpression, ShortValue},
        QlOptions, Result,
    },
};

/// `ARRAY[..]` value.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayNode {
    pub values: Vec<Node>,
}

/// Parenthesized value list, the right-hand side of `IN`.
#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    pub values: Vec<Node>,
}

impl ArrayNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["values"])?;
        let values = builder.build_expressions(obj.array("values")?, scope)?;
        Ok(Node::new(NodeKind::Array(ArrayNode { values })))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        Ok(w.dialect.render_array(&to_sql_list(&self.values, w)?))
    }

    /// Bare JSON array.
    pub fn to_ql(&self, options: &QlOptions) -> Value {
        to_ql_list(&self.values, options)
    }

    pub fn to_short_values(&self, options: &QlOptions) -> Result<Vec<ShortValue>> {
        match to_short_list(&self.values, options)? {
            ShortValue::Array(values) => Ok(values),
            other => Ok(vec![other]),
        }
    }
}

impl ListNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["values"])?;
        let values = builder.build_expressions(obj.array("values")?, scope)?;
        if values.is_empty() {
            return Err(obj.error("a list cannot be empty"));
        }
        Ok(Node::new(NodeKind::List(ListNode { values })))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        Ok(format!("({})", to_sql_list(&self.values, w)?.join(", ")))
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        json!({ "type": "list", "values": to_ql_list(&self.values, options) })
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<ShortExpression> {
        Ok(ShortExpression::new("list").arg(to_short_list(&self.values, options)?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{builder::TreeBuilder, scope::Scope, ParseOptions, QlOptions};

    #[test]
    pub fn test_array_object_and_bare_array_are_equal() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let explicit = builder.build_expression(&json!({ "type": "array", "values": [1, 2] }), &Scope::root()).unwrap();
        let bare = builder.build_expression(&json!([1, 2]), &Scope::root()).unwrap();
        assert_eq!(explicit, bare);
        assert_eq!(bare.to_ql(&QlOptions::new()), json!([1, 2]));
    }

    #[test]
    pub fn test_empty_list_rejected() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        assert!(builder.build_expression(&json!({ "type": "list", "values": [] }), &Scope::root()).is_err());
    }

    #[test]
    pub fn test_list_short() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let list = builder.build_expression(&json!({ "type": "list", "values": [1, "a b"] }), &Scope::root()).unwrap();
        assert_eq!(list.to_short(&QlOptions::new()).unwrap(), "@list([1,'a b'])");
    }
}
