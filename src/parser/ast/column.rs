use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{ast::{Node, NodeKind}, builder::QlObject, scope::Scope, short::{ShortExpression, ShortValue}, Result},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNode {
    /// Column name, or `*`.
    pub column: String,
    /// View as written in the source.
    pub view: Option<String>,
    /// Ref the column is qualified with in SQL.
    pub qualifier: Option<String>,
    /// Real view the column belongs to (none for CTEs and subqueries).
    pub origin: Option<String>,
}

impl ColumnNode {
    pub fn build(obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["column", "view"])?;

        let column = obj.str("column")?;
        let view = obj.opt_str("view")?;
        let resolved = scope.resolve_column(view, column)?;

        Ok(Node::new(NodeKind::Column(ColumnNode {
            column: column.to_string(),
            view: view.map(str::to_string),
            qualifier: resolved.qualifier,
            origin: resolved.origin,
        })))
    }

    pub fn is_wildcard(&self) -> bool {
        self.column == "*"
    }

    pub fn to_sql(&self, w: &SqlWriter) -> String {
        let column = match self.is_wildcard() {
            true => "*".to_string(),
            false => w.quote_ident(&self.column),
        };

        match &self.qualifier {
            Some(qualifier) => format!("{}.{}", w.quote_ident(qualifier), column),
            None => column,
        }
    }

    pub fn to_ql(&self) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("column".into()));
        object.insert("column".into(), Value::String(self.column.clone()));
        if let Some(view) = &self.view {
            object.insert("view".into(), Value::String(view.clone()));
        }
        Value::Object(object)
    }

    pub fn to_short(&self) -> ShortExpression {
        let expression = ShortExpression::new("column").arg(ShortValue::String(self.column.clone()));
        match &self.view {
            Some(view) => expression.arg(ShortValue::String(view.clone())),
            None => expression,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{ast::NodeKind, builder::TreeBuilder, scope::{RefTarget, Scope}, ParseOptions, ParserError};

    #[test]
    pub fn test_build_resolves_against_scope() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let scope = Scope::root().child_select(false).with_ref("x", RefTarget::View("visits".into())).unwrap();

        let node = builder.build_expression(&json!({ "type": "column", "column": "a" }), &scope)
            .expect("Failed to build column");

        match node.kind {
            NodeKind::Column(column) => {
                assert_eq!(column.qualifier.as_deref(), Some("x"));
                assert_eq!(column.origin.as_deref(), Some("visits"));
                assert_eq!(column.view, None);
            },
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_unknown_view() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let scope = Scope::root().child_select(false).with_ref("x", RefTarget::View("visits".into())).unwrap();

        let result = builder.build_expression(&json!({ "type": "column", "column": "a", "view": "visits" }), &scope);
        assert!(matches!(result, Err(ParserError::UnknownView(_))));
    }

    #[test]
    pub fn test_empty_column_rejected() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        assert!(builder.build_expression(&json!({ "type": "column", "column": "" }), &Scope::root()).is_err());
    }
}
