use serde_json::{json, Value};

use crate::{
    compiler::SqlWriter,
    parser::{ast::{Node, NodeKind}, builder::QlObject, scope::Scope, short::{ShortExpression, ShortValue}, ParserError, Result},
};

/// A named view (or CTE) used as a relation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewNode {
    pub name: String,
    pub is_cte: bool,
}

impl ViewNode {
    pub fn build(obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["view"])?;
        let node = Self::from_name(obj.str("view")?, scope)?;
        let meta = obj.meta()?;
        node.fold(meta.alias, meta.cast)
    }

    pub fn from_name(name: &str, scope: &Scope) -> Result<Node> {
        if name.is_empty() {
            return ParserError::invalid("view name cannot be empty").err();
        }

        Ok(Node::new(NodeKind::View(ViewNode { name: name.to_string(), is_cte: scope.is_cte(name) })))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> String {
        w.quote_ident(&self.name)
    }

    pub fn to_ql(&self) -> Value {
        json!({ "type": "view", "view": self.name })
    }

    pub fn to_short(&self) -> ShortExpression {
        ShortExpression::new("view").arg(ShortValue::String(self.name.clone()))
    }
}
