use serde_json::{json, Value};

use crate::parser::{
    ast::{Node, NodeKind},
    builder::{QlObject, TreeBuilder},
    registry::CastType,
    scope::Scope,
    short::{ShortExpression, ShortForms, ShortParser, ShortValue},
    QlOptions, Result,
};

/// A short expression retained next to its expansion (`keep_shorts`).
#[derive(Debug, Clone, PartialEq)]
pub struct ShortNode {
    /// Sanitized source, with any folded alias/cast merged into named args.
    pub expression: ShortExpression,
    pub inner: Box<Node>,
}

impl ShortNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["value"])?;

        let expression = ShortParser::parse(obj.str("value")?)?;
        let node = Self::expand(builder, expression, scope)?;

        let meta = obj.meta()?;
        node.fold(meta.alias, meta.cast)
    }

    /// Expands a parsed short into a node, keeping the wrapper only when the
    /// parse asked for it.
    pub fn expand(builder: &TreeBuilder, expression: ShortExpression, scope: &Scope) -> Result<Node> {
        let ql = ShortForms::expand(&expression)?;
        let inner = builder.build_expression(&ql, scope)?;

        match builder.options.keep_shorts {
            true => Ok(Node::new(NodeKind::Short(ShortNode { expression, inner: Box::new(inner) }))),
            false => Ok(inner),
        }
    }

    pub fn fold(self, alias: Option<String>, cast: Option<CastType>) -> Result<ShortNode> {
        let ShortNode { mut expression, inner } = self;
        let inner = inner.fold(alias.clone(), cast)?;

        if let Some(alias) = alias {
            expression.set_named("as", ShortValue::String(alias));
        }
        if let Some(cast) = cast {
            expression.set_named("cast", ShortValue::String(cast.to_string()));
        }

        Ok(ShortNode { expression, inner: Box::new(inner) })
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        match options.keep_shorts {
            true => json!({ "type": "short", "value": self.expression.to_string() }),
            false => self.inner.to_ql(options),
        }
    }
}
