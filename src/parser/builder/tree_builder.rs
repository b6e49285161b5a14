use std::borrow::Cow;

use indexmap::IndexSet;
use serde_json::Value;
use tracing::trace;

use crate::parser::{
    ast::{attach_meta, ArrayNode, CaseNode, ColumnNode, FunctionNode, GeometryNode, ListNode, Node, NodeKind, OperatorNode, ParameterNode, Primitive, SelectNode, SelectRole, ShortNode, SortNode, ViewNode},
    builder::QlObject,
    registry::ExpressionType,
    scope::{RefTarget, Scope},
    short::{ShortForms, ShortParser},
    sql::SqlIngest,
    ParseOptions, ParserError, Result,
};

/// Turns QL values into nodes, threading the scope through recursion.
pub struct TreeBuilder<'a> {
    pub options: &'a ParseOptions,
    /// bound parameters whose values are being built
    resolving: IndexSet<String>,
}

impl<'a> TreeBuilder<'a> {
    pub fn new(options: &'a ParseOptions) -> Self {
        Self { options, resolving: IndexSet::new() }
    }

    /// Builder for the bound value of parameter `name`. Fails when the value
    /// refers back to a parameter already being resolved.
    pub fn resolving(&self, name: &str) -> Result<TreeBuilder<'a>> {
        if self.resolving.contains(name) {
            let chain = self.resolving.iter().map(String::as_str).chain([name]).collect::<Vec<_>>().join(" -> ");
            return ParserError::InvalidParameter(format!("cyclic parameter binding: {}", chain)).err();
        }

        let mut resolving = self.resolving.clone();
        resolving.insert(name.to_string());
        Ok(TreeBuilder { options: self.options, resolving })
    }

    /// Builds the root of a tree. A select here is the root select and may
    /// not carry alias or cast.
    pub fn build_root(&self, value: &Value) -> Result<Node> {
        if QlObject::is_type(value, ExpressionType::Select) {
            let obj = QlObject::from_value(value)?;
            return SelectNode::build(self, &obj, &Scope::root(), SelectRole::Root);
        }

        self.build_expression(value, &Scope::root())
    }

    /// Builds a node in expression position: bare scalars are primitives and
    /// bare arrays are arrays.
    pub fn build_expression(&self, value: &Value, scope: &Scope) -> Result<Node> {
        match value {
            Value::Array(items) => Ok(Node::new(NodeKind::Array(ArrayNode { values: self.build_expressions(items, scope)? }))),
            Value::Object(_) => {
                let obj = QlObject::from_value(value)?;
                self.build_object(&obj, scope)
            },
            scalar => Ok(Node::primitive(Primitive::from_value(scalar)?)),
        }
    }

    pub fn build_expressions(&self, values: &[Value], scope: &Scope) -> Result<Vec<Node>> {
        values.iter().map(|value| self.build_expression(value, scope)).collect()
    }

    fn build_object(&self, obj: &QlObject, scope: &Scope) -> Result<Node> {
        let node = match obj.expression_type {
            ExpressionType::Select => return SelectNode::build(self, obj, scope, SelectRole::Subquery),
            ExpressionType::Short => return ShortNode::build(self, obj, scope),
            ExpressionType::Sql => return self.build_sql(obj, scope),
            ExpressionType::Cast => {
                obj.check_keys(&["value"])?;
                let meta = obj.meta()?;
                if meta.cast.is_none() {
                    return Err(obj.error("missing 'cast'"));
                }
                return self.build_expression(obj.required("value")?, scope)?.fold(meta.alias, meta.cast);
            },
            ExpressionType::View | ExpressionType::Join => {
                return Err(obj.error("only allowed in from and joins"));
            },
            ExpressionType::Column => ColumnNode::build(obj, scope)?,
            ExpressionType::Parameter => ParameterNode::build(self, obj, scope)?,
            ExpressionType::Function => FunctionNode::build(self, obj, scope)?,
            ExpressionType::Geometry => GeometryNode::build(self, obj, scope)?,
            ExpressionType::Operator | ExpressionType::And | ExpressionType::Or => OperatorNode::build(self, obj, scope)?,
            ExpressionType::Case => CaseNode::build(self, obj, scope)?,
            ExpressionType::Array => ArrayNode::build(self, obj, scope)?,
            ExpressionType::List => ListNode::build(self, obj, scope)?,
            ExpressionType::Sort => SortNode::build(self, obj, scope)?,
            ExpressionType::Primitive => {
                obj.check_keys(&["value"])?;
                Node::primitive(Primitive::from_value(obj.get("value").unwrap_or(&Value::Null))?)
            },
        };

        let meta = obj.meta()?;
        node.fold(meta.alias, meta.cast)
    }

    /// `{ type: 'sql', value }`: ingests the SQL text and folds the wrapper's
    /// meta into the result.
    fn build_sql(&self, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["value"])?;
        let ql = SqlIngest::to_ql(obj.str("value")?)?;
        let meta = obj.meta()?;
        self.build_expression(&ql, scope)?.fold(meta.alias, meta.cast)
    }

    /// Expands `short` and `sql` wrappers in relation position so the caller
    /// can inspect what the relation really is.
    pub fn normalize_relation<'v>(&self, value: &'v Value) -> Result<Cow<'v, Value>> {
        let Value::Object(_) = value else {
            return Ok(Cow::Borrowed(value));
        };

        let obj = QlObject::from_value(value)?;
        let expanded = match obj.expression_type {
            ExpressionType::Short => {
                obj.check_keys(&["value"])?;
                ShortForms::expand(&ShortParser::parse(obj.str("value")?)?)?
            },
            ExpressionType::Sql => {
                obj.check_keys(&["value"])?;
                SqlIngest::to_ql(obj.str("value")?)?
            },
            _ => return Ok(Cow::Borrowed(value)),
        };

        let alias = obj.opt_str("as")?.map(str::to_string);
        let cast = obj.opt_str("cast")?.map(str::to_string);
        Ok(Cow::Owned(attach_meta(expanded, alias, cast)))
    }

    /// Builds a from/join relation and registers it in the returned scope.
    pub fn build_relation(&self, value: &Value, scope: &Scope, lateral: bool) -> Result<(Node, Scope)> {
        let value = self.normalize_relation(value)?;

        let node = match value.as_ref() {
            Value::String(name) => ViewNode::from_name(name, scope)?,
            Value::Object(_) => {
                let obj = QlObject::from_value(&value)?;
                match obj.expression_type {
                    ExpressionType::View => ViewNode::build(&obj, scope)?,
                    ExpressionType::Select => SelectNode::build(self, &obj, scope, SelectRole::Range { lateral })?,
                    other => return ParserError::invalid(format!("{} cannot be used as a relation", other)).err(),
                }
            },
            other => return ParserError::invalid(format!("invalid relation {}", other)).err(),
        };

        let (name, target) = match &node.kind {
            NodeKind::View(view) => {
                let target = if view.is_cte { RefTarget::Cte(view.name.clone()) } else { RefTarget::View(view.name.clone()) };
                (node.alias().unwrap_or(&view.name).to_string(), target)
            },
            _ => match node.alias() {
                Some(alias) => (alias.to_string(), RefTarget::Subquery),
                None => return ParserError::invalid("a subquery in from or joins must be aliased").err(),
            },
        };

        trace!("registering ref '{}' -> {:?}", name, target);
        let scope = scope.with_ref(&name, target)?;
        Ok((node, scope))
    }
}
