use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{ArrayNode, CaseNode, ColumnNode, FunctionNode, GeometryNode, JoinNode, ListNode, OperatorNode, ParameterNode, Primitive, SelectNode, SelectRole, ShortNode, SortNode, ViewNode},
        registry::{CastType, ExpressionType},
        short::{ShortExpression, ShortValue},
        ParserError, QlOptions, Result,
    },
};

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Select(Box<SelectNode>),
    Join(Box<JoinNode>),
    View(ViewNode),
    Column(ColumnNode),
    Parameter(ParameterNode),
    Function(FunctionNode),
    Geometry(GeometryNode),
    Operator(OperatorNode),
    Case(CaseNode),
    Array(ArrayNode),
    List(ListNode),
    Sort(Box<SortNode>),
    Primitive(Primitive),
    /// A short expression kept verbatim around its expansion.
    Short(ShortNode),
}

/// One expression of the query tree.
///
/// Alias and cast live on the node itself and are only ever attached through
/// [`Node::fold`], which enforces the per-kind capabilities and the
/// one-alias/one-cast rule. A `Short` node never holds meta of its own: it
/// forwards to the node it wraps.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    alias: Option<String>,
    cast: Option<CastType>,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self { kind, alias: None, cast: None }
    }

    pub fn primitive(value: Primitive) -> Self {
        Self::new(NodeKind::Primitive(value))
    }

    pub fn expression_type(&self) -> ExpressionType {
        match &self.kind {
            NodeKind::Select(_) => ExpressionType::Select,
            NodeKind::Join(_) => ExpressionType::Join,
            NodeKind::View(_) => ExpressionType::View,
            NodeKind::Column(_) => ExpressionType::Column,
            NodeKind::Parameter(_) => ExpressionType::Parameter,
            NodeKind::Function(_) => ExpressionType::Function,
            NodeKind::Geometry(_) => ExpressionType::Geometry,
            NodeKind::Operator(op) => op.expression_type(),
            NodeKind::Case(_) => ExpressionType::Case,
            NodeKind::Array(_) => ExpressionType::Array,
            NodeKind::List(_) => ExpressionType::List,
            NodeKind::Sort(_) => ExpressionType::Sort,
            NodeKind::Primitive(_) => ExpressionType::Primitive,
            NodeKind::Short(_) => ExpressionType::Short,
        }
    }

    pub fn can_alias(&self) -> bool {
        match &self.kind {
            NodeKind::Select(select) => !matches!(select.role, SelectRole::Root | SelectRole::Operand),
            NodeKind::List(_) | NodeKind::Sort(_) | NodeKind::Join(_) => false,
            NodeKind::Short(short) => short.inner.can_alias(),
            _ => true,
        }
    }

    pub fn can_cast(&self) -> bool {
        match &self.kind {
            NodeKind::Select(select) => select.role == SelectRole::Subquery,
            NodeKind::View(_) | NodeKind::List(_) | NodeKind::Sort(_) | NodeKind::Join(_) => false,
            NodeKind::Short(short) => short.inner.can_cast(),
            _ => true,
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Short(short) => short.inner.alias(),
            _ => self.alias.as_deref(),
        }
    }

    /// Explicit cast only.
    pub fn cast(&self) -> Option<CastType> {
        match &self.kind {
            NodeKind::Short(short) => short.inner.cast(),
            _ => self.cast,
        }
    }

    /// Explicit cast, else the function's default cast.
    pub fn effective_cast(&self) -> Option<CastType> {
        match &self.kind {
            NodeKind::Short(short) => short.inner.effective_cast(),
            NodeKind::Function(function) => self.cast.or_else(|| function.default_cast()),
            NodeKind::Geometry(geometry) => self.cast.or_else(|| geometry.geometry_type.default_cast()),
            _ => self.cast,
        }
    }

    pub fn has_meta(&self) -> bool {
        self.alias().is_some() || self.cast().is_some()
    }

    /// Absorbs an alias and/or cast into this node.
    ///
    /// Re-applying the value the node already holds is a no-op; a different
    /// value, or any meta on a kind that cannot carry it, fails.
    pub fn fold(self, alias: Option<String>, cast: Option<CastType>) -> Result<Node> {
        let Node { kind, alias: current_alias, cast: current_cast } = self;

        let kind = match kind {
            NodeKind::Short(short) => return Ok(Node::new(NodeKind::Short(short.fold(alias, cast)?))),
            kind => kind,
        };

        let mut node = Node { kind, alias: current_alias, cast: current_cast };

        if let Some(alias) = alias {
            if alias.is_empty() {
                return ParserError::IllegalAliasing("alias cannot be empty".into()).err();
            }
            if !node.can_alias() {
                return ParserError::IllegalAliasing(format!("{} cannot be aliased", node.describe())).err();
            }
            match &node.alias {
                Some(existing) if *existing != alias => {
                    return ParserError::IllegalAliasing(format!("cannot alias as '{}', already aliased as '{}'", alias, existing)).err();
                },
                _ => node.alias = Some(alias),
            }
        }

        if let Some(cast) = cast {
            if !node.can_cast() {
                return ParserError::IllegalCasting(format!("{} cannot be cast", node.describe())).err();
            }
            match node.cast {
                Some(existing) if existing != cast => {
                    return ParserError::IllegalCasting(format!("cannot cast to {}, already cast to {}", cast, existing)).err();
                },
                _ => node.cast = Some(cast),
            }
        }

        Ok(node)
    }

    fn describe(&self) -> String {
        match &self.kind {
            NodeKind::Select(select) => match select.role {
                SelectRole::Root => "root select".to_string(),
                SelectRole::Cte => "cte".to_string(),
                SelectRole::Range { .. } => "subquery in from".to_string(),
                SelectRole::Operand => "set operand".to_string(),
                SelectRole::Subquery => "select".to_string(),
            },
            _ => self.expression_type().to_string(),
        }
    }

    /// Direct child expressions, in source order.
    pub fn children(&self) -> Vec<&Node> {
        match &self.kind {
            NodeKind::Select(select) => select.children(),
            NodeKind::Join(join) => {
                let mut children = vec![&join.relation];
                children.extend(join.on.as_ref());
                children
            },
            NodeKind::View(_) | NodeKind::Column(_) | NodeKind::Primitive(_) => vec![],
            NodeKind::Parameter(parameter) => parameter.value.iter().map(|v| v.as_ref()).collect(),
            NodeKind::Function(function) => function.args.iter().collect(),
            NodeKind::Geometry(geometry) => geometry.args.iter().collect(),
            NodeKind::Operator(operator) => operator.operands.iter().collect(),
            NodeKind::Case(case) => case.children(),
            NodeKind::Array(array) => array.values.iter().collect(),
            NodeKind::List(list) => list.values.iter().collect(),
            NodeKind::Sort(sort) => vec![&sort.value],
            NodeKind::Short(short) => vec![short.inner.as_ref()],
        }
    }

    /// Pre-order traversal.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a Node)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let body = match &self.kind {
            NodeKind::Select(select) => select.to_sql(w)?,
            NodeKind::Join(join) => join.to_sql(w)?,
            NodeKind::View(view) => view.to_sql(w),
            NodeKind::Column(column) => column.to_sql(w),
            NodeKind::Parameter(parameter) => parameter.to_sql(w)?,
            NodeKind::Function(function) => function.to_sql(w)?,
            NodeKind::Geometry(geometry) => geometry.to_sql(w)?,
            NodeKind::Operator(operator) => operator.to_sql(w)?,
            NodeKind::Case(case) => case.to_sql(w)?,
            NodeKind::Array(array) => array.to_sql(w)?,
            NodeKind::List(list) => list.to_sql(w)?,
            NodeKind::Sort(sort) => sort.to_sql(w)?,
            NodeKind::Primitive(primitive) => primitive.to_sql(),
            NodeKind::Short(short) => return short.inner.to_sql(w),
        };

        match self.effective_cast() {
            Some(cast) => w.dialect.render_cast(&body, cast, self.literal()),
            None => Ok(body),
        }
    }

    /// SQL for positions that accept `AS alias` (projection, relations, root).
    pub fn to_sql_aliased(&self, w: &SqlWriter) -> Result<String> {
        let sql = self.to_sql(w)?;
        Ok(match self.alias() {
            Some(alias) => format!("{} AS {}", sql, w.quote_ident(alias)),
            None => sql,
        })
    }

    fn literal(&self) -> Option<&Primitive> {
        match &self.kind {
            NodeKind::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let value = match &self.kind {
            NodeKind::Short(short) => return short.to_ql(options),
            NodeKind::Parameter(parameter) => match parameter.substitute(options.keep_param_refs) {
                Some(bound) => bound.to_ql(options),
                None => parameter.to_ql(),
            },
            NodeKind::Select(select) => select.to_ql(options),
            NodeKind::Join(join) => join.to_ql(options),
            NodeKind::View(view) => view.to_ql(),
            NodeKind::Column(column) => column.to_ql(),
            NodeKind::Function(function) => function.to_ql(options),
            NodeKind::Geometry(geometry) => geometry.to_ql(options),
            NodeKind::Operator(operator) => operator.to_ql(options),
            NodeKind::Case(case) => case.to_ql(options),
            NodeKind::Array(array) => array.to_ql(options),
            NodeKind::List(list) => list.to_ql(options),
            NodeKind::Sort(sort) => sort.to_ql(options),
            NodeKind::Primitive(primitive) => primitive.to_value(),
        };

        attach_meta(value, self.alias.clone(), self.cast.map(|c| c.to_string()))
    }

    /// Short argument form of this node; scalars and arrays stay bare when
    /// they carry no meta.
    pub fn to_short_value(&self, options: &QlOptions) -> Result<ShortValue> {
        let value = match &self.kind {
            NodeKind::Short(short) if options.keep_shorts => return Ok(ShortValue::Short(short.expression.clone())),
            NodeKind::Short(short) => return short.inner.to_short_value(options),
            NodeKind::Parameter(parameter) => match parameter.substitute(options.keep_param_refs) {
                Some(bound) => bound.to_short_value(options)?,
                None => ShortValue::Short(parameter.to_short()),
            },
            NodeKind::View(view) => ShortValue::Short(view.to_short()),
            NodeKind::Column(column) => ShortValue::Short(column.to_short()),
            NodeKind::Function(function) => ShortValue::Short(function.to_short(options)?),
            NodeKind::Geometry(geometry) => ShortValue::Short(geometry.to_short(options)?),
            NodeKind::Operator(operator) => ShortValue::Short(operator.to_short(options)?),
            NodeKind::Array(array) => ShortValue::Array(array.to_short_values(options)?),
            NodeKind::List(list) => ShortValue::Short(list.to_short(options)?),
            NodeKind::Primitive(primitive) => primitive.to_short_value(),
            NodeKind::Select(_) | NodeKind::Join(_) | NodeKind::Sort(_) | NodeKind::Case(_) => {
                return ParserError::NotShortable(self.expression_type().to_string()).err();
            },
        };

        Ok(attach_short_meta(value, self.alias.clone(), self.cast))
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<String> {
        let expression = match self.to_short_value(options)? {
            ShortValue::Short(expression) => expression,
            array @ ShortValue::Array(_) => ShortExpression::new("array").arg(array),
            scalar => ShortExpression::new("primitive").arg(scalar),
        };
        Ok(expression.to_string())
    }
}

pub fn to_ql_list(nodes: &[Node], options: &QlOptions) -> Value {
    Value::Array(nodes.iter().map(|node| node.to_ql(options)).collect())
}

pub fn to_short_list(nodes: &[Node], options: &QlOptions) -> Result<ShortValue> {
    nodes.iter()
        .map(|node| node.to_short_value(options))
        .collect::<Result<Vec<_>>>()
        .map(ShortValue::Array)
}

pub fn to_sql_list(nodes: &[Node], w: &SqlWriter) -> Result<Vec<String>> {
    nodes.iter().map(|node| node.to_sql(w)).collect()
}

/// Puts `as`/`cast` onto a QL value. Bare scalars and arrays are promoted to
/// explicit `primitive`/`array` objects; an object that already holds a
/// different cast is wrapped in a `cast` expression.
pub fn attach_meta(value: Value, alias: Option<String>, cast: Option<String>) -> Value {
    if alias.is_none() && cast.is_none() {
        return value;
    }

    let mut object = match value {
        Value::Object(object) => object,
        Value::Array(values) => {
            let mut object = Map::new();
            object.insert("type".into(), Value::String("array".into()));
            object.insert("values".into(), Value::Array(values));
            object
        },
        scalar => {
            let mut object = Map::new();
            object.insert("type".into(), Value::String("primitive".into()));
            object.insert("value".into(), scalar);
            object
        },
    };

    if let Some(cast) = cast {
        match object.get("cast").and_then(Value::as_str) {
            Some(existing) if existing != cast => {
                let mut wrapper = Map::new();
                wrapper.insert("type".into(), Value::String("cast".into()));
                wrapper.insert("value".into(), Value::Object(object));
                wrapper.insert("cast".into(), Value::String(cast));
                object = wrapper;
            },
            _ => {
                object.insert("cast".into(), Value::String(cast));
            },
        }
    }

    if let Some(alias) = alias {
        object.insert("as".into(), Value::String(alias));
    }

    Value::Object(object)
}

fn attach_short_meta(value: ShortValue, alias: Option<String>, cast: Option<CastType>) -> ShortValue {
    if alias.is_none() && cast.is_none() {
        return value;
    }

    let mut expression = match value {
        ShortValue::Short(expression) => expression,
        array @ ShortValue::Array(_) => ShortExpression::new("array").arg(array),
        scalar => ShortExpression::new("primitive").arg(scalar),
    };

    if let Some(alias) = alias {
        expression.set_named("as", ShortValue::String(alias));
    }
    if let Some(cast) = cast {
        expression.set_named("cast", ShortValue::String(cast.to_string()));
    }

    ShortValue::Short(expression)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{
        ast::{attach_meta, GeometryNode, Node, NodeKind, Primitive},
        registry::{CastType, GeometryType},
        ParserError,
    };

    #[test]
    pub fn test_fold_same_cast_is_noop() {
        let node = Node::primitive(Primitive::Int(1))
            .fold(None, Some(CastType::Text))
            .expect("Failed to cast");
        let node = node.fold(None, Some(CastType::Text)).expect("Failed to recast");
        assert_eq!(node.cast(), Some(CastType::Text));
    }

    #[test]
    pub fn test_fold_conflicting_cast_fails() {
        let node = Node::primitive(Primitive::Int(1)).fold(None, Some(CastType::Text)).unwrap();
        match node.fold(None, Some(CastType::Integer)) {
            Err(ParserError::IllegalCasting(_)) => {},
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_fold_conflicting_alias_fails() {
        let node = Node::primitive(Primitive::Int(1)).fold(Some("a".into()), None).unwrap();
        assert!(node.clone().fold(Some("a".into()), None).is_ok());
        assert!(matches!(node.fold(Some("b".into()), None), Err(ParserError::IllegalAliasing(_))));
    }

    #[test]
    pub fn test_geometry_effective_cast() {
        let point = Node::new(NodeKind::Geometry(GeometryNode {
            geometry_type: GeometryType::Point,
            args: vec![Node::primitive(Primitive::Int(1)), Node::primitive(Primitive::Int(2))],
        }));
        assert_eq!(point.effective_cast(), None);

        let point = point.fold(None, Some(CastType::Text)).expect("Failed to cast");
        assert_eq!(point.effective_cast(), Some(CastType::Text));
    }

    #[test]
    pub fn test_list_cannot_carry_meta() {
        let list = Node::new(NodeKind::List(crate::parser::ast::ListNode { values: vec![Node::primitive(Primitive::Int(1))] }));
        assert!(matches!(list.clone().fold(Some("x".into()), None), Err(ParserError::IllegalAliasing(_))));
        assert!(matches!(list.fold(None, Some(CastType::Text)), Err(ParserError::IllegalCasting(_))));
    }

    #[test]
    pub fn test_attach_meta() {
        assert_eq!(attach_meta(json!(1), None, None), json!(1));
        assert_eq!(
            attach_meta(json!("a"), Some("x".into()), None),
            json!({ "type": "primitive", "value": "a", "as": "x" })
        );
        assert_eq!(
            attach_meta(json!({ "type": "column", "column": "a", "cast": "date" }), None, Some("text".into())),
            json!({ "type": "cast", "value": { "type": "column", "column": "a", "cast": "date" }, "cast": "text" })
        );
    }
}
