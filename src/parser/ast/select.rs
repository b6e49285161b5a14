use serde_json::{Map, Value};
use tracing::trace;

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{to_ql_list, JoinNode, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        registry::ExpressionType,
        scope::Scope,
        ParserError, QlOptions, Result,
    },
};

/// Where a select sits in the tree; decides its scope and meta rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectRole {
    /// Top of the tree: no alias, no cast.
    Root,
    /// Entry of a WITH list: alias required, no cast.
    Cte,
    /// Relation in from/joins: alias required, no cast.
    Range { lateral: bool },
    /// Scalar or `IN`/`EXISTS` subquery.
    Subquery,
    /// Side of a set operation.
    Operand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperator {
    Union,
    Intersect,
    Except,
}

impl SetOperator {
    pub const ALL: [SetOperator; 3] = [SetOperator::Union, SetOperator::Intersect, SetOperator::Except];

    pub fn as_str(&self) -> &'static str {
        match self {
            SetOperator::Union => "union",
            SetOperator::Intersect => "intersect",
            SetOperator::Except => "except",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Count(u64),
    All,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectClauses {
    pub with: Vec<Node>,
    pub from: Option<Node>,
    pub joins: Vec<Node>,
    pub distinct: bool,
    pub columns: Vec<Node>,
    pub where_: Option<Node>,
    pub group_by: Vec<Node>,
    pub having: Option<Node>,
    pub order_by: Vec<Node>,
    pub limit: Option<Limit>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectBody {
    Clauses(SelectClauses),
    SetOperation { operator: SetOperator, all: bool, left: Node, right: Node },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectNode {
    pub body: SelectBody,
    pub role: SelectRole,
}

const CLAUSE_KEYS: [&str; 11] = ["with", "from", "joins", "distinct", "columns", "where", "having", "groupBy", "orderBy", "limit", "offset"];

impl SelectNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope, role: SelectRole) -> Result<Node> {
        let set_operators: Vec<SetOperator> = SetOperator::ALL.into_iter()
            .filter(|op| obj.get(op.as_str()).is_some())
            .collect();

        let body = match set_operators.as_slice() {
            [] => SelectBody::Clauses(Self::build_clauses(builder, obj, scope, role)?),
            [operator] => Self::build_set_operation(builder, obj, scope, *operator)?,
            _ => return Err(obj.error("only one of union, intersect or except is allowed")),
        };

        let node = Node::new(NodeKind::Select(Box::new(SelectNode { body, role })));
        let meta = obj.meta()?;
        let node = node.fold(meta.alias, meta.cast)?;

        if matches!(role, SelectRole::Cte | SelectRole::Range { .. }) && node.alias().is_none() {
            let what = if role == SelectRole::Cte { "a cte" } else { "a subquery in from or joins" };
            return ParserError::invalid(format!("{} must be aliased", what)).err();
        }

        Ok(node)
    }

    fn build_set_operation(builder: &TreeBuilder, obj: &QlObject, scope: &Scope, operator: SetOperator) -> Result<SelectBody> {
        if CLAUSE_KEYS.iter().any(|key| obj.get(key).is_some()) {
            return Err(obj.error(format!("{} cannot be mixed with select clauses", operator.as_str())));
        }
        obj.check_keys(&[operator.as_str(), "all"])?;

        let operands = obj.array(operator.as_str())?;
        let [left, right] = operands.as_slice() else {
            return Err(obj.error(format!("{} takes exactly two selects", operator.as_str())));
        };

        let build_operand = |value: &Value| -> Result<Node> {
            if !QlObject::is_type(value, ExpressionType::Select) {
                return Err(obj.error(format!("{} operands must be selects", operator.as_str())));
            }
            SelectNode::build(builder, &QlObject::from_value(value)?, scope, SelectRole::Operand)
        };

        Ok(SelectBody::SetOperation {
            operator,
            all: obj.opt_bool("all")?.unwrap_or(false),
            left: build_operand(left)?,
            right: build_operand(right)?,
        })
    }

    fn build_clauses(builder: &TreeBuilder, obj: &QlObject, scope: &Scope, role: SelectRole) -> Result<SelectClauses> {
        obj.check_keys(&CLAUSE_KEYS)?;

        let mut scope = scope.child_select(matches!(role, SelectRole::Range { lateral: true }));
        let mut clauses = SelectClauses::default();
        trace!("building {:?} select", role);

        for cte in obj.opt_array("with")?.into_iter().flatten() {
            if !QlObject::is_type(cte, ExpressionType::Select) {
                return Err(obj.error("with entries must be selects"));
            }
            let node = SelectNode::build(builder, &QlObject::from_value(cte)?, &scope, SelectRole::Cte)?;
            if let Some(name) = node.alias() {
                scope = scope.with_cte(name)?;
            }
            clauses.with.push(node);
        }

        if let Some(from) = obj.get("from") {
            let (node, next) = builder.build_relation(from, &scope, false)?;
            scope = next;
            clauses.from = Some(node);
        }

        for join in obj.opt_array("joins")?.into_iter().flatten() {
            let (node, next) = JoinNode::build(builder, join, &scope)?;
            scope = next;
            clauses.joins.push(node);
        }

        clauses.distinct = obj.opt_bool("distinct")?.unwrap_or(false);

        clauses.columns = builder.build_expressions(obj.array("columns")?, &scope)?;
        if clauses.columns.is_empty() {
            return Err(obj.error("at least one column is required"));
        }

        clauses.where_ = obj.get("where").map(|value| builder.build_expression(value, &scope)).transpose()?;
        clauses.having = obj.get("having").map(|value| builder.build_expression(value, &scope)).transpose()?;

        if let Some(group_by) = obj.opt_array("groupBy")? {
            clauses.group_by = builder.build_expressions(group_by, &scope)?;
        }
        if let Some(order_by) = obj.opt_array("orderBy")? {
            clauses.order_by = builder.build_expressions(order_by, &scope)?;
        }

        clauses.limit = obj.get("limit").map(|value| Self::parse_limit(obj, value)).transpose()?;
        clauses.offset = match obj.get("offset") {
            Some(value) => Some(value.as_u64().ok_or_else(|| obj.error(format!("offset must be a non-negative integer, got {}", value)))?),
            None => None,
        };

        Ok(clauses)
    }

    fn parse_limit(obj: &QlObject, value: &Value) -> Result<Limit> {
        match value {
            Value::String(s) if s.eq_ignore_ascii_case("all") => Ok(Limit::All),
            _ => value.as_u64()
                .map(Limit::Count)
                .ok_or_else(|| obj.error(format!("limit must be a non-negative integer or 'all', got {}", value))),
        }
    }

    pub fn children(&self) -> Vec<&Node> {
        match &self.body {
            SelectBody::SetOperation { left, right, .. } => vec![left, right],
            SelectBody::Clauses(clauses) => {
                let mut children: Vec<&Node> = clauses.with.iter().collect();
                children.extend(clauses.from.as_ref());
                children.extend(clauses.joins.iter());
                children.extend(clauses.columns.iter());
                children.extend(clauses.where_.as_ref());
                children.extend(clauses.group_by.iter());
                children.extend(clauses.having.as_ref());
                children.extend(clauses.order_by.iter());
                children
            },
        }
    }

    /// Parenthesized when used as an expression or relation.
    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let body = self.render_body(w)?;
        Ok(match self.role {
            SelectRole::Range { .. } | SelectRole::Subquery => format!("({})", body),
            SelectRole::Root | SelectRole::Cte | SelectRole::Operand => body,
        })
    }

    fn render_body(&self, w: &SqlWriter) -> Result<String> {
        let clauses = match &self.body {
            SelectBody::SetOperation { operator, all, left, right } => {
                let all = if *all { " ALL" } else { "" };
                return Ok(format!(
                    "({}) {}{} ({})",
                    left.to_sql(w)?,
                    operator.as_str().to_ascii_uppercase(),
                    all,
                    right.to_sql(w)?
                ));
            },
            SelectBody::Clauses(clauses) => clauses,
        };

        let mut parts = Vec::new();

        if !clauses.with.is_empty() {
            let ctes = clauses.with.iter()
                .map(|cte| {
                    let name = cte.alias().ok_or_else(|| ParserError::invalid("a cte must be aliased"))?;
                    Ok(format!("{} AS ({})", w.quote_ident(name), cte.to_sql(w)?))
                })
                .collect::<Result<Vec<_>>>()?;
            parts.push(format!("WITH {}", ctes.join(", ")));
        }

        let columns = clauses.columns.iter()
            .map(|column| column.to_sql_aliased(w))
            .collect::<Result<Vec<_>>>()?;
        let distinct = if clauses.distinct { "DISTINCT " } else { "" };
        parts.push(format!("SELECT {}{}", distinct, columns.join(", ")));

        if let Some(from) = &clauses.from {
            parts.push(format!("FROM {}", from.to_sql_aliased(w)?));
        }
        for join in &clauses.joins {
            parts.push(join.to_sql(w)?);
        }
        if let Some(where_) = &clauses.where_ {
            parts.push(format!("WHERE {}", where_.to_sql(w)?));
        }
        if !clauses.group_by.is_empty() {
            let group_by = clauses.group_by.iter().map(|node| node.to_sql(w)).collect::<Result<Vec<_>>>()?;
            parts.push(format!("GROUP BY {}", group_by.join(", ")));
        }
        if let Some(having) = &clauses.having {
            parts.push(format!("HAVING {}", having.to_sql(w)?));
        }
        if !clauses.order_by.is_empty() {
            let order_by = clauses.order_by.iter().map(|node| node.to_sql(w)).collect::<Result<Vec<_>>>()?;
            parts.push(format!("ORDER BY {}", order_by.join(", ")));
        }
        parts.extend(w.dialect.render_limit_offset(clauses.limit, clauses.offset));

        Ok(parts.join(" "))
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("select".into()));

        let clauses = match &self.body {
            SelectBody::SetOperation { operator, all, left, right } => {
                object.insert(operator.as_str().into(), Value::Array(vec![left.to_ql(options), right.to_ql(options)]));
                if *all {
                    object.insert("all".into(), Value::Bool(true));
                }
                return Value::Object(object);
            },
            SelectBody::Clauses(clauses) => clauses,
        };

        if !clauses.with.is_empty() {
            object.insert("with".into(), to_ql_list(&clauses.with, options));
        }
        if let Some(from) = &clauses.from {
            object.insert("from".into(), relation_to_ql(from, options));
        }
        if !clauses.joins.is_empty() {
            object.insert("joins".into(), to_ql_list(&clauses.joins, options));
        }
        if clauses.distinct {
            object.insert("distinct".into(), Value::Bool(true));
        }
        object.insert("columns".into(), to_ql_list(&clauses.columns, options));
        if let Some(where_) = &clauses.where_ {
            object.insert("where".into(), where_.to_ql(options));
        }
        if !clauses.group_by.is_empty() {
            object.insert("groupBy".into(), to_ql_list(&clauses.group_by, options));
        }
        if let Some(having) = &clauses.having {
            object.insert("having".into(), having.to_ql(options));
        }
        if !clauses.order_by.is_empty() {
            object.insert("orderBy".into(), to_ql_list(&clauses.order_by, options));
        }
        match clauses.limit {
            Some(Limit::Count(count)) => { object.insert("limit".into(), Value::from(count)); },
            Some(Limit::All) => { object.insert("limit".into(), Value::String("all".into())); },
            None => {},
        }
        if let Some(offset) = clauses.offset {
            object.insert("offset".into(), Value::from(offset));
        }

        Value::Object(object)
    }
}

/// Plain, unaliased views are written back as bare names.
pub fn relation_to_ql(relation: &Node, options: &QlOptions) -> Value {
    match &relation.kind {
        NodeKind::View(view) if relation.alias().is_none() => Value::String(view.name.clone()),
        _ => relation.to_ql(options),
    }
}
