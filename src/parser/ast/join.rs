use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{relation_to_ql, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        registry::ExpressionType,
        scope::Scope,
        ParserError, QlOptions, Result,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Cross,
    Lateral,
}

impl JoinType {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "inner" => Ok(JoinType::Inner),
            "left" => Ok(JoinType::Left),
            "right" => Ok(JoinType::Right),
            "cross" => Ok(JoinType::Cross),
            "lateral" => Ok(JoinType::Lateral),
            _ => ParserError::invalid(format!("join: unknown join type '{}'", value)).err(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Cross => "cross",
            JoinType::Lateral => "lateral",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinNode {
    pub join_type: JoinType,
    pub relation: Node,
    pub on: Option<Node>,
}

impl JoinNode {
    /// Builds one entry of `joins` and returns the scope with the joined
    /// relation registered. The `on` condition sees that scope.
    pub fn build(builder: &TreeBuilder, value: &Value, scope: &Scope) -> Result<(Node, Scope)> {
        let value = builder.normalize_relation(value)?;
        if !QlObject::is_type(&value, ExpressionType::Join) {
            return ParserError::invalid(format!("joins entries must be joins, got {}", value)).err();
        }
        let obj = QlObject::from_value(&value)?;
        obj.check_keys(&["joinType", "view", "on"])?;

        let relation_value = obj.required("view")?;
        let is_subquery = QlObject::is_type(builder.normalize_relation(relation_value)?.as_ref(), ExpressionType::Select);

        let has_on = obj.get("on").is_some();
        let join_type = match obj.opt_str("joinType")?.map(JoinType::parse).transpose()? {
            None | Some(JoinType::Inner) if !has_on => if is_subquery { JoinType::Lateral } else { JoinType::Cross },
            None => JoinType::Inner,
            Some(join_type) => join_type,
        };

        match join_type {
            JoinType::Left | JoinType::Right | JoinType::Inner if !has_on => {
                return Err(obj.error(format!("{} join requires 'on'", join_type.as_str())));
            },
            JoinType::Cross | JoinType::Lateral if has_on => {
                return Err(obj.error(format!("{} join cannot have 'on'", join_type.as_str())));
            },
            JoinType::Lateral if !is_subquery => {
                return Err(obj.error("lateral join requires a subquery"));
            },
            _ => {},
        }

        let (relation, scope) = builder.build_relation(relation_value, scope, join_type == JoinType::Lateral)?;
        let on = obj.get("on").map(|on| builder.build_expression(on, &scope)).transpose()?;

        let node = Node::new(NodeKind::Join(Box::new(JoinNode { join_type, relation, on })));
        let meta = obj.meta()?;
        Ok((node.fold(meta.alias, meta.cast)?, scope))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let relation = self.relation.to_sql_aliased(w)?;
        Ok(match (self.join_type, &self.on) {
            (JoinType::Cross, _) => format!("CROSS JOIN {}", relation),
            (JoinType::Lateral, _) => format!("CROSS JOIN LATERAL {}", relation),
            (join_type, Some(on)) => format!("{} JOIN {} ON {}", join_type.as_str().to_ascii_uppercase(), relation, on.to_sql(w)?),
            (join_type, None) => format!("{} JOIN {}", join_type.as_str().to_ascii_uppercase(), relation),
        })
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("join".into()));
        object.insert("joinType".into(), Value::String(self.join_type.as_str().into()));
        object.insert("view".into(), relation_to_ql(&self.relation, options));
        if let Some(on) = &self.on {
            object.insert("on".into(), on.to_ql(options));
        }
        Value::Object(object)
    }
}
