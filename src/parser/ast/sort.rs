use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{ast::{Node, NodeKind}, builder::{QlObject, TreeBuilder}, scope::Scope, ParserError, QlOptions, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NullsOrder {
    First,
    Last,
}

impl SortDirection {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            _ => ParserError::invalid(format!("sort: unknown direction '{}'", value)).err(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

impl NullsOrder {
    pub fn parse(value: &str) -> Result<Self> {
        match value.to_ascii_lowercase().as_str() {
            "first" => Ok(NullsOrder::First),
            "last" => Ok(NullsOrder::Last),
            _ => ParserError::invalid(format!("sort: unknown nulls order '{}'", value)).err(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NullsOrder::First => "first",
            NullsOrder::Last => "last",
        }
    }
}

/// An ORDER BY item.
#[derive(Debug, Clone, PartialEq)]
pub struct SortNode {
    pub value: Node,
    pub direction: Option<SortDirection>,
    pub nulls: Option<NullsOrder>,
}

impl SortNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["value", "direction", "nulls"])?;

        let value = builder.build_expression(obj.required("value")?, scope)?;
        let direction = obj.opt_str("direction")?.map(SortDirection::parse).transpose()?;
        let nulls = obj.opt_str("nulls")?.map(NullsOrder::parse).transpose()?;

        Ok(Node::new(NodeKind::Sort(Box::new(SortNode { value, direction, nulls }))))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let mut sql = self.value.to_sql(w)?;
        if let Some(direction) = self.direction {
            sql.push(' ');
            sql.push_str(&direction.as_str().to_ascii_uppercase());
        }
        if let Some(nulls) = self.nulls {
            sql.push_str(" NULLS ");
            sql.push_str(&nulls.as_str().to_ascii_uppercase());
        }
        Ok(sql)
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let mut object = Map::new();
        object.insert("type".into(), Value::String("sort".into()));
        object.insert("value".into(), self.value.to_ql(options));
        if let Some(direction) = self.direction {
            object.insert("direction".into(), Value::String(direction.as_str().into()));
        }
        if let Some(nulls) = self.nulls {
            object.insert("nulls".into(), Value::String(nulls.as_str().into()));
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{builder::TreeBuilder, scope::Scope, ParseOptions, ParserError};

    #[test]
    pub fn test_sort_cannot_be_aliased() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "sort", "value": 1, "as": "x" }), &Scope::root());
        assert!(matches!(result, Err(ParserError::IllegalAliasing(_))));
    }

    #[test]
    pub fn test_bad_direction() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        assert!(builder.build_expression(&json!({ "type": "sort", "value": 1, "direction": "up" }), &Scope::root()).is_err());
    }
}
