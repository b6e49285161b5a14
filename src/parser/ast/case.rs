use serde_json::{Map, Value};

use crate::{
    compiler::SqlWriter,
    parser::{ast::{Node, NodeKind}, builder::{QlObject, TreeBuilder}, scope::Scope, ParserError, QlOptions, Result},
};

/// `CASE WHEN .. THEN .. [ELSE ..] END`
#[derive(Debug, Clone, PartialEq)]
pub struct CaseNode {
    pub cases: Vec<(Node, Node)>,
    pub default_case: Option<Box<Node>>,
}

impl CaseNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["cases", "defaultCase"])?;

        let raw_cases = obj.array("cases")?;
        if raw_cases.is_empty() {
            return Err(obj.error("at least one case is required"));
        }

        let mut cases = Vec::with_capacity(raw_cases.len());
        for case in raw_cases {
            match case.as_array().map(Vec::as_slice) {
                Some([when, then]) => cases.push((builder.build_expression(when, scope)?, builder.build_expression(then, scope)?)),
                _ => return ParserError::invalid(format!("case: each case must be a [when, then] pair, got {}", case)).err(),
            }
        }

        let default_case = obj.get("defaultCase")
            .map(|value| builder.build_expression(value, scope).map(Box::new))
            .transpose()?;

        Ok(Node::new(NodeKind::Case(CaseNode { cases, default_case })))
    }

    pub fn children(&self) -> Vec<&Node> {
        let mut children = Vec::with_capacity(self.cases.len() * 2 + 1);
        for (when, then) in &self.cases {
            children.push(when);
            children.push(then);
        }
        children.extend(self.default_case.as_deref());
        children
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let mut sql = String::from("CASE");
        for (when, then) in &self.cases {
            sql.push_str(&format!(" WHEN {} THEN {}", when.to_sql(w)?, then.to_sql(w)?));
        }
        if let Some(default_case) = &self.default_case {
            sql.push_str(&format!(" ELSE {}", default_case.to_sql(w)?));
        }
        sql.push_str(" END");
        Ok(sql)
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        let cases = self.cases.iter()
            .map(|(when, then)| Value::Array(vec![when.to_ql(options), then.to_ql(options)]))
            .collect();

        let mut object = Map::new();
        object.insert("type".into(), Value::String("case".into()));
        object.insert("cases".into(), Value::Array(cases));
        if let Some(default_case) = &self.default_case {
            object.insert("defaultCase".into(), default_case.to_ql(options));
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{builder::TreeBuilder, scope::Scope, ParseOptions};

    #[test]
    pub fn test_cases_must_be_pairs() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        assert!(builder.build_expression(&json!({ "type": "case", "cases": [[true]] }), &Scope::root()).is_err());
        assert!(builder.build_expression(&json!({ "type": "case", "cases": [] }), &Scope::root()).is_err());
        assert!(builder.build_expression(&json!({ "type": "case", "cases": [[true, 1]], "defaultCase": 0 }), &Scope::root()).is_ok());
    }
}
