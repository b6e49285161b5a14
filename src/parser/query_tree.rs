use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::debug;

use crate::{
    compiler::{normalize_whitespace, SqlWriter, DIALECTS},
    parser::{
        ast::{Node, NodeKind},
        builder::TreeBuilder,
        sql::SqlIngest,
        ParseOptions, ParserError, QlOptions, QueryType, Result, SqlOptions,
    },
};

/// A validated query tree together with the options it was parsed with.
///
/// Trees are immutable; rewriting passes produce a new tree.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryTree {
    root: Node,
    options: ParseOptions,
}

impl QueryTree {
    pub fn new(root: Node, options: ParseOptions) -> Self {
        Self { root, options }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Compiles the tree for `engine` (`pg` or `trino`).
    pub fn to(&self, engine: &str, options: &SqlOptions) -> Result<String> {
        let Some(dialect) = DIALECTS.get(engine) else {
            return ParserError::UnregisteredParser {
                node: self.root.expression_type().to_string(),
                engine: engine.to_string(),
            }.err();
        };

        debug!("compiling {} tree for {}", self.root.expression_type(), dialect.name());
        let w = SqlWriter::new(dialect.as_ref(), options);
        Ok(normalize_whitespace(&self.root.to_sql_aliased(&w)?))
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        self.root.to_ql(options)
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<String> {
        self.root.to_short(options)
    }

    /// Columns read from each real view. A view read through `*` maps to just
    /// `{"*"}`; CTEs and subqueries are not listed.
    pub fn view_columns(&self) -> IndexMap<String, IndexSet<String>> {
        let mut views: IndexMap<String, IndexSet<String>> = IndexMap::new();

        self.root.walk(&mut |node| match &node.kind {
            NodeKind::View(view) if !view.is_cte => {
                views.entry(view.name.clone()).or_default();
            },
            NodeKind::Column(column) => {
                let Some(origin) = &column.origin else {
                    return;
                };
                let columns = views.entry(origin.clone()).or_default();
                if columns.contains("*") {
                    return;
                }
                if column.is_wildcard() {
                    columns.clear();
                }
                columns.insert(column.column.clone());
            },
            _ => {},
        });

        views
    }

    /// Names of every parameter referenced by the tree.
    pub fn parameters(&self) -> IndexSet<String> {
        let mut parameters = IndexSet::new();
        self.root.walk(&mut |node| {
            if let NodeKind::Parameter(parameter) = &node.kind {
                parameters.insert(parameter.name.clone());
            }
        });
        parameters
    }
}

/// Builds a tree from QL JSON, or from SQL text (a JSON string) when
/// `options.query_type` is `Sql`.
pub fn parse_query_to_tree(query: &Value, options: &ParseOptions) -> Result<QueryTree> {
    debug!("parsing {:?} query", options.query_type);

    let builder = TreeBuilder::new(options);
    let root = match options.query_type {
        QueryType::Ql => builder.build_root(query)?,
        QueryType::Sql => {
            let Value::String(sql) = query else {
                return ParserError::invalid(format!("a sql query must be a string, got {}", query)).err();
            };
            builder.build_root(&SqlIngest::to_ql(sql)?)?
        },
    };

    Ok(QueryTree::new(root, options.clone()))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexSet;
    use serde_json::{json, Map};

    use crate::parser::{parse_query_to_tree, ParseOptions, ParserError, QlOptions, SqlOptions};

    #[test]
    pub fn test_view_columns() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "with": [{ "type": "select", "columns": ["x"], "from": "w", "as": "c" }],
            "from": "v",
            "joins": [{ "type": "join", "view": "c", "joinType": "cross" }],
            "columns": [
                { "type": "column", "column": "a", "view": "v" },
                { "type": "column", "column": "b", "view": "v" },
                { "type": "column", "column": "x", "view": "c" }
            ]
        }), &ParseOptions::new()).expect("Failed to parse tree");

        let views = tree.view_columns();
        assert_eq!(views.keys().collect::<Vec<_>>(), vec!["w", "v"]);
        assert_eq!(views["v"], IndexSet::from(["a".to_string(), "b".to_string()]));
        assert!(views["w"].is_empty());
    }

    #[test]
    pub fn test_wildcard_absorbs_columns() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": "v",
            "columns": [
                { "type": "column", "column": "a" },
                { "type": "column", "column": "*" },
                { "type": "column", "column": "b" }
            ]
        }), &ParseOptions::new()).expect("Failed to parse tree");

        assert_eq!(tree.view_columns()["v"], IndexSet::from(["*".to_string()]));
    }

    #[test]
    pub fn test_parameters() {
        let mut bindings = Map::new();
        bindings.insert("min".into(), json!(5));
        let options = ParseOptions::new().with_parameters(bindings);

        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": "v",
            "columns": [{ "type": "column", "column": "a" }],
            "where": { "type": "and", "operands": [
                { "type": "operator", "value": ">", "operands": [{ "type": "column", "column": "a" }, { "type": "parameter", "value": "min" }] },
                { "type": "operator", "value": "<", "operands": [{ "type": "column", "column": "a" }, { "type": "parameter", "value": "max" }] }
            ] }
        }), &options).expect("Failed to parse tree");

        assert_eq!(tree.parameters(), IndexSet::from(["min".to_string(), "max".to_string()]));

        let sql = tree.to("pg", &SqlOptions::new()).expect("Failed to compile");
        assert_eq!(sql, "SELECT \"v\".\"a\" FROM \"v\" WHERE ((\"v\".\"a\" > 5) AND (\"v\".\"a\" < NULL))");

        let ql = tree.to_ql(&QlOptions::new().with_keep_param_refs());
        assert_eq!(ql["where"]["operands"][0]["operands"][1], json!({ "type": "parameter", "value": "min" }));
    }

    #[test]
    pub fn test_sql_query_must_be_text() {
        match parse_query_to_tree(&json!({ "type": "select" }), &ParseOptions::sql()) {
            Err(ParserError::InvalidExpression(_)) => {},
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_to_short() {
        let tree = parse_query_to_tree(&json!({ "type": "column", "column": "a", "view": "v" }), &ParseOptions::new())
            .expect("Failed to parse tree");
        assert_eq!(tree.to_short(&QlOptions::new()).expect("Failed to shorten"), "@column(a,v)");

        let tree = parse_query_to_tree(&json!({ "type": "select", "from": "v", "columns": [1] }), &ParseOptions::new())
            .expect("Failed to parse tree");
        match tree.to_short(&QlOptions::new()) {
            Err(ParserError::NotShortable(_)) => {},
            _ => panic!(),
        }
    }

    #[test]
    pub fn test_unknown_engine() {
        let tree = parse_query_to_tree(&json!(1), &ParseOptions::new()).expect("Failed to parse tree");
        match tree.to("mysql", &SqlOptions::new()) {
            Err(ParserError::UnregisteredParser { engine, .. }) => assert_eq!(engine, "mysql"),
            _ => panic!(),
        }
    }
}
