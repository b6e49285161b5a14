use std::{collections::VecDeque, rc::Rc};

use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::{
    catalog::ViewProvider,
    parser::{parse_query_to_tree, registry::GeometryType, ParseOptions, ParserError, QlOptions, QueryTree, QueryType, Result},
};

/// ref name -> real view name, for one select
type Refs = IndexMap<String, String>;

/// Rewrites `a = b` between geo columns of different geo types into
/// `geo_intersects(geometry(typeA, a), geometry(typeB, b))`.
///
/// Same-type equalities are left alone. The tree is rebuilt only when at
/// least one predicate was rewritten; otherwise it is returned as is.
pub fn insert_geo_intersects_in_tree<P: ViewProvider + ?Sized>(views: &P, tree: QueryTree) -> Result<QueryTree> {
    let mut ql = tree.to_ql(&QlOptions::new().with_keep_param_refs());
    let rewritten = GeoRewriter { views }.rewrite(&mut ql)?;

    if rewritten == 0 {
        debug!("geo rewrite: no cross-type geo equality found");
        return Ok(tree);
    }

    debug!("geo rewrite: {} predicates rewritten, rebuilding tree", rewritten);
    let options = ParseOptions { query_type: QueryType::Ql, ..tree.options().clone() };
    parse_query_to_tree(&ql, &options)
}

struct GeoRewriter<'a, P: ?Sized> {
    views: &'a P,
}

impl<'a, P: ViewProvider + ?Sized> GeoRewriter<'a, P> {
    /// Breadth-first over the QL value; returns the number of rewrites.
    fn rewrite(&self, root: &mut Value) -> Result<usize> {
        let mut count = 0;
        let mut queue: VecDeque<(&mut Value, Rc<Refs>)> = VecDeque::new();
        queue.push_back((root, Rc::new(Refs::new())));

        while let Some((value, refs)) = queue.pop_front() {
            let refs = match Self::select_refs(value) {
                Some(select_refs) => Rc::new(select_refs),
                None => refs,
            };

            if let Some(replacement) = self.substitute(value, &refs)? {
                *value = replacement;
                count += 1;
                continue;
            }

            match value {
                Value::Object(object) => {
                    for child in object.values_mut() {
                        queue.push_back((child, Rc::clone(&refs)));
                    }
                },
                Value::Array(items) => {
                    for child in items.iter_mut() {
                        queue.push_back((child, Rc::clone(&refs)));
                    }
                },
                _ => {},
            }
        }

        Ok(count)
    }

    /// Refs introduced by a clause-form select's `from` and `joins`.
    fn select_refs(value: &Value) -> Option<Refs> {
        let object = value.as_object()?;
        if object.get("type").and_then(Value::as_str) != Some("select") || !object.contains_key("columns") {
            return None;
        }

        let mut refs = Refs::new();
        let relations = object.get("from").into_iter().chain(
            object.get("joins")
                .and_then(Value::as_array)
                .into_iter()
                .flatten()
                .filter_map(|join| join.get("view")),
        );
        for relation in relations {
            match relation {
                Value::String(view) => {
                    refs.insert(view.clone(), view.clone());
                },
                Value::Object(relation) if relation.get("type").and_then(Value::as_str) == Some("view") => {
                    if let Some(view) = relation.get("view").and_then(Value::as_str) {
                        let name = relation.get("as").and_then(Value::as_str).unwrap_or(view);
                        refs.insert(name.to_string(), view.to_string());
                    }
                },
                _ => {},
            }
        }
        Some(refs)
    }

    fn substitute(&self, value: &Value, refs: &Refs) -> Result<Option<Value>> {
        let Some(object) = value.as_object() else {
            return Ok(None);
        };
        if object.get("type").and_then(Value::as_str) != Some("operator")
            || object.get("value").and_then(Value::as_str) != Some("=")
            || object.contains_key("qualifier")
        {
            return Ok(None);
        }

        let Some([left, right]) = object.get("operands").and_then(Value::as_array).map(Vec::as_slice) else {
            return Ok(None);
        };
        let (Some(left_type), Some(right_type)) = (self.geo_type(left, refs), self.geo_type(right, refs)) else {
            return Ok(None);
        };
        if left_type == right_type {
            return Ok(None);
        }

        trace!("geo rewrite: {} = {} across {} and {}", left, right, left_type, right_type);

        let mut function = Map::new();
        function.insert("type".into(), json!("function"));
        function.insert("value".into(), json!("geo_intersects"));
        function.insert("args".into(), json!([
            Self::geometry(&left_type, left)?,
            Self::geometry(&right_type, right)?,
        ]));
        for key in ["as", "cast"] {
            if let Some(meta) = object.get(key) {
                function.insert(key.into(), meta.clone());
            }
        }
        Ok(Some(Value::Object(function)))
    }

    /// Geo type of a plain column operand, resolved through the select refs.
    fn geo_type(&self, operand: &Value, refs: &Refs) -> Option<String> {
        let object = operand.as_object()?;
        if object.get("type").and_then(Value::as_str) != Some("column") || object.contains_key("cast") {
            return None;
        }

        let column = object.get("column").and_then(Value::as_str)?;
        let view = match object.get("view").and_then(Value::as_str) {
            Some(name) => refs.get(name)?,
            None if refs.len() == 1 => refs.first()?.1,
            None => return None,
        };
        self.views.geo_type_of(view, column)
    }

    fn geometry(geo_type: &str, column: &Value) -> Result<Value> {
        let geometry_type = GeometryType::parse(geo_type)?;
        if !geometry_type.is_place() {
            return ParserError::InvalidGeometry(format!("'{}' cannot be used as a column geo type", geo_type)).err();
        }

        let mut column = column.clone();
        if let Some(object) = column.as_object_mut() {
            object.remove("as");
        }
        Ok(json!({ "type": "geometry", "geometryType": geometry_type.as_str(), "args": [column] }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::{
        catalog::{ColumnInfo, ViewCatalog, ViewInfo},
        geo::insert_geo_intersects_in_tree,
        parser::{parse_query_to_tree, ParseOptions, ParserError, QlOptions},
    };

    fn catalog() -> ViewCatalog {
        let mut catalog = ViewCatalog::new();
        catalog.insert("sales", ViewInfo::with_columns([
            ("fsa".to_string(), ColumnInfo::geo("ca-fsa")),
            ("fsa2".to_string(), ColumnInfo::geo("ca-fsa")),
            ("amount".to_string(), ColumnInfo::default()),
        ]));
        catalog.insert("regions", ViewInfo::with_columns([
            ("da".to_string(), ColumnInfo::geo("ca-da")),
            ("bogus".to_string(), ColumnInfo::geo("point")),
        ]));
        catalog
    }

    #[test]
    pub fn test_cross_type_equality_in_join() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": { "type": "view", "view": "sales", "as": "s" },
            "joins": [{
                "type": "join",
                "joinType": "inner",
                "view": "regions",
                "on": { "type": "operator", "value": "=", "operands": [
                    { "type": "column", "column": "fsa", "view": "s" },
                    { "type": "column", "column": "da", "view": "regions" }
                ] }
            }],
            "columns": [{ "type": "column", "column": "amount", "view": "s" }]
        }), &ParseOptions::new()).expect("Failed to parse tree");

        let tree = insert_geo_intersects_in_tree(&catalog(), tree).expect("Failed to rewrite");
        let ql = tree.to_ql(&QlOptions::new());

        assert_eq!(ql["joins"][0]["on"], json!({
            "type": "function",
            "value": "geo_intersects",
            "args": [
                { "type": "geometry", "geometryType": "ca-fsa", "args": [{ "type": "column", "column": "fsa", "view": "s" }] },
                { "type": "geometry", "geometryType": "ca-da", "args": [{ "type": "column", "column": "da", "view": "regions" }] }
            ]
        }));
    }

    #[test]
    pub fn test_same_type_equality_untouched() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": "sales",
            "columns": [{ "type": "column", "column": "amount" }],
            "where": { "type": "operator", "value": "=", "operands": [
                { "type": "column", "column": "fsa" },
                { "type": "column", "column": "fsa2" }
            ] }
        }), &ParseOptions::new()).expect("Failed to parse tree");

        let rewritten = insert_geo_intersects_in_tree(&catalog(), tree.clone()).expect("Failed to rewrite");
        assert_eq!(rewritten, tree);
    }

    #[test]
    pub fn test_subquery_uses_its_own_refs() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": "sales",
            "columns": [{ "type": "column", "column": "amount" }],
            "where": { "type": "operator", "value": "exists", "operands": [{
                "type": "select",
                "from": "regions",
                "joins": [{ "type": "join", "joinType": "cross", "view": { "type": "view", "view": "sales", "as": "s2" } }],
                "columns": [{ "type": "operator", "value": "=", "operands": [
                    { "type": "column", "column": "da", "view": "regions" },
                    { "type": "column", "column": "fsa", "view": "s2" }
                ], "as": "hit" }]
            }] }
        }), &ParseOptions::new()).expect("Failed to parse tree");

        let ql = insert_geo_intersects_in_tree(&catalog(), tree).expect("Failed to rewrite").to_ql(&QlOptions::new());
        let predicate = &ql["where"]["operands"][0]["columns"][0];
        assert_eq!(predicate["value"], json!("geo_intersects"));
        assert_eq!(predicate["as"], json!("hit"));
    }

    #[test]
    pub fn test_non_place_geo_type_fails() {
        let tree = parse_query_to_tree(&json!({
            "type": "select",
            "from": "sales",
            "joins": [{ "type": "join", "joinType": "cross", "view": "regions" }],
            "columns": [{ "type": "operator", "value": "=", "operands": [
                { "type": "column", "column": "fsa", "view": "sales" },
                { "type": "column", "column": "bogus", "view": "regions" }
            ] }]
        }), &ParseOptions::new()).expect("Failed to parse tree");

        match insert_geo_intersects_in_tree(&catalog(), tree) {
            Err(ParserError::InvalidGeometry(_)) => {},
            _ => panic!(),
        }
    }
}
