use serde_json::{json, Value};

use crate::{
    compiler::SqlWriter,
    parser::{
        ast::{to_ql_list, to_short_list, to_sql_list, Node, NodeKind},
        builder::{QlObject, TreeBuilder},
        registry::GeometryType,
        scope::Scope,
        short::{ShortExpression, ShortValue},
        QlOptions, Result,
    },
};

/// Geometry constructor: a point, WKT text, or a place looked up by id.
#[derive(Debug, Clone, PartialEq)]
pub struct GeometryNode {
    pub geometry_type: GeometryType,
    pub args: Vec<Node>,
}

impl GeometryNode {
    pub fn build(builder: &TreeBuilder, obj: &QlObject, scope: &Scope) -> Result<Node> {
        obj.check_keys(&["geometryType", "args"])?;

        let geometry_type = GeometryType::parse(obj.str("geometryType")?)?;
        let args = builder.build_expressions(obj.array("args")?, scope)?;
        geometry_type.arity().check(geometry_type.as_str(), args.len())?;

        Ok(Node::new(NodeKind::Geometry(GeometryNode { geometry_type, args })))
    }

    pub fn to_sql(&self, w: &SqlWriter) -> Result<String> {
        let args = to_sql_list(&self.args, w)?;
        w.dialect.render_geometry(self.geometry_type, &args)
    }

    pub fn to_ql(&self, options: &QlOptions) -> Value {
        json!({
            "type": "geometry",
            "geometryType": self.geometry_type.as_str(),
            "args": to_ql_list(&self.args, options),
        })
    }

    pub fn to_short(&self, options: &QlOptions) -> Result<ShortExpression> {
        Ok(ShortExpression::new("geo")
            .arg(ShortValue::String(self.geometry_type.as_str().to_string()))
            .arg(to_short_list(&self.args, options)?))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::parser::{builder::TreeBuilder, scope::Scope, ParseOptions, ParserError};

    #[test]
    pub fn test_point_needs_two_args() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);

        let result = builder.build_expression(&json!({ "type": "geometry", "geometryType": "point", "args": [1] }), &Scope::root());
        assert!(matches!(result, Err(ParserError::ArgsLength { .. })));

        let result = builder.build_expression(&json!({ "type": "geometry", "geometryType": "point", "args": [-79.4, 43.7] }), &Scope::root());
        assert!(result.is_ok());
    }

    #[test]
    pub fn test_unknown_geometry_type() {
        let options = ParseOptions::new();
        let builder = TreeBuilder::new(&options);
        let result = builder.build_expression(&json!({ "type": "geometry", "geometryType": "us-zip", "args": ["10001"] }), &Scope::root());
        assert!(matches!(result, Err(ParserError::InvalidGeometry(_))));
    }
}
