use std::fmt;

use crate::parser::{ParserError, Result};

/// The `type` discriminant of a QL object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionType {
    Select,
    Column,
    Function,
    Operator,
    Cast,
    Case,
    Array,
    List,
    Sort,
    Join,
    View,
    Parameter,
    Short,
    Sql,
    Primitive,
    Geometry,
    And,
    Or,
}

impl ExpressionType {
    pub const ALL: [ExpressionType; 18] = [
        ExpressionType::Select, ExpressionType::Column, ExpressionType::Function, ExpressionType::Operator,
        ExpressionType::Cast, ExpressionType::Case, ExpressionType::Array, ExpressionType::List,
        ExpressionType::Sort, ExpressionType::Join, ExpressionType::View, ExpressionType::Parameter,
        ExpressionType::Short, ExpressionType::Sql, ExpressionType::Primitive, ExpressionType::Geometry,
        ExpressionType::And, ExpressionType::Or,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExpressionType::Select => "select",
            ExpressionType::Column => "column",
            ExpressionType::Function => "function",
            ExpressionType::Operator => "operator",
            ExpressionType::Cast => "cast",
            ExpressionType::Case => "case",
            ExpressionType::Array => "array",
            ExpressionType::List => "list",
            ExpressionType::Sort => "sort",
            ExpressionType::Join => "join",
            ExpressionType::View => "view",
            ExpressionType::Parameter => "parameter",
            ExpressionType::Short => "short",
            ExpressionType::Sql => "sql",
            ExpressionType::Primitive => "primitive",
            ExpressionType::Geometry => "geometry",
            ExpressionType::And => "and",
            ExpressionType::Or => "or",
        }
    }

    pub fn parse(name: &str) -> Result<ExpressionType> {
        let lname = name.to_ascii_lowercase();
        Self::ALL.iter()
            .find(|ty| ty.as_str() == lname)
            .copied()
            .ok_or_else(|| ParserError::invalid(format!("unknown expression type '{}'", name)))
    }
}

impl fmt::Display for ExpressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
