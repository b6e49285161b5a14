pub mod parser;
pub use parser::{
    parse_query_to_tree, sanitize_short_expression, ParseOptions, ParserError, QlOptions, QueryTree, QueryType,
    Result, SqlOptions,
};

pub mod compiler;
pub use compiler::{DialectRegistry, SqlDialect};

pub mod catalog;
pub use catalog::{ColumnInfo, ViewCatalog, ViewInfo, ViewProvider};

pub mod geo;
pub use geo::insert_geo_intersects_in_tree;
