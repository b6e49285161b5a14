pub mod parser_error;
pub use parser_error::*;

pub mod parse_options;
pub use parse_options::*;

pub mod registry;

pub mod scope;
pub use scope::*;

pub mod ast;

pub mod builder;
pub use builder::*;

pub mod short;
pub use short::{sanitize_short_expression, ShortExpression, ShortValue};

pub mod sql;

pub mod query_tree;
pub use query_tree::*;
