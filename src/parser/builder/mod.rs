pub mod ql_object;
pub use ql_object::*;

pub mod tree_builder;
pub use tree_builder::*;
