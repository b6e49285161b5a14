pub mod arity;
pub use arity::*;

pub mod expression_type;
pub use expression_type::*;

pub mod cast_type;
pub use cast_type::*;

pub mod geometry_type;
pub use geometry_type::*;

pub mod operators;
pub use operators::*;

pub mod functions;
pub use functions::*;
