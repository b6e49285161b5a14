pub mod node;
pub use node::*;

pub mod primitive;
pub use primitive::*;

pub mod select;
pub use select::*;

pub mod join;
pub use join::*;

pub mod view;
pub use view::*;

pub mod column;
pub use column::*;

pub mod parameter;
pub use parameter::*;

pub mod function;
pub use function::*;

pub mod geometry;
pub use geometry::*;

pub mod operator;
pub use operator::*;

pub mod case;
pub use case::*;

pub mod collection;
pub use collection::*;

pub mod sort;
pub use sort::*;

pub mod short_node;
pub use short_node::*;
