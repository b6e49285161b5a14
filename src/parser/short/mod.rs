pub mod short_value;
pub use short_value::*;

pub mod short_parser;
pub use short_parser::*;

pub mod short_forms;
pub use short_forms::*;

pub mod temporal;
