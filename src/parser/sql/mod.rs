pub mod short_extractor;
pub use short_extractor::*;

pub mod sql_ingest;
pub use sql_ingest::*;

pub mod literal_casts;
pub use literal_casts::*;

mod sql_select;
mod sql_expr;
