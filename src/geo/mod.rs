pub mod geo_rewriter;
pub use geo_rewriter::*;
