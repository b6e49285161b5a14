pub mod scope;
pub use scope::*;
