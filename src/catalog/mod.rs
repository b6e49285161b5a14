pub mod column_info;
pub use column_info::*;

pub mod view_catalog;
pub use view_catalog::*;

pub trait ViewProvider {
    /// Geo type (`ca-fsa`, `ca-da`, ...) of a view column, when the column
    /// holds a place id.
    fn geo_type_of(&self, view: &str, column: &str) -> Option<String>;
}
