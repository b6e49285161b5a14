pub mod sql_dialect;
pub use sql_dialect::*;

pub mod dialect_registry;
pub use dialect_registry::*;

pub mod sql_writer;
pub use sql_writer::*;

pub mod pg_dialect;
pub use pg_dialect::*;

pub mod trino_dialect;
pub use trino_dialect::*;

pub mod whitespace;
pub use whitespace::*;
