pub mod catalog;
pub mod file;
pub mod postgres;
pub mod sqlite;
pub mod types;

pub use catalog::{detect_dialect, read_catalog, CatalogReader};
pub use file::read_schema_file;
pub use types::{Column, DatabaseSchema, Dialect, ForeignKey, SqlType, Table};
