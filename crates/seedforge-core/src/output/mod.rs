pub mod dialect;
pub mod json;
pub mod sql;

pub use dialect::{dialect_for, sql_dialect, SqlDialect};
pub use json::write_json;
pub use sql::{write_sql, SqlOptions};
