//! # SQL Dialects
//!
//! Identifier quoting, literal rendering and transaction framing for each
//! supported database. Dialects are stateless; pick one with
//! [`dialect_for`] from a driver name or connection URL.

use crate::error::Result;
use crate::generate::value::{hex_encode, Value};
use crate::schema::catalog::detect_dialect;
use crate::schema::types::Dialect;

pub trait SqlDialect {
    fn name(&self) -> &'static str;

    fn quote_identifier(&self, name: &str) -> String;

    /// Render a value as a SQL literal.
    fn literal(&self, value: &Value) -> String;

    /// Statements opening the seeding transaction.
    fn begin(&self, deferred: bool) -> Vec<String>;

    /// Statements closing the seeding transaction.
    fn commit(&self, deferred: bool) -> Vec<String>;
}

pub struct PostgresDialect;
pub struct MySqlDialect;
pub struct SqliteDialect;

impl SqlDialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => String::from(if *b { "TRUE" } else { "FALSE" }),
            Value::Bytes(b) => format!("'\\x{}'", hex_encode(b)),
            Value::Json(j) => format!("{}::jsonb", quote_text(&j.to_string())),
            other => common_literal(other, quote_text),
        }
    }

    fn begin(&self, deferred: bool) -> Vec<String> {
        let mut statements = vec!["BEGIN;".to_string()];
        if deferred {
            statements.push("SET CONSTRAINTS ALL DEFERRED;".to_string());
        }
        statements
    }

    fn commit(&self, _deferred: bool) -> Vec<String> {
        vec!["COMMIT;".to_string()]
    }
}

impl SqlDialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Value::Bytes(b) => format!("X'{}'", hex_encode(b)),
            other => common_literal(other, quote_mysql_text),
        }
    }

    // MySQL has no deferrable constraints; FK checks are switched off for the
    // session instead.
    fn begin(&self, deferred: bool) -> Vec<String> {
        let mut statements = Vec::new();
        if deferred {
            statements.push("SET FOREIGN_KEY_CHECKS = 0;".to_string());
        }
        statements.push("START TRANSACTION;".to_string());
        statements
    }

    fn commit(&self, deferred: bool) -> Vec<String> {
        let mut statements = vec!["COMMIT;".to_string()];
        if deferred {
            statements.push("SET FOREIGN_KEY_CHECKS = 1;".to_string());
        }
        statements
    }
}

impl SqlDialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        format!("\"{}\"", name.replace('"', "\"\""))
    }

    fn literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => String::from(if *b { "1" } else { "0" }),
            Value::Bytes(b) => format!("X'{}'", hex_encode(b)),
            // No DEFAULT keyword inside VALUES.
            Value::UseDefault => "NULL".to_string(),
            other => common_literal(other, quote_text),
        }
    }

    fn begin(&self, deferred: bool) -> Vec<String> {
        let mut statements = vec!["BEGIN TRANSACTION;".to_string()];
        if deferred {
            statements.push("PRAGMA defer_foreign_keys = ON;".to_string());
        }
        statements
    }

    fn commit(&self, _deferred: bool) -> Vec<String> {
        vec!["COMMIT;".to_string()]
    }
}

/// The emitter for a driver name (`postgres`, `mysql`, `sqlite`) or a
/// connection URL.
pub fn dialect_for(driver_or_url: &str) -> Result<Box<dyn SqlDialect>> {
    detect_dialect(driver_or_url).map(sql_dialect)
}

pub fn sql_dialect(dialect: Dialect) -> Box<dyn SqlDialect> {
    match dialect {
        Dialect::Postgres => Box::new(PostgresDialect),
        Dialect::MySql => Box::new(MySqlDialect),
        Dialect::Sqlite => Box::new(SqliteDialect),
    }
}

fn common_literal(value: &Value, quote: fn(&str) -> String) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::UseDefault => "DEFAULT".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => {
            if f.is_nan() {
                "'NaN'".to_string()
            } else if f.is_infinite() {
                if f.is_sign_positive() {
                    "'Infinity'".to_string()
                } else {
                    "'-Infinity'".to_string()
                }
            } else {
                format!("{}", f)
            }
        }
        Value::Decimal { .. } => value.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Text(s) => quote(s),
        Value::Json(j) => quote(&j.to_string()),
        Value::Uuid(_) | Value::Date(_) | Value::Time(_) | Value::Timestamp(_) | Value::Bytes(_) => {
            quote(&value.to_string())
        }
    }
}

fn quote_text(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn quote_mysql_text(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "''"))
}
