use std::io::Write;

use crate::error::{Result, SeedForgeError};
use crate::generate::engine::GeneratedData;
use crate::generate::foreign_key::PendingUpdate;
use crate::generate::value::Row;
use crate::output::dialect::SqlDialect;

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct SqlOptions {
    /// Rows per multi-row INSERT.
    pub batch_size: usize,
    /// Wrap the script so constraint checks run at commit.
    pub deferred: bool,
}

impl Default for SqlOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            deferred: false,
        }
    }
}

/// Write the generated data as one SQL script.
///
/// The script runs in a single transaction: tables in generation order as
/// batched INSERTs, then one UPDATE per pending foreign key assignment.
pub fn write_sql<W: Write>(
    writer: &mut W,
    data: &GeneratedData,
    dialect: &dyn SqlDialect,
    options: SqlOptions,
) -> Result<()> {
    let batch_size = options.batch_size.max(1);

    writeln_str(
        writer,
        &format!(
            "-- Generated by SeedForge ({}, seed {})",
            dialect.name(),
            data.seed
        ),
    )?;
    for statement in dialect.begin(options.deferred) {
        writeln_str(writer, &statement)?;
    }

    for (table_name, rows) in &data.tables {
        if rows.is_empty() {
            continue;
        }
        writeln_str(writer, "")?;
        writeln_str(writer, &format!("-- {} ({} rows)", table_name, rows.len()))?;

        let columns: Vec<&String> = rows[0].keys().collect();
        let quoted_table = dialect.quote_identifier(table_name);
        let col_list = columns
            .iter()
            .map(|c| dialect.quote_identifier(c))
            .collect::<Vec<_>>()
            .join(", ");

        for chunk in rows.chunks(batch_size) {
            let sql = build_batched_insert(&quoted_table, &col_list, &columns, chunk, dialect);
            writeln_str(writer, &sql)?;
        }
    }

    if !data.pending_updates.is_empty() {
        writeln_str(writer, "")?;
        writeln_str(writer, "-- Foreign keys assigned after insert")?;
        for update in &data.pending_updates {
            writeln_str(writer, &build_update(update, dialect))?;
        }
    }

    writeln_str(writer, "")?;
    for statement in dialect.commit(options.deferred) {
        writeln_str(writer, &statement)?;
    }
    writer.flush().map_err(|e| SeedForgeError::Output {
        message: "flushing SQL".to_string(),
        source: e,
    })
}

fn build_batched_insert(
    quoted_table: &str,
    col_list: &str,
    columns: &[&String],
    rows: &[Row],
    dialect: &dyn SqlDialect,
) -> String {
    let mut sql = format!("INSERT INTO {} ({}) VALUES\n", quoted_table, col_list);

    for (i, row) in rows.iter().enumerate() {
        if i > 0 {
            sql.push_str(",\n");
        }
        sql.push_str("  (");
        for (j, col) in columns.iter().enumerate() {
            if j > 0 {
                sql.push_str(", ");
            }
            let literal = row
                .get(*col)
                .map(|v| dialect.literal(v))
                .unwrap_or_else(|| "NULL".to_string());
            sql.push_str(&literal);
        }
        sql.push(')');
    }
    sql.push(';');

    sql
}

fn build_update(update: &PendingUpdate, dialect: &dyn SqlDialect) -> String {
    let assignments = update
        .values
        .iter()
        .map(|(c, v)| format!("{} = {}", dialect.quote_identifier(c), dialect.literal(v)))
        .collect::<Vec<_>>()
        .join(", ");
    let predicate = update
        .key
        .iter()
        .map(|(c, v)| {
            if v.is_null() {
                format!("{} IS NULL", dialect.quote_identifier(c))
            } else {
                format!("{} = {}", dialect.quote_identifier(c), dialect.literal(v))
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ");

    format!(
        "UPDATE {} SET {} WHERE {};",
        dialect.quote_identifier(&update.table),
        assignments,
        predicate
    )
}

fn writeln_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writeln!(writer, "{}", s).map_err(|e| SeedForgeError::Output {
        message: "writing SQL".to_string(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::value::Value;
    use crate::graph::GenerationOrder;
    use crate::output::dialect::{MySqlDialect, PostgresDialect};
    use indexmap::IndexMap;

    fn data(rows: usize, pending: Vec<PendingUpdate>) -> GeneratedData {
        let mut tables = IndexMap::new();
        let rows: Vec<Row> = (0..rows)
            .map(|i| {
                let mut row = Row::new();
                row.insert("id".to_string(), Value::Int(i as i64 + 1));
                row.insert("name".to_string(), Value::Text(format!("user {}", i)));
                row.insert("manager_id".to_string(), Value::Null);
                row
            })
            .collect();
        tables.insert("users".to_string(), rows);
        GeneratedData {
            tables,
            pending_updates: pending,
            order: GenerationOrder::default(),
            seed: 1,
        }
    }

    fn render(data: &GeneratedData, dialect: &dyn SqlDialect, options: SqlOptions) -> String {
        let mut out = Vec::new();
        write_sql(&mut out, data, dialect, options).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_inserts_are_batched() {
        let sql = render(
            &data(5, Vec::new()),
            &PostgresDialect,
            SqlOptions {
                batch_size: 2,
                deferred: false,
            },
        );
        assert_eq!(sql.matches("INSERT INTO \"users\"").count(), 3);
        assert!(sql.contains("(\"id\", \"name\", \"manager_id\")"));
        assert!(sql.contains("(1, 'user 0', NULL)"));
        assert!(sql.trim_end().ends_with("COMMIT;"));
        assert!(!sql.contains("SET CONSTRAINTS"));
    }

    #[test]
    fn test_pending_updates_follow_inserts() {
        let mut values = IndexMap::new();
        values.insert("manager_id".to_string(), Value::Int(2));
        let mut key = IndexMap::new();
        key.insert("id".to_string(), Value::Int(1));
        let update = PendingUpdate {
            table: "users".to_string(),
            fk_name: "fk_users_manager_id".to_string(),
            values,
            key,
        };

        let sql = render(&data(2, vec![update]), &MySqlDialect, SqlOptions::default());
        let insert_at = sql.find("INSERT INTO `users`").unwrap();
        let update_at = sql
            .find("UPDATE `users` SET `manager_id` = 2 WHERE `id` = 1;")
            .unwrap();
        assert!(insert_at < update_at);
        assert!(sql.contains("START TRANSACTION;"));
    }

    #[test]
    fn test_deferred_script_defers_constraints() {
        let sql = render(
            &data(1, Vec::new()),
            &PostgresDialect,
            SqlOptions {
                batch_size: 10,
                deferred: true,
            },
        );
        let begin = sql.find("BEGIN;").unwrap();
        let defer = sql.find("SET CONSTRAINTS ALL DEFERRED;").unwrap();
        let insert = sql.find("INSERT INTO").unwrap();
        assert!(begin < defer && defer < insert);
    }

    #[test]
    fn test_empty_tables_are_skipped() {
        let mut d = data(0, Vec::new());
        d.tables.insert("empty".to_string(), Vec::new());
        let sql = render(&d, &PostgresDialect, SqlOptions::default());
        assert!(!sql.contains("INSERT INTO"));
    }
}
