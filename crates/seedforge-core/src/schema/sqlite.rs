use indexmap::IndexMap;
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;

use crate::error::{Result, SeedForgeError};
use crate::schema::catalog::CatalogReader;
use crate::schema::types::*;

pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SqliteRow>> {
        sqlx::query(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SeedForgeError::Introspection {
                query: query.to_string(),
                source: e,
            })
    }

    /// Tables with their `CREATE TABLE` text, in catalog order.
    async fn read_tables(&self) -> Result<IndexMap<String, (Table, String)>> {
        let rows = self
            .fetch("SELECT name, sql FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY rowid")
            .await?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = row.get("name");
            let sql: Option<String> = row.get("sql");
            tables.insert(name.clone(), (Table::new(name), sql.unwrap_or_default()));
        }
        Ok(tables)
    }

    async fn read_columns(&self, table: &mut Table) -> Result<()> {
        let rows = self
            .fetch(&format!("PRAGMA table_info(\"{}\")", table.name))
            .await?;

        let mut pk: Vec<(i32, String)> = Vec::new();
        for row in rows {
            let name: String = row.get("name");
            let type_str: String = row.get("type");
            let notnull: i32 = row.get("notnull");
            let pk_position: i32 = row.get("pk");

            let mut column = Column::new(name.clone(), SqlType::from_raw(&type_str, None, None, None));
            column.nullable = notnull == 0;
            if pk_position > 0 {
                pk.push((pk_position, name));
            }
            table.columns.push(column);
        }

        pk.sort_by_key(|(position, _)| *position);
        table.primary_key = pk.into_iter().map(|(_, name)| name).collect();

        // A lone INTEGER PRIMARY KEY aliases the rowid.
        if let [only] = table.primary_key.as_slice() {
            let only = only.clone();
            if let Some(column) = table.column_mut(&only) {
                if matches!(column.sql_type, SqlType::Integer) {
                    column.auto_increment = true;
                }
            }
        }
        Ok(())
    }

    async fn read_foreign_keys(&self, table: &mut Table) -> Result<()> {
        let rows = self
            .fetch(&format!("PRAGMA foreign_key_list(\"{}\")", table.name))
            .await?;

        // `to` is NULL when the parent's primary key is implied; filled in
        // once every table is known.
        let mut grouped: IndexMap<i32, (String, Vec<(String, Option<String>)>)> = IndexMap::new();
        for row in &rows {
            let id: i32 = row.get("id");
            let parent: String = row.get("table");
            let from: String = row.get("from");
            let to: Option<String> = row.get("to");
            grouped
                .entry(id)
                .or_insert_with(|| (parent, Vec::new()))
                .1
                .push((from, to));
        }

        for (_, (parent, pairs)) in grouped {
            let columns = pairs
                .into_iter()
                .map(|(from, to)| (from, to.unwrap_or_default()));
            table.foreign_keys.push(ForeignKey::new(parent, columns));
        }
        Ok(())
    }

    async fn read_unique_keys(&self, table: &mut Table) -> Result<()> {
        let indexes = self
            .fetch(&format!("PRAGMA index_list(\"{}\")", table.name))
            .await?;

        for idx_row in &indexes {
            let unique: i32 = idx_row.get("unique");
            let origin: String = idx_row.get("origin");
            let idx_name: String = idx_row.get("name");
            if unique != 1 || origin == "pk" {
                continue;
            }
            let cols = self
                .fetch(&format!("PRAGMA index_info(\"{}\")", idx_name))
                .await?;
            let columns: Vec<String> = cols.iter().map(|r| r.get("name")).collect();
            table.unique_keys.push(columns);
        }
        Ok(())
    }
}

impl CatalogReader for SqliteCatalog {
    async fn read_schema(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(Dialect::Sqlite, "main".to_string());

        for (_, (mut table, create_sql)) in self.read_tables().await? {
            self.read_columns(&mut table).await?;
            self.read_foreign_keys(&mut table).await?;
            self.read_unique_keys(&mut table).await?;
            table.check_constraints = extract_check_clauses(&create_sql);
            schema.add_table(table);
        }

        fill_implied_parent_columns(&mut schema);
        schema.normalize();
        Ok(schema)
    }
}

/// Replace empty parent column names with the referenced table's primary key.
fn fill_implied_parent_columns(schema: &mut DatabaseSchema) {
    let primary_keys: IndexMap<String, Vec<String>> = schema
        .tables
        .iter()
        .map(|(name, t)| (name.clone(), t.primary_key.clone()))
        .collect();

    for table in schema.tables.values_mut() {
        for fk in &mut table.foreign_keys {
            let Some(pk) = primary_keys.get(&fk.referenced_table) else {
                continue;
            };
            for (i, parent) in fk.columns.values_mut().enumerate() {
                if parent.is_empty() {
                    if let Some(pk_col) = pk.get(i) {
                        *parent = pk_col.clone();
                    }
                }
            }
        }
    }
}

/// Pull every `CHECK (...)` body out of a `CREATE TABLE` statement, column
/// and table level alike. Quoted text is skipped while scanning.
pub fn extract_check_clauses(create_sql: &str) -> Vec<String> {
    let chars: Vec<char> = create_sql.chars().collect();
    let mut clauses = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            quote @ ('\'' | '"' | '`') => {
                i += 1;
                while i < chars.len() && chars[i] != quote {
                    i += 1;
                }
                i += 1;
            }
            c if c.eq_ignore_ascii_case(&'c') && is_check_keyword(&chars, i) => {
                let mut j = i + 5;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if j >= chars.len() || chars[j] != '(' {
                    i += 5;
                    continue;
                }
                match matching_paren(&chars, j) {
                    Some(end) => {
                        clauses.push(chars[j..=end].iter().collect());
                        i = end + 1;
                    }
                    None => break,
                }
            }
            _ => i += 1,
        }
    }
    clauses
}

fn is_check_keyword(chars: &[char], at: usize) -> bool {
    let Some(word) = chars.get(at..at + 5) else {
        return false;
    };
    let word: String = word.iter().collect();
    let boundary_before = at == 0 || !(chars[at - 1].is_alphanumeric() || chars[at - 1] == '_');
    let boundary_after = chars
        .get(at + 5)
        .is_none_or(|c| !(c.is_alphanumeric() || *c == '_'));
    word.eq_ignore_ascii_case("check") && boundary_before && boundary_after
}

fn matching_paren(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(open + offset);
                    }
                }
                _ => {}
            },
        }
    }
    None
}
