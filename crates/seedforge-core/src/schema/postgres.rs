use indexmap::IndexMap;
use sqlx::postgres::PgPool;
use sqlx::Row;

use crate::error::{Result, SeedForgeError};
use crate::schema::catalog::CatalogReader;
use crate::schema::types::*;

pub struct PostgresCatalog {
    pool: PgPool,
    schema_name: String,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_name: "public".to_string(),
        }
    }

    pub fn with_schema(pool: PgPool, schema_name: String) -> Self {
        Self { pool, schema_name }
    }

    async fn fetch(&self, label: &str, query: &str) -> Result<Vec<sqlx::postgres::PgRow>> {
        sqlx::query(query)
            .bind(&self.schema_name)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SeedForgeError::Introspection {
                query: label.to_string(),
                source: e,
            })
    }

    async fn read_tables(&self) -> Result<IndexMap<String, Table>> {
        let rows = self
            .fetch(
                "fetch tables",
                "SELECT table_name::text AS table_name FROM information_schema.tables WHERE table_schema = $1 AND table_type = 'BASE TABLE' ORDER BY table_name",
            )
            .await?;

        let mut tables = IndexMap::new();
        for row in rows {
            let name: String = row.get("table_name");
            tables.insert(name.clone(), Table::new(name));
        }
        Ok(tables)
    }

    async fn read_columns(
        &self,
        tables: &mut IndexMap<String, Table>,
        enums: &IndexMap<String, Vec<String>>,
    ) -> Result<()> {
        let query = r#"
            SELECT
                c.table_name::text AS table_name,
                c.column_name::text AS column_name,
                c.data_type::text AS data_type,
                c.udt_name::text AS udt_name,
                c.is_nullable::text AS is_nullable,
                c.column_default::text AS column_default,
                c.is_identity::text AS is_identity,
                c.character_maximum_length::int AS character_maximum_length,
                c.numeric_precision::int AS numeric_precision,
                c.numeric_scale::int AS numeric_scale
            FROM information_schema.columns c
            WHERE c.table_schema = $1
            ORDER BY c.table_name, c.ordinal_position
        "#;
        let rows = self.fetch("fetch columns", query).await?;

        for row in rows {
            let table_name: String = row.get("table_name");
            let column_name: String = row.get("column_name");
            let data_type: String = row.get("data_type");
            let udt_name: String = row.get("udt_name");
            let is_nullable: String = row.get("is_nullable");
            let column_default: Option<String> = row.get("column_default");
            let is_identity: Option<String> = row.get("is_identity");
            let max_length: Option<i32> = row.get("character_maximum_length");
            let precision: Option<i32> = row.get("numeric_precision");
            let scale: Option<i32> = row.get("numeric_scale");

            let sql_type = if data_type == "USER-DEFINED" && enums.contains_key(&udt_name) {
                SqlType::Text
            } else if data_type == "USER-DEFINED" {
                SqlType::from_raw(&udt_name, None, None, None)
            } else {
                SqlType::from_raw(
                    &data_type,
                    max_length.map(|v| v as u32),
                    precision.map(|v| v as u32),
                    scale.map(|v| v as u32),
                )
            };

            let mut column = Column::new(column_name, sql_type);
            column.nullable = is_nullable == "YES";
            column.auto_increment = is_identity.as_deref() == Some("YES")
                || column_default
                    .as_deref()
                    .is_some_and(|d| d.starts_with("nextval("));
            if let Some(labels) = enums.get(&udt_name) {
                column.allowed_values = labels.clone();
            }

            if let Some(table) = tables.get_mut(&table_name) {
                table.columns.push(column);
            }
        }

        Ok(())
    }

    /// Primary and unique keys, grouped per constraint in key order.
    async fn read_keys(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        let query = r#"
            SELECT
                tc.table_name::text AS table_name,
                tc.constraint_name::text AS constraint_name,
                tc.constraint_type::text AS constraint_type,
                kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
            WHERE tc.table_schema = $1
                AND tc.constraint_type IN ('PRIMARY KEY', 'UNIQUE')
            ORDER BY tc.table_name, tc.constraint_name, kcu.ordinal_position
        "#;
        let rows = self.fetch("fetch keys", query).await?;

        let mut keys: IndexMap<(String, String), (bool, Vec<String>)> = IndexMap::new();
        for row in rows {
            let table_name: String = row.get("table_name");
            let constraint_name: String = row.get("constraint_name");
            let constraint_type: String = row.get("constraint_type");
            let column_name: String = row.get("column_name");

            keys.entry((table_name, constraint_name))
                .or_insert_with(|| (constraint_type == "PRIMARY KEY", Vec::new()))
                .1
                .push(column_name);
        }

        for ((table_name, _), (primary, columns)) in keys {
            if let Some(table) = tables.get_mut(&table_name) {
                if primary {
                    table.primary_key = columns;
                } else {
                    table.unique_keys.push(columns);
                }
            }
        }
        Ok(())
    }

    async fn read_foreign_keys(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        // pg_constraint keeps the column pairing of composite keys, which
        // constraint_column_usage does not.
        let query = r#"
            SELECT
                child.relname AS table_name,
                con.conname AS constraint_name,
                parent.relname AS referenced_table,
                ca.attname AS column_name,
                pa.attname AS referenced_column,
                con.condeferrable AS deferrable
            FROM pg_constraint con
            JOIN pg_class child ON child.oid = con.conrelid
            JOIN pg_class parent ON parent.oid = con.confrelid
            JOIN pg_namespace n ON n.oid = child.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey) WITH ORDINALITY AS k(child_att, parent_att, pos)
            JOIN pg_attribute ca ON ca.attrelid = con.conrelid AND ca.attnum = k.child_att
            JOIN pg_attribute pa ON pa.attrelid = con.confrelid AND pa.attnum = k.parent_att
            WHERE con.contype = 'f' AND n.nspname = $1
            ORDER BY child.relname, con.conname, k.pos
        "#;
        let rows = self.fetch("fetch foreign keys", query).await?;

        let mut fks: IndexMap<(String, String), ForeignKey> = IndexMap::new();
        for row in rows {
            let table_name: String = row.get("table_name");
            let constraint_name: String = row.get("constraint_name");
            let referenced_table: String = row.get("referenced_table");
            let column_name: String = row.get("column_name");
            let referenced_column: String = row.get("referenced_column");
            let deferrable: bool = row.get("deferrable");

            let fk = fks
                .entry((table_name, constraint_name.clone()))
                .or_insert_with(|| {
                    let mut fk = ForeignKey::new(referenced_table, Vec::<(String, String)>::new())
                        .named(constraint_name);
                    fk.deferrable = deferrable;
                    fk
                });
            fk.columns.insert(column_name, referenced_column);
        }

        for ((table_name, _), fk) in fks {
            if let Some(table) = tables.get_mut(&table_name) {
                table.foreign_keys.push(fk);
            }
        }
        Ok(())
    }

    async fn read_check_constraints(&self, tables: &mut IndexMap<String, Table>) -> Result<()> {
        let query = r#"
            SELECT
                tc.table_name::text AS table_name,
                cc.check_clause::text AS check_clause
            FROM information_schema.table_constraints tc
            JOIN information_schema.check_constraints cc
                ON tc.constraint_name = cc.constraint_name
                AND tc.constraint_schema = cc.constraint_schema
            WHERE tc.table_schema = $1
                AND tc.constraint_type = 'CHECK'
            ORDER BY tc.table_name, tc.constraint_name
        "#;
        let rows = self.fetch("fetch check constraints", query).await?;

        for row in rows {
            let table_name: String = row.get("table_name");
            let check_clause: String = row.get("check_clause");
            // NOT NULL shows up here as a synthetic CHECK on older servers
            if check_clause.to_ascii_uppercase().ends_with("IS NOT NULL") {
                continue;
            }
            if let Some(table) = tables.get_mut(&table_name) {
                table.check_constraints.push(check_clause);
            }
        }
        Ok(())
    }

    async fn read_enums(&self) -> Result<IndexMap<String, Vec<String>>> {
        let query = r#"
            SELECT
                t.typname AS enum_name,
                e.enumlabel AS enum_value
            FROM pg_type t
            JOIN pg_enum e ON t.oid = e.enumtypid
            JOIN pg_catalog.pg_namespace n ON n.oid = t.typnamespace
            WHERE n.nspname = $1
            ORDER BY t.typname, e.enumsortorder
        "#;
        let rows = self.fetch("fetch enums", query).await?;

        let mut enums: IndexMap<String, Vec<String>> = IndexMap::new();
        for row in rows {
            let enum_name: String = row.get("enum_name");
            let enum_value: String = row.get("enum_value");
            enums.entry(enum_name).or_default().push(enum_value);
        }
        Ok(enums)
    }
}

impl CatalogReader for PostgresCatalog {
    async fn read_schema(&self) -> Result<DatabaseSchema> {
        let mut schema = DatabaseSchema::new(Dialect::Postgres, self.schema_name.clone());

        let enums = self.read_enums().await?;
        schema.tables = self.read_tables().await?;
        self.read_columns(&mut schema.tables, &enums).await?;
        self.read_keys(&mut schema.tables).await?;
        self.read_foreign_keys(&mut schema.tables).await?;
        self.read_check_constraints(&mut schema.tables).await?;

        schema.normalize();
        Ok(schema)
    }
}
