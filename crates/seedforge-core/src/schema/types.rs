use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SeedForgeError};

/// Top-level representation of a database schema as handed over by a
/// catalog reader. Table order is the catalog order and is used as the
/// deterministic tie-break when ordering independent tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSchema {
    pub dialect: Dialect,
    pub name: String,
    pub tables: IndexMap<String, Table>,
}

impl DatabaseSchema {
    pub fn new(dialect: Dialect, name: String) -> Self {
        Self {
            dialect,
            name,
            tables: IndexMap::new(),
        }
    }

    /// Insert a table keyed by its name, preserving catalog order.
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.name.clone(), table);
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.tables.values().map(|t| t.foreign_keys.len()).sum()
    }

    pub fn column_count(&self) -> usize {
        self.tables.values().map(|t| t.columns.len()).sum()
    }

    /// Validate every table's structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.tables.values().try_for_each(Table::validate)
    }

    /// Reconcile derived flags after a reader has filled the schema in.
    pub fn normalize(&mut self) {
        for table in self.tables.values_mut() {
            table.normalize();
        }
    }
}

/// SQL dialect of the target database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    #[serde(alias = "postgresql")]
    Postgres,
    #[serde(alias = "mariadb")]
    MySql,
    Sqlite,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "PostgreSQL"),
            Dialect::MySql => write!(f, "MySQL"),
            Dialect::Sqlite => write!(f, "SQLite"),
        }
    }
}

/// A table with its columns, keys and raw CHECK constraint text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Column>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
    /// Raw CHECK clause text as extracted from the catalog. Never parsed by a
    /// SQL grammar, only pattern-matched by `crate::constraint`.
    #[serde(default)]
    pub check_constraints: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            check_constraints: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Returns the foreign key whose child columns include `column`, if any.
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.columns.contains_key(column))
    }

    /// Check the structural invariants: every FK child column and every PK
    /// column must name an existing column.
    pub fn validate(&self) -> Result<()> {
        for pk_col in &self.primary_key {
            if !self.has_column(pk_col) {
                return Err(SeedForgeError::InvalidSchema {
                    table: self.name.clone(),
                    message: format!("primary key column '{}' does not exist", pk_col),
                });
            }
        }
        for fk in &self.foreign_keys {
            if fk.columns.is_empty() {
                return Err(SeedForgeError::InvalidSchema {
                    table: self.name.clone(),
                    message: format!("foreign key '{}' maps no columns", fk.name),
                });
            }
            if let Some(missing) = fk.columns.keys().find(|c| !self.has_column(c)) {
                return Err(SeedForgeError::InvalidSchema {
                    table: self.name.clone(),
                    message: format!(
                        "foreign key '{}' uses column '{}' which does not exist",
                        fk.name, missing
                    ),
                });
            }
        }
        for key in &self.unique_keys {
            if let Some(missing) = key.iter().find(|c| !self.has_column(c)) {
                return Err(SeedForgeError::InvalidSchema {
                    table: self.name.clone(),
                    message: format!("unique key uses column '{}' which does not exist", missing),
                });
            }
        }
        Ok(())
    }

    /// Reconcile the table-level primary key with the per-column flags, set
    /// `is_uuid` on UUID-typed columns and flag 1:1 foreign keys.
    pub fn normalize(&mut self) {
        if self.primary_key.is_empty() {
            self.primary_key = self
                .columns
                .iter()
                .filter(|c| c.primary_key)
                .map(|c| c.name.clone())
                .collect();
        }
        let pk = self.primary_key.clone();
        for column in &mut self.columns {
            if pk.contains(&column.name) {
                column.primary_key = true;
                column.nullable = false;
            }
            if matches!(column.sql_type, SqlType::Uuid) {
                column.is_uuid = true;
            }
        }
        self.mark_unique_foreign_keys();
    }

    /// Flag foreign keys whose child columns exactly cover the primary key or
    /// a unique key. Such FKs describe 1:1 relationships, so each parent row
    /// may be referenced at most once.
    pub fn mark_unique_foreign_keys(&mut self) {
        let mut keys: Vec<Vec<&str>> = self
            .unique_keys
            .iter()
            .map(|k| k.iter().map(String::as_str).collect())
            .collect();
        if !self.primary_key.is_empty() {
            keys.push(self.primary_key.iter().map(String::as_str).collect());
        }
        for key in &mut keys {
            key.sort_unstable();
        }

        for fk in &mut self.foreign_keys {
            let mut cols: Vec<&str> = fk.columns.keys().map(String::as_str).collect();
            cols.sort_unstable();
            if keys.iter().any(|k| *k == cols) {
                fk.unique_on_fk = true;
            }
        }
    }
}

/// A single column. Built once during introspection and treated as an
/// immutable value afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub is_uuid: bool,
    #[serde(default)]
    pub auto_increment: bool,
    /// Numeric lower bound hint from catalog metadata.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Numeric upper bound hint from catalog metadata.
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Closed value set from catalog metadata (enum labels).
    #[serde(default)]
    pub allowed_values: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Column {
    pub fn new(name: impl Into<String>, sql_type: SqlType) -> Self {
        let is_uuid = matches!(sql_type, SqlType::Uuid);
        Self {
            name: name.into(),
            sql_type,
            nullable: true,
            primary_key: false,
            is_uuid,
            auto_increment: false,
            min_value: None,
            max_value: None,
            allowed_values: Vec::new(),
        }
    }

    /// Clone this column with its UUID flag replaced. Used for text columns
    /// that hold UUIDs by convention (e.g. `CHAR(36)` ids).
    pub fn with_uuid_override(&self, is_uuid: bool) -> Column {
        Column {
            is_uuid,
            ..self.clone()
        }
    }

    /// True when values must be UUIDs, either by declared type or override.
    pub fn holds_uuid(&self) -> bool {
        self.is_uuid || matches!(self.sql_type, SqlType::Uuid)
    }

    /// Declared text length, if the type carries one.
    pub fn max_length(&self) -> Option<u32> {
        match self.sql_type {
            SqlType::Char { length } | SqlType::VarChar { length } => length,
            _ => None,
        }
    }
}

/// Broad semantic family of a SQL type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    Numeric,
    Text,
    Temporal,
    Boolean,
    Other,
}

/// Normalized SQL type covering all supported databases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SqlType {
    /// Small integer (int2, smallint, tinyint)
    SmallInt,
    /// Standard integer (int4, integer, int)
    Integer,
    /// Large integer (int8, bigint)
    BigInt,
    /// Exact numeric with optional precision/scale (numeric, decimal)
    Decimal {
        #[serde(default)]
        precision: Option<u32>,
        #[serde(default)]
        scale: Option<u32>,
    },
    /// Single-precision float (float4, real)
    Real,
    /// Double-precision float (float8, double precision)
    Double,
    /// Fixed-length string (char, character)
    Char {
        #[serde(default)]
        length: Option<u32>,
    },
    /// Variable-length string (varchar, character varying)
    VarChar {
        #[serde(default)]
        length: Option<u32>,
    },
    /// Unbounded text
    Text,
    Boolean,
    Date,
    Time,
    /// Timestamp without timezone
    Timestamp,
    /// Timestamp with timezone
    TimestampTz,
    Uuid,
    /// json / jsonb
    Json,
    /// bytea / blob
    Binary,
    /// Unknown or unrecognized type
    Other { name: String },
}

impl SqlType {
    /// Parse a raw catalog type name into a normalized `SqlType`.
    ///
    /// `length`, `precision` and `scale` come from separate catalog columns
    /// (e.g. `character_maximum_length`); when absent they are read from a
    /// parenthesized suffix such as `varchar(40)` or `numeric(10,2)`.
    pub fn from_raw(
        raw: &str,
        length: Option<u32>,
        precision: Option<u32>,
        scale: Option<u32>,
    ) -> Self {
        let normalized = raw.trim().to_lowercase();
        let (base, args) = split_type_args(&normalized);
        let first_arg = args.first().copied();
        let second_arg = args.get(1).copied();

        match base {
            "smallint" | "int2" | "smallserial" | "serial2" | "tinyint" => SqlType::SmallInt,
            "integer" | "int" | "int4" | "mediumint" | "serial" | "serial4" => SqlType::Integer,
            "bigint" | "int8" | "bigserial" | "serial8" => SqlType::BigInt,

            "real" | "float4" | "float" => SqlType::Real,
            "double precision" | "float8" | "double" => SqlType::Double,
            "numeric" | "decimal" | "money" => SqlType::Decimal {
                precision: precision.or(first_arg),
                scale: scale.or(second_arg),
            },

            "character varying" | "varchar" | "nvarchar" | "varchar2" => SqlType::VarChar {
                length: length.or(first_arg),
            },
            "character" | "char" | "nchar" | "bpchar" => SqlType::Char {
                length: length.or(first_arg).or(Some(1)),
            },
            "text" | "tinytext" | "mediumtext" | "longtext" | "clob" | "citext" => SqlType::Text,

            "boolean" | "bool" | "bit" => SqlType::Boolean,

            "date" => SqlType::Date,
            "time" | "time without time zone" => SqlType::Time,
            "timestamp" | "timestamp without time zone" | "datetime" => SqlType::Timestamp,
            "timestamp with time zone" | "timestamptz" => SqlType::TimestampTz,

            "uuid" | "uniqueidentifier" => SqlType::Uuid,
            "json" | "jsonb" => SqlType::Json,
            "bytea" | "blob" | "tinyblob" | "mediumblob" | "longblob" | "binary"
            | "varbinary" => SqlType::Binary,

            other => SqlType::Other {
                name: other.to_string(),
            },
        }
    }

    pub fn category(&self) -> TypeCategory {
        match self {
            SqlType::SmallInt
            | SqlType::Integer
            | SqlType::BigInt
            | SqlType::Decimal { .. }
            | SqlType::Real
            | SqlType::Double => TypeCategory::Numeric,
            SqlType::Char { .. } | SqlType::VarChar { .. } | SqlType::Text => TypeCategory::Text,
            SqlType::Date | SqlType::Time | SqlType::Timestamp | SqlType::TimestampTz => {
                TypeCategory::Temporal
            }
            SqlType::Boolean => TypeCategory::Boolean,
            SqlType::Uuid | SqlType::Json | SqlType::Binary | SqlType::Other { .. } => {
                TypeCategory::Other
            }
        }
    }

    /// Returns true for whole-number types.
    pub fn is_integer(&self) -> bool {
        matches!(self, SqlType::SmallInt | SqlType::Integer | SqlType::BigInt)
    }

    pub fn is_numeric(&self) -> bool {
        self.category() == TypeCategory::Numeric
    }

    /// Inclusive value range representable by an integer type.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            SqlType::SmallInt => Some((i16::MIN as i64, i16::MAX as i64)),
            SqlType::Integer => Some((i32::MIN as i64, i32::MAX as i64)),
            SqlType::BigInt => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

/// Split `numeric(10, 2)` into (`numeric`, [10, 2]).
fn split_type_args(normalized: &str) -> (&str, Vec<u32>) {
    match normalized.split_once('(') {
        Some((base, rest)) => {
            let inner = rest.split(')').next().unwrap_or("");
            let args = inner
                .split(',')
                .filter_map(|a| a.trim().parse::<u32>().ok())
                .collect();
            // "timestamp(3) with time zone" keeps its suffix
            let suffix = rest.split_once(')').map(|(_, s)| s.trim()).unwrap_or("");
            if suffix.is_empty() {
                (base.trim(), args)
            } else {
                match (base.trim(), suffix) {
                    ("timestamp", "with time zone") => ("timestamp with time zone", args),
                    ("timestamp", "without time zone") => ("timestamp without time zone", args),
                    ("time", "without time zone") => ("time without time zone", args),
                    (b, _) => (b, args),
                }
            }
        }
        None => (normalized, Vec::new()),
    }
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlType::SmallInt => write!(f, "smallint"),
            SqlType::Integer => write!(f, "integer"),
            SqlType::BigInt => write!(f, "bigint"),
            SqlType::Decimal {
                precision: Some(p),
                scale: Some(s),
            } => write!(f, "numeric({},{})", p, s),
            SqlType::Decimal {
                precision: Some(p),
                scale: None,
            } => write!(f, "numeric({})", p),
            SqlType::Decimal { .. } => write!(f, "numeric"),
            SqlType::Real => write!(f, "real"),
            SqlType::Double => write!(f, "double precision"),
            SqlType::Char { length: Some(n) } => write!(f, "char({})", n),
            SqlType::Char { length: None } => write!(f, "char"),
            SqlType::VarChar { length: Some(n) } => write!(f, "varchar({})", n),
            SqlType::VarChar { length: None } => write!(f, "varchar"),
            SqlType::Text => write!(f, "text"),
            SqlType::Boolean => write!(f, "boolean"),
            SqlType::Date => write!(f, "date"),
            SqlType::Time => write!(f, "time"),
            SqlType::Timestamp => write!(f, "timestamp"),
            SqlType::TimestampTz => write!(f, "timestamptz"),
            SqlType::Uuid => write!(f, "uuid"),
            SqlType::Json => write!(f, "json"),
            SqlType::Binary => write!(f, "bytea"),
            SqlType::Other { name } => write!(f, "{}", name),
        }
    }
}

/// A foreign key: child columns mapped to parent columns of the referenced
/// table. Composite keys keep their declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: String,
    /// child column -> parent column
    pub columns: IndexMap<String, String>,
    pub referenced_table: String,
    /// The child columns are themselves unique, making this a 1:1 relation.
    #[serde(default)]
    pub unique_on_fk: bool,
    #[serde(default)]
    pub deferrable: bool,
}

impl ForeignKey {
    /// Build a foreign key with a name derived from the parent table and the
    /// sorted child column names.
    pub fn new<I, C, P>(referenced_table: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = (C, P)>,
        C: Into<String>,
        P: Into<String>,
    {
        let referenced_table = referenced_table.into();
        let columns: IndexMap<String, String> = columns
            .into_iter()
            .map(|(c, p)| (c.into(), p.into()))
            .collect();
        let name = derive_fk_name(&referenced_table, columns.keys());
        Self {
            name,
            columns,
            referenced_table,
            unique_on_fk: false,
            deferrable: false,
        }
    }

    /// Replace the derived name with the catalog's constraint name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique_on_fk = true;
        self
    }

    pub fn child_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    pub fn parent_columns(&self) -> impl Iterator<Item = &str> {
        self.columns.values().map(String::as_str)
    }

    /// Child columns joined for messages, e.g. `order_id, line_no`.
    pub fn column_list(&self) -> String {
        self.columns.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// `fk_<parent>_<child columns sorted and joined by '_'>`
pub fn derive_fk_name<'a>(
    referenced_table: &str,
    child_columns: impl Iterator<Item = &'a String>,
) -> String {
    let mut cols: Vec<&str> = child_columns.map(String::as_str).collect();
    cols.sort_unstable();
    format!("fk_{}_{}", referenced_table, cols.join("_"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_reads_length_suffix() {
        assert_eq!(
            SqlType::from_raw("varchar(40)", None, None, None),
            SqlType::VarChar { length: Some(40) }
        );
        assert_eq!(
            SqlType::from_raw("character varying", Some(12), None, None),
            SqlType::VarChar { length: Some(12) }
        );
        assert_eq!(
            SqlType::from_raw("NUMERIC(10, 2)", None, None, None),
            SqlType::Decimal {
                precision: Some(10),
                scale: Some(2)
            }
        );
        assert_eq!(
            SqlType::from_raw("timestamp(3) with time zone", None, None, None),
            SqlType::TimestampTz
        );
        assert_eq!(
            SqlType::from_raw("bpchar", Some(3), None, None),
            SqlType::Char { length: Some(3) }
        );
    }

    #[test]
    fn test_unknown_type_is_other() {
        let ty = SqlType::from_raw("tsvector", None, None, None);
        assert_eq!(ty.category(), TypeCategory::Other);
        assert_eq!(ty.to_string(), "tsvector");
    }

    #[test]
    fn test_fk_name_derived_from_sorted_columns() {
        let fk = ForeignKey::new("orders", [("line_no", "no"), ("order_id", "id")]);
        assert_eq!(fk.name, "fk_orders_line_no_order_id");

        let swapped = ForeignKey::new("orders", [("order_id", "id"), ("line_no", "no")]);
        assert_eq!(fk.name, swapped.name);
        assert_eq!(swapped.column_list(), "order_id, line_no");
    }

    #[test]
    fn test_uuid_override_clones() {
        let col = Column::new("external_ref", SqlType::Char { length: Some(36) });
        assert!(!col.is_uuid);
        let overridden = col.with_uuid_override(true);
        assert!(overridden.is_uuid);
        assert_eq!(overridden.name, col.name);
        assert!(!col.is_uuid);
    }

    #[test]
    fn test_validate_rejects_unknown_fk_column() {
        let mut table = Table::new("orders");
        table.columns.push(Column::new("id", SqlType::Integer));
        table
            .foreign_keys
            .push(ForeignKey::new("users", [("user_id", "id")]));
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn test_validate_rejects_unknown_pk_column() {
        let mut table = Table::new("orders");
        table.primary_key = vec!["id".to_string()];
        assert!(table.validate().is_err());
    }

    #[test]
    fn test_mark_unique_foreign_keys() {
        let mut profiles = Table::new("profiles");
        profiles.columns.push(Column::new("id", SqlType::Integer));
        profiles.columns.push(Column::new("user_id", SqlType::Integer));
        profiles.columns.push(Column::new("team_id", SqlType::Integer));
        profiles.primary_key = vec!["id".to_string()];
        profiles.unique_keys.push(vec!["user_id".to_string()]);
        profiles
            .foreign_keys
            .push(ForeignKey::new("users", [("user_id", "id")]));
        profiles
            .foreign_keys
            .push(ForeignKey::new("teams", [("team_id", "id")]));

        profiles.mark_unique_foreign_keys();

        assert!(profiles.foreign_keys[0].unique_on_fk);
        assert!(!profiles.foreign_keys[1].unique_on_fk);
    }

    #[test]
    fn test_normalize_syncs_primary_key_flags() {
        let mut table = Table::new("users");
        let mut id = Column::new("id", SqlType::Uuid);
        id.primary_key = true;
        table.columns.push(id);
        table.columns.push(Column::new("email", SqlType::Text));

        table.normalize();

        assert_eq!(table.primary_key, vec!["id".to_string()]);
        let id = table.column("id").unwrap();
        assert!(!id.nullable);
        assert!(id.holds_uuid());
    }

    #[test]
    fn test_schema_roundtrips_through_json() {
        let mut schema = DatabaseSchema::new(Dialect::Postgres, "shop".to_string());
        let mut users = Table::new("users");
        let mut id = Column::new("id", SqlType::Uuid);
        id.nullable = false;
        id.primary_key = true;
        users.columns.push(id);
        users.primary_key = vec!["id".to_string()];
        schema.add_table(users);

        let json = serde_json::to_string(&schema).unwrap();
        let back: DatabaseSchema = serde_json::from_str(&json).unwrap();
        let id = back.tables["users"].column("id").unwrap();
        assert!(id.is_uuid);
        assert!(!id.nullable);
    }
}
