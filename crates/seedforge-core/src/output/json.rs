use std::io::Write;

use crate::error::{Result, SeedForgeError};
use crate::generate::engine::GeneratedData;
use crate::generate::value::{Row, Value};

/// Write generated data as JSON, streaming table by table.
///
/// Layout: `{"seed": .., "tables": {name: [row, ..]}, "pending_updates": [..]}`.
/// Pending updates carry the target table, the key of the row to update and
/// the foreign key values to set.
pub fn write_json<W: Write>(writer: &mut W, data: &GeneratedData) -> Result<()> {
    write_str(writer, &format!("{{\n  \"seed\": {},\n  \"tables\": {{", data.seed))?;

    for (table_idx, (table_name, rows)) in data.tables.iter().enumerate() {
        if table_idx > 0 {
            write_str(writer, ",")?;
        }
        write_str(writer, &format!("\n    {}: [", json_key(table_name)?))?;
        for (row_idx, row) in rows.iter().enumerate() {
            if row_idx > 0 {
                write_str(writer, ",")?;
            }
            write_str(writer, &format!("\n      {}", json_row(row)?))?;
        }
        if !rows.is_empty() {
            write_str(writer, "\n    ")?;
        }
        write_str(writer, "]")?;
    }
    if !data.tables.is_empty() {
        write_str(writer, "\n  ")?;
    }
    write_str(writer, "},\n  \"pending_updates\": [")?;

    for (i, update) in data.pending_updates.iter().enumerate() {
        if i > 0 {
            write_str(writer, ",")?;
        }
        write_str(
            writer,
            &format!(
                "\n    {{\"table\": {}, \"fk\": {}, \"key\": {}, \"set\": {}}}",
                json_key(&update.table)?,
                json_key(&update.fk_name)?,
                json_object(update.key.iter())?,
                json_object(update.values.iter())?,
            ),
        )?;
    }
    if !data.pending_updates.is_empty() {
        write_str(writer, "\n  ")?;
    }
    write_str(writer, "]\n}\n")?;

    Ok(())
}

fn write_str<W: Write>(writer: &mut W, s: &str) -> Result<()> {
    writer
        .write_all(s.as_bytes())
        .map_err(|e| SeedForgeError::Output {
            message: "writing JSON".to_string(),
            source: e,
        })
}

fn json_key(s: &str) -> Result<String> {
    to_json_string(&serde_json::Value::String(s.to_string()))
}

fn json_row(row: &Row) -> Result<String> {
    json_object(row.iter())
}

/// Render entries as a JSON object, keeping their order.
fn json_object<'a>(entries: impl Iterator<Item = (&'a String, &'a Value)>) -> Result<String> {
    let mut parts = Vec::new();
    for (key, value) in entries {
        parts.push(format!("{}: {}", json_key(key)?, to_json_string(&value.to_json())?));
    }
    Ok(format!("{{{}}}", parts.join(", ")))
}

fn to_json_string(value: &serde_json::Value) -> Result<String> {
    serde_json::to_string(value).map_err(|e| SeedForgeError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate::foreign_key::PendingUpdate;
    use crate::graph::GenerationOrder;
    use indexmap::IndexMap;

    fn generated(pending_updates: Vec<PendingUpdate>) -> GeneratedData {
        let mut tables = IndexMap::new();
        let mut row = Row::new();
        row.insert("id".to_string(), Value::Int(1));
        row.insert("name".to_string(), Value::Text("Alice".to_string()));
        row.insert("active".to_string(), Value::Bool(true));
        row.insert("parent_id".to_string(), Value::Null);
        tables.insert("users".to_string(), vec![row]);
        tables.insert("empty".to_string(), Vec::new());
        GeneratedData {
            tables,
            pending_updates,
            order: GenerationOrder::default(),
            seed: 99,
        }
    }

    fn render(data: &GeneratedData) -> serde_json::Value {
        let mut out = Vec::new();
        write_json(&mut out, data).unwrap();
        serde_json::from_slice(&out).unwrap()
    }

    #[test]
    fn test_write_json() {
        let parsed = render(&generated(Vec::new()));
        assert_eq!(parsed["seed"], 99);
        assert_eq!(parsed["tables"]["users"][0]["name"], "Alice");
        assert_eq!(parsed["tables"]["users"][0]["active"], true);
        assert!(parsed["tables"]["users"][0]["parent_id"].is_null());
        assert_eq!(parsed["tables"]["empty"].as_array().unwrap().len(), 0);
        assert_eq!(parsed["pending_updates"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_pending_updates_in_output() {
        let mut key = IndexMap::new();
        key.insert("id".to_string(), Value::Int(1));
        let mut values = IndexMap::new();
        values.insert("parent_id".to_string(), Value::Int(2));
        let parsed = render(&generated(vec![PendingUpdate {
            table: "users".to_string(),
            fk_name: "fk_users_parent_id".to_string(),
            values,
            key,
        }]));

        let updates = parsed["pending_updates"].as_array().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0]["table"], "users");
        assert_eq!(updates[0]["key"]["id"], 1);
        assert_eq!(updates[0]["set"]["parent_id"], 2);
    }

    #[test]
    fn test_column_order_is_preserved() {
        let mut out = Vec::new();
        write_json(&mut out, &generated(Vec::new())).unwrap();
        let text = String::from_utf8(out).unwrap();
        let id = text.find("\"id\"").unwrap();
        let name = text.find("\"name\"").unwrap();
        let active = text.find("\"active\"").unwrap();
        assert!(id < name && name < active);
    }
}
