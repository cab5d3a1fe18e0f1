use serde::Serialize;

use crate::{ClickHouseError, Result};

/// Ingestion format used for inserts: one JSON object per line.
pub const INSERT_FORMAT: &str = "JSONEachRow";

pub fn insert_query(table: &str) -> String {
    format!("INSERT INTO {table} FORMAT {INSERT_FORMAT}")
}

/// Serializes each row independently and joins them with `\n`.
pub fn encode_rows<I>(rows: I) -> Result<String>
where
    I: IntoIterator,
    I::Item: Serialize,
{
    let mut body = String::new();
    for (index, row) in rows.into_iter().enumerate() {
        if index > 0 {
            body.push('\n');
        }
        let line = serde_json::to_string(&row).map_err(ClickHouseError::Encode)?;
        body.push_str(&line);
    }
    Ok(body)
}
