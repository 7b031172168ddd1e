use crate::config::types::HistoryTable;
use crate::error::{Error, Result};

/// PostgreSQL identifier rule: letters, digits, `_` and `$`, not starting with a digit or `$`
pub fn is_valid_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Validate and double-quote a single identifier
pub fn quote_identifier(kind: &str, name: &str) -> Result<String> {
    if !is_valid_sql_identifier(name) {
        return Err(Error::Configuration(format!(
            "Invalid {} name '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            kind, name
        )));
    }

    Ok(format!(r#""{}""#, name))
}

/// Schema-qualified, quoted history table name
pub fn qualified_table_name(table: &HistoryTable) -> Result<String> {
    let schema = quote_identifier("schema", &table.schema)?;
    let name = quote_identifier("table", &table.name)?;
    Ok(format!("{}.{}", schema, name))
}

/// Interpret the textual `index` of the newest history row
pub fn parse_recorded_version(raw: Option<String>) -> Result<Option<i64>> {
    match raw {
        None => Ok(None),
        Some(text) => text
            .trim()
            .parse::<i64>()
            .map(Some)
            .map_err(|_| Error::CorruptState(text)),
    }
}
