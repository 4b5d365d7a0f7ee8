//! Legacy column format
//!
//! Older callers describe a table as an ordered list of per-column objects
//! carrying MySQL-style key markers (`PRI`, `UNI`, `MUL`) and a textual size.
//! This module converts that shape into a [`TableDefinition`].

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schema::types::{ColumnDefinition, ColumnType, DefaultValue, TableDefinition};
use crate::utils::naming::{get_index_name, DEFAULT_INDEX_PATTERN};

fn default_null() -> bool {
    true
}

/// One column in the legacy format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyColumn {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: String,
    /// `"255"` or, for numeric types, `"10,2"`
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default = "default_null")]
    pub null: bool,
    #[serde(default)]
    pub default: Option<DefaultValue>,
    /// `PRI`, `UNI` or `MUL`
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub autoincrement: bool,
}

fn parse_size(column: &LegacyColumn, size: &str) -> Result<(u32, Option<u32>)> {
    let invalid = || {
        Error::DefinitionInvariant(format!(
            "column '{}' has invalid size '{}'",
            column.name, size
        ))
    };

    let mut parts = size.split(',').map(str::trim);
    let first = parts
        .next()
        .and_then(|p| p.parse::<u32>().ok())
        .ok_or_else(invalid)?;
    let second = match parts.next() {
        Some(p) => Some(p.parse::<u32>().map_err(|_| invalid())?),
        None => None,
    };
    if parts.next().is_some() {
        return Err(invalid());
    }
    Ok((first, second))
}

/// Convert legacy column objects, in order, into a table definition.
///
/// Key markers become table-level keys: `PRI` columns form the primary key in
/// declaration order, and each `UNI`/`MUL` column gets its own index named
/// `{table}_{column}_idx`.
pub fn convert_legacy_columns(table: &str, columns: &[LegacyColumn]) -> Result<TableDefinition> {
    let mut definition = TableDefinition::new();

    for legacy in columns {
        let column_type = ColumnType::from(legacy.column_type.as_str());
        let mut column = ColumnDefinition::new(&legacy.name, column_type.clone())
            .nullable(legacy.null);
        column.default = legacy.default.clone();
        column.autoincrement = legacy.autoincrement;

        if let Some(size) = legacy.size.as_deref().filter(|s| !s.trim().is_empty()) {
            let (first, second) = parse_size(legacy, size)?;
            if column_type == ColumnType::Numeric {
                column = column.precision(first, second);
            } else if second.is_some() {
                return Err(Error::DefinitionInvariant(format!(
                    "column '{}' of type {} cannot take a scale",
                    legacy.name, column_type
                )));
            } else {
                column = column.length(first);
            }
        }

        match legacy.key.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(key) if key.eq_ignore_ascii_case("PRI") => {
                definition.primary_key.push(legacy.name.clone());
            }
            Some(key) if key.eq_ignore_ascii_case("UNI") => {
                definition.unique_indexes.insert(
                    get_index_name(DEFAULT_INDEX_PATTERN, table, &[&legacy.name]),
                    vec![legacy.name.clone()],
                );
            }
            Some(key) if key.eq_ignore_ascii_case("MUL") => {
                definition.multi_indexes.insert(
                    get_index_name(DEFAULT_INDEX_PATTERN, table, &[&legacy.name]),
                    vec![legacy.name.clone()],
                );
            }
            Some(other) => {
                return Err(Error::DefinitionInvariant(format!(
                    "column '{}' has unknown key '{}'",
                    legacy.name, other
                )));
            }
        }

        definition.columns.push(column);
    }

    definition.validate()?;
    Ok(definition)
}
