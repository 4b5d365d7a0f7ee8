//! SQLite dialect

use super::{escape_standard, quote_with, Dialect, EscapeString};
use crate::error::{Error, Result};
use crate::schema::render::RenderedColumn;
use crate::schema::types::{ColumnDefinition, ColumnType};

#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
    pub const fn new() -> Self {
        Self
    }
}

impl EscapeString for SqliteDialect {
    fn escape_string(&self, value: &str) -> String {
        escape_standard(value)
    }
}

impl Dialect for SqliteDialect {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn type_name(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Serial => "INTEGER".to_string(),
            ColumnType::Custom(name) => name.clone(),
            other => other.as_str().to_uppercase(),
        }
    }

    // An INTEGER primary key aliases the rowid and generates its own values
    fn auto_increment_type(&self, _column: &ColumnDefinition) -> String {
        "INTEGER".to_string()
    }

    fn normalize_column(&self, column: &mut ColumnDefinition, sole_primary_key: bool) {
        if column.is_auto_generated() {
            column.column_type = ColumnType::Integer;
            column.autoincrement = true;
        } else if sole_primary_key && column.column_type == ColumnType::Integer {
            column.autoincrement = true;
        }
    }

    fn check_column(&self, column: &ColumnDefinition, sole_primary_key: bool) -> Result<()> {
        if column.is_auto_generated() && !sole_primary_key {
            return Err(Error::unsupported(
                self.name(),
                format!(
                    "column '{}' can only generate values as the sole primary key",
                    column.name
                ),
            ));
        }
        Ok(())
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn batch_alter(&self) -> bool {
        false
    }

    fn max_identifier_length(&self) -> usize {
        2048
    }

    fn modify_column_clauses(
        &self,
        column: &ColumnDefinition,
        _rendered: &RenderedColumn,
    ) -> Result<Vec<String>> {
        Err(Error::unsupported(
            self.name(),
            format!(
                "modifying column '{}' requires rebuilding the table",
                column.name
            ),
        ))
    }
}
