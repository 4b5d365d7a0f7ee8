//! MySQL / MariaDB dialect

use super::{escape_backslashes, fill_char_length, quote_with, Dialect, EscapeString};
use crate::schema::types::{ColumnDefinition, ColumnType};

#[derive(Debug, Clone, Copy, Default)]
pub struct MySqlDialect;

impl MySqlDialect {
    pub const fn new() -> Self {
        Self
    }
}

impl EscapeString for MySqlDialect {
    fn escape_string(&self, value: &str) -> String {
        escape_backslashes(value)
    }
}

impl Dialect for MySqlDialect {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '`')
    }

    fn type_name(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Integer | ColumnType::Serial => "INT".to_string(),
            ColumnType::Custom(name) => name.clone(),
            other => other.as_str().to_uppercase(),
        }
    }

    fn auto_increment_type(&self, column: &ColumnDefinition) -> String {
        let base = match column.column_type {
            ColumnType::BigInt => "BIGINT",
            ColumnType::SmallInt => "SMALLINT",
            _ => "INT",
        };
        format!("{} AUTO_INCREMENT", base)
    }

    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "1"
        } else {
            "0"
        }
    }

    fn inline_indexes(&self) -> bool {
        true
    }

    fn drop_index(&self, table: &str, index: &str) -> String {
        format!(
            "DROP INDEX {} ON {}",
            self.quote_identifier(index),
            self.quote_identifier(table)
        )
    }

    // DECIMAL without a precision is stored as DECIMAL(10,0)
    fn normalize_column(&self, column: &mut ColumnDefinition, _sole_primary_key: bool) {
        fill_char_length(column);
        if column.column_type == ColumnType::Numeric && column.precision.is_none() {
            column.precision = Some(10);
            column.scale = None;
        }
    }
}
