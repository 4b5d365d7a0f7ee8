//! SQL dialects
//!
//! One reconciliation algorithm drives every backend; a dialect only supplies
//! the formatting hooks that differ between engines.

mod mysql;
mod postgres;
mod sqlite;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;

use crate::error::{Error, Result};
use crate::schema::render::RenderedColumn;
use crate::schema::types::{ColumnDefinition, ColumnType};

/// Escapes string literals for embedding in generated SQL.
///
/// Connections implement this so the driver's own escaping rule is used;
/// dialects implement it for rendering without a live connection.
pub trait EscapeString {
    fn escape_string(&self, value: &str) -> String;
}

/// Standard SQL escaping: double every single quote
pub fn escape_standard(value: &str) -> String {
    value.replace('\'', "''")
}

/// MySQL-style escaping: backslashes are escape characters too
pub fn escape_backslashes(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "''")
}

/// Formatting hooks for one SQL dialect
pub trait Dialect: Send + Sync {
    /// Dialect name, matching the `database.driver` config value
    fn name(&self) -> &'static str;

    /// Quote an identifier (table, column or index name)
    fn quote_identifier(&self, name: &str) -> String;

    /// Map a canonical type to this dialect's type name
    fn type_name(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Custom(name) => name.clone(),
            other => other.as_str().to_uppercase(),
        }
    }

    /// Type clause for a column that generates its own values
    fn auto_increment_type(&self, column: &ColumnDefinition) -> String;

    /// Literal for a boolean default
    fn boolean_literal(&self, value: bool) -> &'static str {
        if value {
            "TRUE"
        } else {
            "FALSE"
        }
    }

    /// Keyword emitted unquoted for the current-timestamp default
    fn current_timestamp(&self) -> &'static str {
        "CURRENT_TIMESTAMP"
    }

    /// Whether index clauses may appear inside CREATE TABLE
    fn inline_indexes(&self) -> bool {
        false
    }

    /// Whether one ALTER TABLE may carry several comma-separated clauses
    fn batch_alter(&self) -> bool {
        true
    }

    /// Longest identifier the engine accepts
    fn max_identifier_length(&self) -> usize {
        64
    }

    /// Clauses (without the `ALTER TABLE t` prefix) that redefine a column
    fn modify_column_clauses(
        &self,
        _column: &ColumnDefinition,
        rendered: &RenderedColumn,
    ) -> Result<Vec<String>> {
        Ok(vec![format!("MODIFY COLUMN {}", rendered.definition())])
    }

    /// Statement dropping an index
    fn drop_index(&self, _table: &str, index: &str) -> String {
        format!("DROP INDEX {}", self.quote_identifier(index))
    }

    /// Fill in what the engine decides for a column that leaves it
    /// unspecified, so a declared column compares equal to its readback.
    /// Applied to both sides of a comparison.
    fn normalize_column(&self, column: &mut ColumnDefinition, _sole_primary_key: bool) {
        fill_char_length(column);
    }

    /// Reject a column the engine cannot create as declared
    fn check_column(&self, _column: &ColumnDefinition, _sole_primary_key: bool) -> Result<()> {
        Ok(())
    }
}

/// `CHAR` without a length is `CHAR(1)`
pub(crate) fn fill_char_length(column: &mut ColumnDefinition) {
    if column.column_type == ColumnType::Char && column.length.is_none() {
        column.length = Some(1);
    }
}

/// Pick the dialect matching a configured driver name
pub fn for_driver(driver: &str) -> Result<Box<dyn Dialect>> {
    match driver.to_lowercase().as_str() {
        "mysql" | "mariadb" => Ok(Box::new(MySqlDialect::new())),
        "postgres" | "postgresql" => Ok(Box::new(PostgresDialect::new())),
        "sqlite" => Ok(Box::new(SqliteDialect::new())),
        _ => Err(Error::ConfigError(format!(
            "Unsupported database driver: {}",
            driver
        ))),
    }
}

/// Quote with the given delimiter, doubling any embedded delimiter
pub(crate) fn quote_with(name: &str, delimiter: char) -> String {
    let doubled = format!("{delimiter}{delimiter}");
    format!(
        "{delimiter}{}{delimiter}",
        name.replace(delimiter, &doubled)
    )
}
