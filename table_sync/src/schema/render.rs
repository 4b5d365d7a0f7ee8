//! Column rendering
//!
//! Pure helpers turning a [`ColumnDefinition`] into SQL fragments: the dialect
//! type string, the quoted default, and the full column clause shared by
//! CREATE TABLE and ADD/MODIFY COLUMN.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::dialect::{Dialect, EscapeString};
use crate::schema::types::{ColumnDefinition, ColumnType, DefaultValue, CURRENT_TIMESTAMP};

/// A column broken into its rendered parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedColumn {
    /// Quoted column name
    pub name: String,
    /// Type clause, including auto-increment coercion
    pub type_sql: String,
    /// Type and size without auto-increment coercion
    pub base_type: String,
    /// Quoted default value or keyword
    pub default: Option<String>,
    pub not_null: bool,
}

impl RenderedColumn {
    /// Type, then either the default or NOT NULL
    pub fn clause(&self) -> String {
        match (&self.default, self.not_null) {
            (Some(default), _) => format!("{} DEFAULT {}", self.type_sql, default),
            (None, true) => format!("{} NOT NULL", self.type_sql),
            (None, false) => self.type_sql.clone(),
        }
    }

    /// Quoted name followed by the clause
    pub fn definition(&self) -> String {
        format!("{} {}", self.name, self.clause())
    }
}

/// Renders columns for one dialect
pub struct Renderer<'a> {
    dialect: &'a dyn Dialect,
    escaper: &'a dyn EscapeString,
    type_overrides: Option<&'a HashMap<String, String>>,
}

impl<'a> Renderer<'a> {
    pub fn new(dialect: &'a dyn Dialect, escaper: &'a dyn EscapeString) -> Self {
        Self {
            dialect,
            escaper,
            type_overrides: None,
        }
    }

    /// Replace dialect type names for the given canonical tags
    pub fn with_type_overrides(mut self, overrides: &'a HashMap<String, String>) -> Self {
        self.type_overrides = Some(overrides);
        self
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    fn type_name(&self, column_type: &ColumnType) -> String {
        self.type_overrides
            .and_then(|overrides| overrides.get(column_type.as_str()))
            .cloned()
            .unwrap_or_else(|| self.dialect.type_name(column_type))
    }

    /// Dialect type with its size suffix.
    ///
    /// Numeric types take `(precision[,scale])` when a precision is declared;
    /// every other type takes `(length)` when a length is declared.
    pub fn type_and_size(&self, column: &ColumnDefinition) -> String {
        let name = self.type_name(&column.column_type);
        if column.column_type == ColumnType::Numeric {
            match (column.precision, column.scale) {
                (Some(precision), Some(scale)) => format!("{}({},{})", name, precision, scale),
                (Some(precision), None) => format!("{}({})", name, precision),
                _ => name,
            }
        } else {
            match column.length {
                Some(length) => format!("{}({})", name, length),
                None => name,
            }
        }
    }

    /// Type clause, coerced to the dialect's auto-generating type when needed
    pub fn column_type_sql(&self, column: &ColumnDefinition) -> String {
        if column.is_auto_generated() {
            self.dialect.auto_increment_type(column)
        } else {
            self.type_and_size(column)
        }
    }

    /// Quote a literal for its value type
    pub fn quote_value(&self, value: &DefaultValue) -> String {
        match value {
            DefaultValue::Boolean(b) => self.dialect.boolean_literal(*b).to_string(),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => format!("'{}'", self.escaper.escape_string(s)),
            DefaultValue::CurrentTimestamp => {
                format!("'{}'", self.escaper.escape_string(CURRENT_TIMESTAMP))
            }
        }
    }

    /// Render the column's default, if any.
    ///
    /// The current-timestamp sentinel on a datetime column is a function
    /// call and is emitted unquoted; everywhere else it is a plain string.
    pub fn quote_default_value(&self, column: &ColumnDefinition) -> Option<String> {
        let default = column.default.as_ref()?;
        match default {
            DefaultValue::CurrentTimestamp if column.column_type.is_datetime() => {
                Some(self.dialect.current_timestamp().to_string())
            }
            other => Some(self.quote_value(other)),
        }
    }

    /// Break a column into rendered parts.
    ///
    /// A column declaring both a default and NOT NULL is rejected here rather
    /// than rendered with one of the two silently dropped.
    pub fn render(&self, column: &ColumnDefinition) -> Result<RenderedColumn> {
        if column.default.is_some() && !column.nullable {
            return Err(Error::DefinitionInvariant(format!(
                "column '{}' declares both a default and NOT NULL",
                column.name
            )));
        }

        Ok(RenderedColumn {
            name: self.dialect.quote_identifier(&column.name),
            type_sql: self.column_type_sql(column),
            base_type: self.type_and_size(column),
            default: self.quote_default_value(column),
            not_null: !column.nullable,
        })
    }

    /// The column clause: type, then `DEFAULT x` or `NOT NULL`
    pub fn column_sql(&self, column: &ColumnDefinition) -> Result<String> {
        Ok(self.render(column)?.clause())
    }
}
