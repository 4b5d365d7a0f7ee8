//! PostgreSQL dialect

use super::{escape_standard, quote_with, Dialect, EscapeString};
use crate::error::Result;
use crate::schema::render::RenderedColumn;
use crate::schema::types::{ColumnDefinition, ColumnType};

#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
    pub const fn new() -> Self {
        Self
    }
}

impl EscapeString for PostgresDialect {
    fn escape_string(&self, value: &str) -> String {
        escape_standard(value)
    }
}

impl Dialect for PostgresDialect {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, name: &str) -> String {
        quote_with(name, '"')
    }

    fn type_name(&self, column_type: &ColumnType) -> String {
        match column_type {
            ColumnType::Serial => "INTEGER".to_string(),
            ColumnType::Float => "REAL".to_string(),
            ColumnType::Double => "DOUBLE PRECISION".to_string(),
            ColumnType::Datetime => "TIMESTAMP".to_string(),
            ColumnType::Timestamp => "TIMESTAMPTZ".to_string(),
            ColumnType::Blob => "BYTEA".to_string(),
            ColumnType::Custom(name) => name.clone(),
            other => other.as_str().to_uppercase(),
        }
    }

    fn auto_increment_type(&self, column: &ColumnDefinition) -> String {
        match column.column_type {
            ColumnType::BigInt => "BIGSERIAL",
            ColumnType::SmallInt => "SMALLSERIAL",
            _ => "SERIAL",
        }
        .to_string()
    }

    fn max_identifier_length(&self) -> usize {
        63
    }

    fn modify_column_clauses(
        &self,
        column: &ColumnDefinition,
        rendered: &RenderedColumn,
    ) -> Result<Vec<String>> {
        let name = &rendered.name;
        let mut clauses = vec![format!(
            "ALTER COLUMN {} TYPE {} USING {}::{}",
            name, rendered.base_type, name, rendered.base_type
        )];

        // The sequence default of a serial column is owned by the database
        if !column.is_auto_generated() {
            clauses.push(match &rendered.default {
                Some(default) => format!("ALTER COLUMN {} SET DEFAULT {}", name, default),
                None => format!("ALTER COLUMN {} DROP DEFAULT", name),
            });
        }

        clauses.push(if rendered.not_null {
            format!("ALTER COLUMN {} SET NOT NULL", name)
        } else {
            format!("ALTER COLUMN {} DROP NOT NULL", name)
        });

        Ok(clauses)
    }
}
