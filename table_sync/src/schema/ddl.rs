//! DDL statement builder
//!
//! Builds CREATE/ALTER/DROP statements from table and column definitions.
//! Nothing here talks to a database; the schema manager submits the strings.

use std::collections::HashSet;

use crate::error::{Error, Result};
use crate::schema::dialect::Dialect;
use crate::schema::render::Renderer;
use crate::schema::types::{ColumnDefinition, KeyRole, TableDefinition};
use crate::utils::naming::{get_index_name, truncate_identifier, DEFAULT_INDEX_PATTERN};

/// One clause of an ALTER TABLE statement
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlterClause<'a> {
    Add(&'a ColumnDefinition),
    Modify(&'a ColumnDefinition),
    Drop(&'a str),
}

/// An index about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Builds DDL for one dialect
pub struct DdlBuilder<'a> {
    renderer: Renderer<'a>,
    dialect: &'a dyn Dialect,
    index_pattern: &'a str,
}

impl<'a> DdlBuilder<'a> {
    pub fn new(renderer: Renderer<'a>) -> Self {
        let dialect = renderer.dialect();
        Self {
            renderer,
            dialect,
            index_pattern: DEFAULT_INDEX_PATTERN,
        }
    }

    /// Use a different pattern for synthesized index names
    pub fn with_index_pattern(mut self, pattern: &'a str) -> Self {
        self.index_pattern = pattern;
        self
    }

    pub fn renderer(&self) -> &Renderer<'a> {
        &self.renderer
    }

    fn quote(&self, name: &str) -> String {
        self.dialect.quote_identifier(name)
    }

    fn quote_list<S: AsRef<str>>(&self, names: &[S]) -> String {
        names
            .iter()
            .map(|n| self.quote(n.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Synthesize `{table}_{col1}_{col2}..._idx`, cut to the dialect's limit
    pub fn index_name<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> String {
        truncate_identifier(
            &get_index_name(self.index_pattern, table, columns),
            self.dialect.max_identifier_length(),
        )
    }

    /// Every index a table declares: the named unique and multi indexes,
    /// then one synthesized index per column carrying a unique or multi role.
    pub fn table_indexes(&self, table: &str, definition: &TableDefinition) -> Result<Vec<IndexSpec>> {
        let mut indexes: Vec<IndexSpec> = definition
            .unique_indexes
            .iter()
            .map(|(name, columns)| IndexSpec {
                name: name.clone(),
                columns: columns.clone(),
                unique: true,
            })
            .collect();

        for column in definition.columns_with_role(KeyRole::Unique) {
            indexes.push(IndexSpec {
                name: self.index_name(table, &[&column.name]),
                columns: vec![column.name.clone()],
                unique: true,
            });
        }

        indexes.extend(definition.multi_indexes.iter().map(|(name, columns)| IndexSpec {
            name: name.clone(),
            columns: columns.clone(),
            unique: false,
        }));

        for column in definition.columns_with_role(KeyRole::Multi) {
            indexes.push(IndexSpec {
                name: self.index_name(table, &[&column.name]),
                columns: vec![column.name.clone()],
                unique: false,
            });
        }

        let mut seen = HashSet::new();
        for index in &indexes {
            if !seen.insert(index.name.as_str()) {
                return Err(Error::DefinitionInvariant(format!(
                    "index name '{}' is used twice on table '{}'",
                    index.name, table
                )));
            }
        }

        Ok(indexes)
    }

    /// CREATE TABLE, followed by CREATE INDEX statements on dialects that
    /// cannot declare indexes inline.
    pub fn create_table(&self, table: &str, definition: &TableDefinition) -> Result<Vec<String>> {
        definition.validate()?;

        let mut lines = Vec::new();
        for column in &definition.columns {
            self.dialect
                .check_column(column, definition.is_sole_primary_key(&column.name))?;
            lines.push(format!("  {}", self.renderer.render(column)?.definition()));
        }

        let primary_key = definition.primary_key_columns();
        if !primary_key.is_empty() {
            lines.push(format!("  PRIMARY KEY ({})", self.quote_list(&primary_key)));
        }

        let indexes = self.table_indexes(table, definition)?;
        let mut statements = Vec::new();

        if self.dialect.inline_indexes() {
            for index in &indexes {
                let kind = if index.unique { "UNIQUE INDEX" } else { "INDEX" };
                lines.push(format!(
                    "  {} {} ({})",
                    kind,
                    self.quote(&index.name),
                    self.quote_list(&index.columns)
                ));
            }
        }

        statements.push(format!(
            "CREATE TABLE {} (\n{}\n)",
            self.quote(table),
            lines.join(",\n")
        ));

        if !self.dialect.inline_indexes() {
            for index in &indexes {
                statements.push(self.create_index(
                    table,
                    &index.columns,
                    Some(index.name.as_str()),
                    index.unique,
                )?);
            }
        }

        Ok(statements)
    }

    pub fn drop_table(&self, table: &str) -> String {
        format!("DROP TABLE {}", self.quote(table))
    }

    /// CREATE [UNIQUE] INDEX, synthesizing the name when none is given
    pub fn create_index<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        name: Option<&str>,
        unique: bool,
    ) -> Result<String> {
        if columns.is_empty() {
            return Err(Error::DefinitionInvariant(format!(
                "index on table '{}' has no columns",
                table
            )));
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => self.index_name(table, columns),
        };

        Ok(format!(
            "CREATE {}INDEX {} ON {} ({})",
            if unique { "UNIQUE " } else { "" },
            self.quote(&name),
            self.quote(table),
            self.quote_list(columns)
        ))
    }

    pub fn drop_index(&self, table: &str, name: &str) -> String {
        self.dialect.drop_index(table, name)
    }

    /// Render the clause fragments, without the `ALTER TABLE t` prefix
    fn clause_fragments(&self, clause: &AlterClause<'_>) -> Result<Vec<String>> {
        match clause {
            AlterClause::Add(column) => {
                column.validate()?;
                // An added column never joins the primary key
                self.dialect.check_column(column, false)?;
                Ok(vec![format!(
                    "ADD COLUMN {}",
                    self.renderer.render(column)?.definition()
                )])
            }
            AlterClause::Modify(column) => {
                column.validate()?;
                let rendered = self.renderer.render(column)?;
                self.dialect.modify_column_clauses(column, &rendered)
            }
            AlterClause::Drop(name) => Ok(vec![format!("DROP COLUMN {}", self.quote(name))]),
        }
    }

    /// ALTER TABLE carrying every clause, in order. Dialects that cannot
    /// batch get one statement per clause fragment.
    pub fn alter_table(&self, table: &str, clauses: &[AlterClause<'_>]) -> Result<Vec<String>> {
        let mut fragments = Vec::new();
        for clause in clauses {
            fragments.extend(self.clause_fragments(clause)?);
        }

        if fragments.is_empty() {
            return Ok(Vec::new());
        }

        let prefix = format!("ALTER TABLE {}", self.quote(table));
        if self.dialect.batch_alter() {
            Ok(vec![format!("{} {}", prefix, fragments.join(", "))])
        } else {
            Ok(fragments
                .into_iter()
                .map(|fragment| format!("{} {}", prefix, fragment))
                .collect())
        }
    }

    pub fn add_column(&self, table: &str, column: &ColumnDefinition) -> Result<Vec<String>> {
        self.alter_table(table, &[AlterClause::Add(column)])
    }

    pub fn modify_column(&self, table: &str, column: &ColumnDefinition) -> Result<Vec<String>> {
        self.alter_table(table, &[AlterClause::Modify(column)])
    }

    pub fn drop_column(&self, table: &str, column: &str) -> Result<Vec<String>> {
        self.alter_table(table, &[AlterClause::Drop(column)])
    }
}
