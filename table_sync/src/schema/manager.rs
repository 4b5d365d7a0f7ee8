//! Schema manager
//!
//! Owns one connection and one dialect, and exposes the DDL operations plus
//! table reconciliation on top of them.

use std::collections::HashMap;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::db::connection::Connection;
use crate::db::introspect::{parse_column_type, Introspector};
use crate::error::Result;
use crate::schema::ddl::DdlBuilder;
use crate::schema::dialect::Dialect;
use crate::schema::diff::SchemaDiff;
use crate::schema::model::TableModel;
use crate::schema::render::Renderer;
use crate::schema::types::{ColumnDefinition, TableDefinition};
use crate::utils::naming::DEFAULT_INDEX_PATTERN;

/// Knobs for DDL generation and reconciliation
#[derive(Debug, Clone)]
pub struct SchemaOptions {
    /// When false, `ensure_table` keeps columns the desired definition no
    /// longer lists
    pub allow_column_removal: bool,
    pub index_pattern: String,
    /// Canonical type tag to dialect type name
    pub type_overrides: HashMap<String, String>,
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self {
            allow_column_removal: true,
            index_pattern: DEFAULT_INDEX_PATTERN.to_string(),
            type_overrides: HashMap::new(),
        }
    }
}

impl From<&Config> for SchemaOptions {
    fn from(config: &Config) -> Self {
        Self {
            allow_column_removal: config.schema.allow_column_removal,
            index_pattern: config.naming.index_pattern.clone(),
            type_overrides: config.type_mapping.overrides.clone(),
        }
    }
}

/// Creates, alters and reconciles tables over one connection.
///
/// Schema-mutating calls on the same manager run one at a time. Nothing
/// guards against another process altering the same table concurrently;
/// deployments must serialize those externally.
pub struct SchemaManager<C> {
    connection: C,
    dialect: Box<dyn Dialect>,
    options: SchemaOptions,
    schema_lock: Mutex<()>,
}

impl<C: Connection + Introspector> SchemaManager<C> {
    pub fn new(connection: C, dialect: Box<dyn Dialect>) -> Self {
        Self {
            connection,
            dialect,
            options: SchemaOptions::default(),
            schema_lock: Mutex::new(()),
        }
    }

    pub fn with_options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    pub fn options(&self) -> &SchemaOptions {
        &self.options
    }

    fn builder(&self) -> DdlBuilder<'_> {
        let renderer = Renderer::new(self.dialect.as_ref(), &self.connection)
            .with_type_overrides(&self.options.type_overrides);
        DdlBuilder::new(renderer).with_index_pattern(&self.options.index_pattern)
    }

    /// Submit statements in order, stopping at the first failure
    async fn run(&self, statements: Vec<String>) -> Result<()> {
        for sql in &statements {
            tracing::debug!(sql = %sql, "Executing statement");
            let rows = self.connection.execute(sql).await?;
            tracing::trace!(rows, "Statement finished");
        }
        Ok(())
    }

    /// Create `table` with its primary key and indexes
    pub async fn create_table(&self, table: &str, definition: &TableDefinition) -> Result<()> {
        let statements = self.builder().create_table(table, definition)?;
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, columns = definition.columns.len(), "Creating table");
        self.run(statements).await
    }

    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let sql = self.builder().drop_table(table);
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, "Dropping table");
        self.run(vec![sql]).await
    }

    pub async fn add_column(&self, table: &str, column: &ColumnDefinition) -> Result<()> {
        let statements = self.builder().add_column(table, column)?;
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, column = %column.name, "Adding column");
        self.run(statements).await
    }

    pub async fn modify_column(&self, table: &str, column: &ColumnDefinition) -> Result<()> {
        let statements = self.builder().modify_column(table, column)?;
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, column = %column.name, "Modifying column");
        self.run(statements).await
    }

    pub async fn drop_column(&self, table: &str, column: &str) -> Result<()> {
        let statements = self.builder().drop_column(table, column)?;
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, column, "Dropping column");
        self.run(statements).await
    }

    /// Create a plain index. Without a name, one is synthesized from the
    /// configured pattern.
    pub async fn create_index<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        name: Option<&str>,
    ) -> Result<()> {
        self.create_index_inner(table, columns, name, false).await
    }

    pub async fn create_unique_index<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        name: Option<&str>,
    ) -> Result<()> {
        self.create_index_inner(table, columns, name, true).await
    }

    async fn create_index_inner<S: AsRef<str>>(
        &self,
        table: &str,
        columns: &[S],
        name: Option<&str>,
        unique: bool,
    ) -> Result<()> {
        let sql = self.builder().create_index(table, columns, name, unique)?;
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, unique, "Creating index");
        self.run(vec![sql]).await
    }

    pub async fn drop_index(&self, table: &str, name: &str) -> Result<()> {
        let sql = self.builder().drop_index(table, name);
        let _guard = self.schema_lock.lock().await;
        tracing::info!(table, index = name, "Dropping index");
        self.run(vec![sql]).await
    }

    /// Bring `table` to the shape of `desired`.
    ///
    /// A missing table is created. Otherwise every added, modified and
    /// dropped column goes into one ALTER TABLE (one per clause where the
    /// dialect cannot batch). A table already in shape issues nothing.
    pub async fn ensure_table(&self, table: &str, desired: &TableDefinition) -> Result<()> {
        let _guard = self.schema_lock.lock().await;
        let statements = self.plan(table, desired).await?;
        if statements.is_empty() {
            tracing::debug!(table, "Table is in sync");
            return Ok(());
        }
        self.run(statements).await
    }

    /// Statements `ensure_table` would issue right now, without running them
    pub async fn plan_table(&self, table: &str, desired: &TableDefinition) -> Result<Vec<String>> {
        self.plan(table, desired).await
    }

    /// Reconcile the table a model type declares
    pub async fn ensure_model<M: TableModel>(&self) -> Result<()> {
        self.ensure_table(&M::table_name(), &M::table_definition())
            .await
    }

    async fn plan(&self, table: &str, desired: &TableDefinition) -> Result<Vec<String>> {
        desired.validate()?;
        let builder = self.builder();

        let current = match self.connection.table_definition(table).await {
            Ok(current) => current,
            Err(e) if e.is_table_not_found() => {
                tracing::info!(table, "Table does not exist, creating it");
                return builder.create_table(table, desired);
            }
            Err(e) => return Err(e),
        };
        current.validate()?;

        let desired = desired.normalized();
        let mut diff = SchemaDiff::between(
            &self.comparable(&current, false),
            &self.comparable(&desired, true),
        );
        if !self.options.allow_column_removal && !diff.to_drop.is_empty() {
            tracing::warn!(table, columns = ?diff.to_drop, "Column removal disabled, keeping columns");
            diff.to_drop.clear();
        }
        if diff.is_empty() {
            return Ok(Vec::new());
        }

        tracing::info!(
            table,
            add = diff.to_add.len(),
            modify = diff.to_modify.len(),
            drop = diff.to_drop.len(),
            "Reconciling table"
        );
        builder.alter_table(table, &diff.clauses(&desired))
    }

    /// A definition in the shape the engine reports it back in.
    ///
    /// Key columns read back NOT NULL and the dialect fills in what the
    /// engine implies. Declared columns also trade an overridden type name
    /// for the canonical type the engine reports for it.
    fn comparable(&self, definition: &TableDefinition, declared: bool) -> TableDefinition {
        let mut definition = definition.normalized();
        let primary_key = definition.primary_key_columns();
        for column in &mut definition.columns {
            if declared {
                self.apply_type_override(column);
            }
            let sole_key = matches!(primary_key.as_slice(), [only] if *only == column.name);
            self.dialect.normalize_column(column, sole_key);
        }
        definition
    }

    fn apply_type_override(&self, column: &mut ColumnDefinition) {
        if column.is_auto_generated() {
            return;
        }
        let target = match self.options.type_overrides.get(column.column_type.as_str()) {
            Some(target) => target,
            None => return,
        };
        let parsed = parse_column_type(target);
        column.column_type = parsed.column_type;
        if parsed.length.is_some() {
            column.length = parsed.length;
        }
        if parsed.precision.is_some() {
            column.precision = parsed.precision;
            column.scale = parsed.scale;
        }
    }

    /// The live definition of one column, or `None` when the table or the
    /// column does not exist
    pub async fn get_column_def(
        &self,
        table: &str,
        column: &str,
    ) -> Result<Option<ColumnDefinition>> {
        match self.connection.table_definition(table).await {
            Ok(definition) => Ok(definition.column(column).cloned()),
            Err(e) if e.is_table_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DatabaseConfig, LoggingConfig, NamingConfig, SchemaConfig, TypeMappingConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn options_follow_config() {
        let config = Config {
            database: DatabaseConfig {
                driver: "sqlite".to_string(),
                url: "sqlite::memory:".to_string(),
                pool_size: None,
                timeout_seconds: None,
            },
            schema: SchemaConfig {
                allow_column_removal: false,
                dry_run: false,
            },
            naming: NamingConfig {
                index_pattern: "ix_{table}_{columns}".to_string(),
            },
            type_mapping: TypeMappingConfig {
                overrides: HashMap::from([("json".to_string(), "JSONB".to_string())]),
            },
            logging: None::<LoggingConfig>,
        };

        let options = SchemaOptions::from(&config);
        assert!(!options.allow_column_removal);
        assert_eq!(options.index_pattern, "ix_{table}_{columns}");
        assert_eq!(options.type_overrides.get("json").map(String::as_str), Some("JSONB"));
    }

    #[test]
    fn default_options_allow_removal() {
        let options = SchemaOptions::default();
        assert!(options.allow_column_removal);
        assert_eq!(options.index_pattern, DEFAULT_INDEX_PATTERN);
    }
}
