//! table_sync: idempotent table creation and column reconciliation
//!
//! table_sync compares the live shape of a table with a declared
//! [`TableDefinition`] and issues the DDL that closes the gap. Definitions
//! come from Rust structs (`#[derive(TableSchema)]`), definition files, or
//! are built in code.

pub mod config;
pub mod db;
pub mod error;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::{Connection, DatabaseConnection};
pub use db::dry_run::DryRun;
pub use db::introspect::Introspector;
pub use error::{Error, Result};
pub use schema::diff::SchemaDiff;
pub use schema::manager::{SchemaManager, SchemaOptions};
pub use schema::model::TableModel;
pub use schema::types::{ColumnDefinition, ColumnType, DefaultValue, KeyRole, TableDefinition};
pub use table_sync_macros::TableSchema;

/// Initialize table_sync with the specified configuration file.
///
/// Installs logging when the file configures it, then connects.
pub async fn init(config_path: &str) -> Result<SchemaManager<DatabaseConnection>> {
    let config = config::load_from_file(config_path)?;
    utils::logging::init_logging(&config.logging)?;
    connect(&config).await
}

/// Connect to the configured database and build a manager over it
pub async fn connect(config: &Config) -> Result<SchemaManager<DatabaseConnection>> {
    let connection = DatabaseConnection::connect(&config.database).await?;
    let dialect = schema::dialect::for_driver(&config.database.driver)?;
    Ok(SchemaManager::new(connection, dialect).with_options(SchemaOptions::from(config)))
}
