//! Schema module for table_sync
//!
//! This module holds table definitions, DDL generation and reconciliation.

pub mod ddl;
pub mod dialect;
pub mod diff;
pub mod legacy;
pub mod loader;
pub mod manager;
pub mod model;
pub mod render;
pub mod types;

// Re-export key types
pub use ddl::{AlterClause, DdlBuilder};
pub use dialect::{Dialect, EscapeString};
pub use diff::{columns_equal, SchemaDiff};
pub use legacy::{convert_legacy_columns, LegacyColumn};
pub use manager::{SchemaManager, SchemaOptions};
pub use model::TableModel;
pub use render::Renderer;
pub use types::{ColumnDefinition, ColumnType, DefaultValue, KeyRole, TableDefinition};
