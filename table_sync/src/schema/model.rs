//! Table models
//!
//! Types that declare their own table, usually through
//! `#[derive(TableSchema)]`.

use crate::schema::types::TableDefinition;

/// A Rust type backed by one table
pub trait TableModel {
    /// Name of the backing table
    fn table_name() -> String;

    /// Desired shape of the backing table
    fn table_definition() -> TableDefinition;
}
