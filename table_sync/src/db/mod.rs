//! Database module for table_sync
//!
//! This module holds the connection and introspection collaborators.

pub mod connection;
pub mod dry_run;
pub mod introspect;

// Re-export key types
pub use connection::{Connection, DatabaseConnection};
pub use dry_run::DryRun;
pub use introspect::Introspector;
