//! Error types for table_sync

use thiserror::Error;

/// Result type for table_sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for table_sync
#[derive(Error, Debug)]
pub enum Error {
    /// Introspection found no table with this name. `ensure_table` recovers
    /// from this kind by creating the table.
    #[error("Table not found: {table}")]
    TableNotFound { table: String },

    /// The database rejected a generated statement. `message` is the
    /// driver's text, unchanged.
    #[error("Driver error: {message}")]
    Driver { sql: String, message: String },

    /// A table or column definition breaks a data-model invariant.
    #[error("Invalid definition: {0}")]
    DefinitionInvariant(String),

    #[error("Introspection error: {0}")]
    Introspection(String),

    #[error("Unsupported by {dialect}: {operation}")]
    Unsupported { dialect: String, operation: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl Error {
    /// True when this error reports a missing table
    pub fn is_table_not_found(&self) -> bool {
        matches!(self, Error::TableNotFound { .. })
    }

    /// Wrap a failure reported while executing `sql`
    pub fn driver(sql: &str, message: impl Into<String>) -> Self {
        Error::Driver {
            sql: sql.to_string(),
            message: message.into(),
        }
    }

    /// Build a driver error from an sqlx failure, keeping the database's own
    /// message when there is one
    pub fn from_sqlx(sql: &str, error: sqlx::Error) -> Self {
        let message = match error.as_database_error() {
            Some(db_error) => db_error.message().to_string(),
            None => error.to_string(),
        };
        Error::driver(sql, message)
    }

    pub(crate) fn unsupported(dialect: &str, operation: impl Into<String>) -> Self {
        Error::Unsupported {
            dialect: dialect.to_string(),
            operation: operation.into(),
        }
    }
}

/// Convert Serde JSON errors to table_sync errors
impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert YAML errors to table_sync errors
impl From<serde_yaml::Error> for Error {
    fn from(error: serde_yaml::Error) -> Self {
        Error::SerializationError(error.to_string())
    }
}

/// Convert TOML deserialization errors to table_sync errors
impl From<toml::de::Error> for Error {
    fn from(error: toml::de::Error) -> Self {
        Error::ConfigError(error.to_string())
    }
}
