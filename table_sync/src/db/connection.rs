//! Database connection handling
//!
//! This module provides the connection collaborator the schema manager
//! submits generated SQL to.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, Executor,
    MySqlPool, PgPool, SqlitePool,
};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};
use crate::schema::dialect::{self, escape_backslashes, escape_standard, Dialect, EscapeString};

/// Submits SQL text to a database
#[async_trait]
pub trait Connection: EscapeString + Send + Sync {
    /// Execute one statement and return the number of affected rows.
    ///
    /// A failure reported by the database becomes [`Error::Driver`] carrying
    /// the driver's message.
    async fn execute(&self, sql: &str) -> Result<u64>;
}

/// Enumeration of supported database types
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(PgPool),
    MySql(MySqlPool),
    Sqlite(SqlitePool),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(1);
        let timeout = Duration::from_secs(config.timeout_seconds.unwrap_or(30));

        tracing::debug!(driver = %config.driver, pool_size, "Connecting to database");

        match config.driver.to_lowercase().as_str() {
            "postgres" | "postgresql" => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Postgres(pool))
            }
            "mysql" | "mariadb" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::MySql(pool))
            }
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Sqlite(pool))
            }
            _ => Err(Error::ConfigError(format!(
                "Unsupported database driver: {}",
                config.driver
            ))),
        }
    }

    /// Name of the backend, as accepted by [`dialect::for_driver`]
    pub fn driver_name(&self) -> &'static str {
        match self {
            DatabaseConnection::Postgres(_) => "postgres",
            DatabaseConnection::MySql(_) => "mysql",
            DatabaseConnection::Sqlite(_) => "sqlite",
        }
    }

    /// The dialect matching this connection's backend
    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            DatabaseConnection::Postgres(_) => Box::new(dialect::PostgresDialect::new()),
            DatabaseConnection::MySql(_) => Box::new(dialect::MySqlDialect::new()),
            DatabaseConnection::Sqlite(_) => Box::new(dialect::SqliteDialect::new()),
        }
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres(pool) => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
            DatabaseConnection::Sqlite(pool) => pool.close().await,
        }
    }
}

impl EscapeString for DatabaseConnection {
    fn escape_string(&self, value: &str) -> String {
        match self {
            DatabaseConnection::MySql(_) => escape_backslashes(value),
            DatabaseConnection::Postgres(_) | DatabaseConnection::Sqlite(_) => {
                escape_standard(value)
            }
        }
    }
}

#[async_trait]
impl Connection for DatabaseConnection {
    async fn execute(&self, sql: &str) -> Result<u64> {
        // Unprepared execution: DDL goes over the simple query protocol
        let rows = match self {
            DatabaseConnection::Postgres(pool) => pool
                .execute(sql)
                .await
                .map(|r| r.rows_affected()),
            DatabaseConnection::MySql(pool) => pool
                .execute(sql)
                .await
                .map(|r| r.rows_affected()),
            DatabaseConnection::Sqlite(pool) => pool
                .execute(sql)
                .await
                .map(|r| r.rows_affected()),
        };

        rows.map_err(|e| Error::from_sqlx(sql, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(driver: &str, url: &str) -> DatabaseConfig {
        DatabaseConfig {
            driver: driver.to_string(),
            url: url.to_string(),
            pool_size: None,
            timeout_seconds: Some(1),
        }
    }

    #[tokio::test]
    async fn unknown_driver_is_a_config_error() {
        let result = DatabaseConnection::connect(&config("oracle", "oracle://localhost")).await;
        assert!(matches!(result, Err(Error::ConfigError(_))));
    }

    #[tokio::test]
    async fn sqlite_memory_connection_executes_and_escapes() {
        let conn = DatabaseConnection::connect(&config("sqlite", "sqlite::memory:"))
            .await
            .unwrap();
        assert_eq!(conn.driver_name(), "sqlite");
        assert_eq!(conn.dialect().name(), "sqlite");
        assert_eq!(conn.escape_string("it's"), "it''s");

        conn.execute("CREATE TABLE t (id INTEGER)").await.unwrap();
        assert_eq!(conn.execute("INSERT INTO t (id) VALUES (1)").await.unwrap(), 1);

        let err = conn.execute("ALTER TABLE missing ADD COLUMN x INTEGER").await.unwrap_err();
        match err {
            Error::Driver { sql, message } => {
                assert_eq!(sql, "ALTER TABLE missing ADD COLUMN x INTEGER");
                assert!(message.contains("missing"));
            }
            other => panic!("expected driver error, got {other:?}"),
        }
    }
}
