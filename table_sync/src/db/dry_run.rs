//! Dry-run connection
//!
//! Wraps a connection so generated statements are logged and recorded
//! instead of executed. Introspection still reads the live database.

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::db::connection::Connection;
use crate::db::introspect::Introspector;
use crate::error::Result;
use crate::schema::dialect::EscapeString;
use crate::schema::types::TableDefinition;

/// A connection that records statements instead of running them
pub struct DryRun<C> {
    inner: C,
    statements: Mutex<Vec<String>>,
}

impl<C> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            statements: Mutex::new(Vec::new()),
        }
    }

    /// The wrapped connection
    pub fn inner(&self) -> &C {
        &self.inner
    }

    fn recorded(&self) -> MutexGuard<'_, Vec<String>> {
        // A panic while holding the lock cannot leave the Vec half-written
        self.statements
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Statements recorded so far
    pub fn statements(&self) -> Vec<String> {
        self.recorded().clone()
    }

    /// Drain the recorded statements
    pub fn take_statements(&self) -> Vec<String> {
        std::mem::take(&mut *self.recorded())
    }
}

impl<C: EscapeString> EscapeString for DryRun<C> {
    fn escape_string(&self, value: &str) -> String {
        self.inner.escape_string(value)
    }
}

#[async_trait]
impl<C: Connection> Connection for DryRun<C> {
    async fn execute(&self, sql: &str) -> Result<u64> {
        tracing::info!(sql, "Statement (dry run)");
        self.recorded().push(sql.to_string());
        Ok(0)
    }
}

#[async_trait]
impl<C: Introspector> Introspector for DryRun<C> {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        self.inner.table_definition(table).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use pretty_assertions::assert_eq;

    struct Unreachable;

    impl EscapeString for Unreachable {
        fn escape_string(&self, value: &str) -> String {
            value.replace('\'', "''")
        }
    }

    #[async_trait]
    impl Connection for Unreachable {
        async fn execute(&self, sql: &str) -> Result<u64> {
            panic!("dry run executed {sql}");
        }
    }

    #[async_trait]
    impl Introspector for Unreachable {
        async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
            Err(Error::TableNotFound {
                table: table.to_string(),
            })
        }
    }

    #[tokio::test]
    async fn records_instead_of_executing() {
        let dry = DryRun::new(Unreachable);
        assert_eq!(dry.execute("DROP TABLE \"users\"").await.unwrap(), 0);
        assert_eq!(dry.execute("DROP TABLE \"orders\"").await.unwrap(), 0);

        assert_eq!(
            dry.take_statements(),
            vec!["DROP TABLE \"users\"", "DROP TABLE \"orders\""]
        );
        assert!(dry.statements().is_empty());
    }

    #[tokio::test]
    async fn delegates_introspection_and_escaping() {
        let dry = DryRun::new(Unreachable);
        let err = dry.table_definition("ghost_table").await.unwrap_err();
        assert!(err.is_table_not_found());
        assert_eq!(dry.escape_string("it's"), "it''s");
    }
}
