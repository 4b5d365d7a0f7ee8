#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use table_sync::schema::dialect::{self, escape_standard, EscapeString};
use table_sync::{
    ColumnDefinition, ColumnType, Connection, Error, Introspector, Result, SchemaManager,
    TableDefinition,
};

/// In-memory connection: serves table definitions from a map and records
/// every statement it is asked to run
#[derive(Default)]
pub struct MockConnection {
    tables: Mutex<HashMap<String, TableDefinition>>,
    created_as: Mutex<HashMap<String, TableDefinition>>,
    executed: Mutex<Vec<String>>,
    execute_failure: Mutex<Option<String>>,
    introspection_failure: Mutex<Option<String>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, name: &str, definition: TableDefinition) -> Self {
        self.set_table(name, definition);
        self
    }

    pub fn set_table(&self, name: &str, definition: TableDefinition) {
        self.tables
            .lock()
            .unwrap()
            .insert(name.to_string(), definition);
    }

    /// Once a CREATE TABLE for `name` runs, serve `definition` for it
    pub fn create_as(&self, name: &str, definition: TableDefinition) {
        self.created_as
            .lock()
            .unwrap()
            .insert(name.to_string(), definition);
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    pub fn clear_executed(&self) {
        self.executed.lock().unwrap().clear();
    }

    pub fn fail_execute(&self, message: &str) {
        *self.execute_failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn fail_introspection(&self, message: &str) {
        *self.introspection_failure.lock().unwrap() = Some(message.to_string());
    }
}

impl EscapeString for MockConnection {
    fn escape_string(&self, value: &str) -> String {
        escape_standard(value)
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn execute(&self, sql: &str) -> Result<u64> {
        // Let concurrent callers interleave
        tokio::task::yield_now().await;

        self.executed.lock().unwrap().push(sql.to_string());
        if let Some(message) = self.execute_failure.lock().unwrap().clone() {
            return Err(Error::driver(sql, message));
        }

        if sql.starts_with("CREATE TABLE") {
            let mut created = self.created_as.lock().unwrap();
            let name = created
                .keys()
                .find(|name| sql.contains(name.as_str()))
                .cloned();
            if let Some(name) = name {
                if let Some(definition) = created.remove(&name) {
                    self.tables.lock().unwrap().insert(name, definition);
                }
            }
        }
        Ok(0)
    }
}

#[async_trait]
impl Introspector for MockConnection {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        tokio::task::yield_now().await;

        if let Some(message) = self.introspection_failure.lock().unwrap().clone() {
            return Err(Error::Introspection(message));
        }
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .ok_or_else(|| Error::TableNotFound {
                table: table.to_string(),
            })
    }
}

pub fn manager(driver: &str, connection: MockConnection) -> SchemaManager<MockConnection> {
    SchemaManager::new(connection, dialect::for_driver(driver).unwrap())
}

/// `id serial primary key, email varchar(255) not null`
pub fn users() -> TableDefinition {
    TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Serial).primary_key())
        .with_column(
            ColumnDefinition::new("email", ColumnType::Varchar)
                .length(255)
                .not_null(),
        )
}
