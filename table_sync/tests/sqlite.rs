#![cfg(feature = "integration_tests")]

use pretty_assertions::assert_eq;
use table_sync::config::DatabaseConfig;
use table_sync::schema::dialect::SqliteDialect;
use table_sync::{
    ColumnDefinition, ColumnType, DatabaseConnection, DefaultValue, DryRun, SchemaManager,
    TableDefinition,
};

async fn memory() -> DatabaseConnection {
    DatabaseConnection::connect(&DatabaseConfig {
        driver: "sqlite".to_string(),
        url: "sqlite::memory:".to_string(),
        pool_size: Some(1),
        timeout_seconds: Some(5),
    })
    .await
    .unwrap()
}

fn accounts() -> TableDefinition {
    TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Serial).primary_key())
        .with_column(ColumnDefinition::new("email", ColumnType::Varchar).length(255).not_null().unique())
        .with_column(ColumnDefinition::new("balance", ColumnType::Numeric).precision(10, Some(2)).default_value(DefaultValue::Integer(0)))
        .with_column(ColumnDefinition::new("active", ColumnType::Boolean).default_value(DefaultValue::Boolean(true)))
        .with_column(ColumnDefinition::new("status", ColumnType::Varchar).length(16).default_value(DefaultValue::text("it's new")))
        .with_column(ColumnDefinition::new("created_at", ColumnType::Datetime).default_value(DefaultValue::CurrentTimestamp))
}

#[tokio::test]
async fn created_table_reads_back_in_sync() {
    let manager = SchemaManager::new(memory().await, Box::new(SqliteDialect::new()));

    manager.ensure_table("accounts", &accounts()).await.unwrap();
    assert!(manager.plan_table("accounts", &accounts()).await.unwrap().is_empty());

    let email = manager.get_column_def("accounts", "email").await.unwrap().unwrap();
    assert_eq!(email.length, Some(255));
    assert!(!email.nullable);
}

#[tokio::test]
async fn columns_are_added_and_dropped() {
    let manager = SchemaManager::new(memory().await, Box::new(SqliteDialect::new()));
    manager.ensure_table("accounts", &accounts()).await.unwrap();

    let mut desired = accounts();
    desired.columns.retain(|c| c.name != "status");
    desired.columns.push(ColumnDefinition::new("age", ColumnType::Integer));

    manager.ensure_table("accounts", &desired).await.unwrap();

    assert!(manager.get_column_def("accounts", "status").await.unwrap().is_none());
    let age = manager.get_column_def("accounts", "age").await.unwrap().unwrap();
    assert_eq!(age.column_type, ColumnType::Integer);
    assert!(manager.plan_table("accounts", &desired).await.unwrap().is_empty());
}

#[tokio::test]
async fn dry_run_leaves_the_database_alone() {
    let manager = SchemaManager::new(DryRun::new(memory().await), Box::new(SqliteDialect::new()));

    manager.ensure_table("accounts", &accounts()).await.unwrap();

    let recorded = manager.connection().statements();
    assert_eq!(recorded.len(), 2);
    assert!(recorded[0].starts_with("CREATE TABLE \"accounts\""));
    assert_eq!(
        recorded[1],
        r#"CREATE UNIQUE INDEX "accounts_email_idx" ON "accounts" ("email")"#
    );
    assert!(manager.get_column_def("accounts", "id").await.unwrap().is_none());
}

#[tokio::test]
async fn plain_integer_key_stays_in_sync() {
    let manager = SchemaManager::new(memory().await, Box::new(SqliteDialect::new()));
    let definition = TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Integer).primary_key())
        .with_column(ColumnDefinition::new("name", ColumnType::Text))
        .with_column(ColumnDefinition::new("grade", ColumnType::Char))
        .with_column(ColumnDefinition::new("score", ColumnType::Numeric));

    manager.ensure_table("t", &definition).await.unwrap();
    assert!(manager.plan_table("t", &definition).await.unwrap().is_empty());
    manager.ensure_table("t", &definition).await.unwrap();
}

#[tokio::test]
async fn generated_column_outside_the_key_is_refused() {
    let manager = SchemaManager::new(memory().await, Box::new(SqliteDialect::new()));
    let definition = TableDefinition::new()
        .with_column(ColumnDefinition::new("code", ColumnType::Text).primary_key())
        .with_column(ColumnDefinition::new("seq", ColumnType::Serial));

    let err = manager.ensure_table("codes", &definition).await.unwrap_err();
    assert!(matches!(err, table_sync::Error::Unsupported { .. }));
    assert!(manager.get_column_def("codes", "code").await.unwrap().is_none());
}
