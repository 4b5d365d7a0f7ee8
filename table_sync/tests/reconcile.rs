mod common;

use common::{manager, users, MockConnection};
use pretty_assertions::assert_eq;
use rstest::rstest;
use std::collections::HashMap;

use table_sync::{
    ColumnDefinition, ColumnType, DefaultValue, Error, SchemaOptions, TableDefinition,
};

fn users_with_age() -> TableDefinition {
    TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Serial).primary_key())
        .with_column(ColumnDefinition::new("age", ColumnType::Integer))
}

#[tokio::test]
async fn missing_table_is_created() {
    let manager = manager("mysql", MockConnection::new());
    manager.ensure_table("users", &users()).await.unwrap();

    assert_eq!(
        manager.connection().executed(),
        vec!["CREATE TABLE `users` (\n  `id` INT AUTO_INCREMENT,\n  `email` VARCHAR(255) NOT NULL,\n  PRIMARY KEY (`id`)\n)"]
    );
}

#[tokio::test]
async fn ghost_table_is_created_not_an_error() {
    let definition = TableDefinition::new()
        .with_column(ColumnDefinition::new("payload", ColumnType::Json))
        .with_column(ColumnDefinition::new("seen", ColumnType::Boolean).default_value(DefaultValue::Boolean(false)));

    let manager = manager("postgres", MockConnection::new());
    manager.ensure_table("ghost_table", &definition).await.unwrap();

    assert_eq!(
        manager.connection().executed(),
        vec!["CREATE TABLE \"ghost_table\" (\n  \"payload\" JSON,\n  \"seen\" BOOLEAN DEFAULT FALSE\n)"]
    );
}

#[tokio::test]
async fn second_ensure_issues_nothing() {
    let connection = MockConnection::new();
    connection.create_as("users", users());
    let manager = manager("mysql", connection);

    manager.ensure_table("users", &users()).await.unwrap();
    assert_eq!(manager.connection().executed().len(), 1);

    manager.connection().clear_executed();
    manager.ensure_table("users", &users()).await.unwrap();
    assert!(manager.connection().executed().is_empty());
}

#[rstest]
#[case::mysql("mysql", vec!["ALTER TABLE `users` ADD COLUMN `age` INT, DROP COLUMN `email`"])]
#[case::postgres("postgres", vec![r#"ALTER TABLE "users" ADD COLUMN "age" INTEGER, DROP COLUMN "email""#])]
#[case::sqlite("sqlite", vec![
    r#"ALTER TABLE "users" ADD COLUMN "age" INTEGER"#,
    r#"ALTER TABLE "users" DROP COLUMN "email""#,
])]
#[tokio::test]
async fn add_comes_before_drop(#[case] driver: &str, #[case] expected: Vec<&str>) {
    let manager = manager(driver, MockConnection::new().with_table("users", users()));
    manager.ensure_table("users", &users_with_age()).await.unwrap();

    assert_eq!(manager.connection().executed(), expected);
}

#[tokio::test]
async fn each_set_gets_its_own_clause() {
    let live = TableDefinition::new()
        .with_column(ColumnDefinition::new("a", ColumnType::Integer))
        .with_column(ColumnDefinition::new("b", ColumnType::Integer));
    let desired = TableDefinition::new()
        .with_column(ColumnDefinition::new("b", ColumnType::BigInt))
        .with_column(ColumnDefinition::new("c", ColumnType::Integer));

    let manager = manager("mysql", MockConnection::new().with_table("t", live));
    manager.ensure_table("t", &desired).await.unwrap();

    assert_eq!(
        manager.connection().executed(),
        vec!["ALTER TABLE `t` ADD COLUMN `c` INT, MODIFY COLUMN `b` BIGINT, DROP COLUMN `a`"]
    );
}

#[tokio::test]
async fn postgres_modify_spells_out_each_attribute() {
    let live = TableDefinition::new()
        .with_column(ColumnDefinition::new("name", ColumnType::Varchar).length(32).not_null());
    let desired = TableDefinition::new().with_column(
        ColumnDefinition::new("name", ColumnType::Varchar)
            .length(64)
            .default_value(DefaultValue::text("anonymous")),
    );

    let manager = manager("postgres", MockConnection::new().with_table("people", live));
    manager.ensure_table("people", &desired).await.unwrap();

    assert_eq!(
        manager.connection().executed(),
        vec![concat!(
            r#"ALTER TABLE "people" ALTER COLUMN "name" TYPE VARCHAR(64) USING "name"::VARCHAR(64), "#,
            r#"ALTER COLUMN "name" SET DEFAULT 'anonymous', "#,
            r#"ALTER COLUMN "name" DROP NOT NULL"#
        )]
    );
}

#[tokio::test]
async fn sqlite_cannot_modify_columns() {
    let live = TableDefinition::new().with_column(ColumnDefinition::new("n", ColumnType::Integer));
    let desired = TableDefinition::new().with_column(ColumnDefinition::new("n", ColumnType::Text));

    let manager = manager("sqlite", MockConnection::new().with_table("t", live));
    let err = manager.ensure_table("t", &desired).await.unwrap_err();

    assert!(matches!(err, Error::Unsupported { .. }));
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn key_columns_read_back_not_null_are_in_sync() {
    // What an engine reports for `id SERIAL, PRIMARY KEY (id)`
    let mut id = ColumnDefinition::new("id", ColumnType::Integer).not_null();
    id.autoincrement = true;
    let live = TableDefinition::new()
        .with_column(id)
        .with_column(ColumnDefinition::new("email", ColumnType::Varchar).length(255).not_null())
        .with_primary_key(&["id"]);

    let manager = manager("postgres", MockConnection::new().with_table("users", live));
    assert!(manager.plan_table("users", &users()).await.unwrap().is_empty());
}

#[tokio::test]
async fn extra_metadata_forces_a_modify() {
    let mut live = users();
    live.columns[1]
        .extra
        .insert("extra".to_string(), "on update current_timestamp".to_string());

    let manager = manager("mysql", MockConnection::new().with_table("users", live));
    let plan = manager.plan_table("users", &users()).await.unwrap();

    assert_eq!(
        plan,
        vec!["ALTER TABLE `users` MODIFY COLUMN `email` VARCHAR(255) NOT NULL"]
    );
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn column_removal_can_be_disabled() {
    let options = SchemaOptions {
        allow_column_removal: false,
        ..SchemaOptions::default()
    };
    let manager = manager("mysql", MockConnection::new().with_table("users", users()))
        .with_options(options);

    manager.ensure_table("users", &users_with_age()).await.unwrap();
    assert_eq!(
        manager.connection().executed(),
        vec!["ALTER TABLE `users` ADD COLUMN `age` INT"]
    );
}

#[tokio::test]
async fn driver_errors_carry_the_driver_message() {
    let connection = MockConnection::new().with_table("users", users());
    connection.fail_execute("Duplicate column name 'age'");
    let manager = manager("mysql", connection);

    let err = manager.ensure_table("users", &users_with_age()).await.unwrap_err();
    match &err {
        Error::Driver { sql, message } => {
            assert_eq!(message, "Duplicate column name 'age'");
            assert!(sql.starts_with("ALTER TABLE `users`"));
        }
        other => panic!("expected a driver error, got {other:?}"),
    }
    assert!(err.to_string().contains("Duplicate column name 'age'"));
}

#[tokio::test]
async fn other_introspection_failures_propagate() {
    let connection = MockConnection::new();
    connection.fail_introspection("permission denied for schema public");
    let manager = manager("postgres", connection);

    let err = manager.ensure_table("users", &users()).await.unwrap_err();
    assert!(matches!(err, Error::Introspection(msg) if msg.contains("permission denied")));
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn invalid_definitions_fail_before_any_sql() {
    let broken = TableDefinition::new().with_column(
        ColumnDefinition::new("status", ColumnType::Varchar)
            .length(8)
            .not_null()
            .default_value(DefaultValue::text("new")),
    );

    let manager = manager("mysql", MockConnection::new());
    let err = manager.ensure_table("orders", &broken).await.unwrap_err();
    assert!(matches!(err, Error::DefinitionInvariant(_)));

    let err = manager
        .add_column("orders", &broken.columns[0])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DefinitionInvariant(_)));
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn concurrent_ensures_create_once() {
    let connection = MockConnection::new();
    connection.create_as("users", users());
    let manager = manager("postgres", connection);

    let definition = users();
    let (first, second) = tokio::join!(
        manager.ensure_table("users", &definition),
        manager.ensure_table("users", &definition)
    );
    first.unwrap();
    second.unwrap();

    let creates = manager
        .connection()
        .executed()
        .iter()
        .filter(|sql| sql.starts_with("CREATE TABLE"))
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn get_column_def_reads_live_columns() {
    let manager = manager("mysql", MockConnection::new().with_table("users", users()));

    let email = manager.get_column_def("users", "email").await.unwrap().unwrap();
    assert_eq!(email.length, Some(255));
    assert!(manager.get_column_def("users", "nope").await.unwrap().is_none());
    assert!(manager.get_column_def("ghost_table", "id").await.unwrap().is_none());
}

#[tokio::test]
async fn direct_ddl_operations() {
    let manager = manager("mysql", MockConnection::new());

    manager.create_index("users", &["email"], None).await.unwrap();
    manager
        .create_unique_index("users", &["tenant_id", "email"], Some("users_login"))
        .await
        .unwrap();
    manager.drop_index("users", "users_login").await.unwrap();
    manager
        .add_column("users", &ColumnDefinition::new("age", ColumnType::Integer))
        .await
        .unwrap();
    manager
        .modify_column("users", &ColumnDefinition::new("age", ColumnType::SmallInt).not_null())
        .await
        .unwrap();
    manager.drop_column("users", "age").await.unwrap();
    manager.drop_table("users").await.unwrap();

    assert_eq!(
        manager.connection().executed(),
        vec![
            "CREATE INDEX `users_email_idx` ON `users` (`email`)",
            "CREATE UNIQUE INDEX `users_login` ON `users` (`tenant_id`, `email`)",
            "DROP INDEX `users_login` ON `users`",
            "ALTER TABLE `users` ADD COLUMN `age` INT",
            "ALTER TABLE `users` MODIFY COLUMN `age` SMALLINT NOT NULL",
            "ALTER TABLE `users` DROP COLUMN `age`",
            "DROP TABLE `users`",
        ]
    );
}

#[tokio::test]
async fn postgres_creates_indexes_after_the_table() {
    let definition = users()
        .with_column(ColumnDefinition::new("country", ColumnType::Char).length(2).indexed())
        .with_unique_index("users_email_key", &["email"]);

    let manager = manager("postgres", MockConnection::new());
    manager.create_table("users", &definition).await.unwrap();

    let executed = manager.connection().executed();
    assert_eq!(executed.len(), 3);
    assert!(executed[0].starts_with("CREATE TABLE \"users\""));
    assert_eq!(
        executed[1],
        r#"CREATE UNIQUE INDEX "users_email_key" ON "users" ("email")"#
    );
    assert_eq!(
        executed[2],
        r#"CREATE INDEX "users_country_idx" ON "users" ("country")"#
    );
}

#[tokio::test]
async fn sqlite_integer_key_reads_back_as_the_rowid() {
    // What SQLite reports for `id INTEGER, PRIMARY KEY (id)`
    let live = TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Integer).autoincrement())
        .with_column(ColumnDefinition::new("name", ColumnType::Text))
        .with_primary_key(&["id"]);
    let desired = TableDefinition::new()
        .with_column(ColumnDefinition::new("id", ColumnType::Integer).primary_key())
        .with_column(ColumnDefinition::new("name", ColumnType::Text));

    let manager = manager("sqlite", MockConnection::new().with_table("t", live));
    assert!(manager.plan_table("t", &desired).await.unwrap().is_empty());
    manager.ensure_table("t", &desired).await.unwrap();
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn sqlite_rejects_generated_columns_outside_the_key() {
    let definition = TableDefinition::new()
        .with_column(ColumnDefinition::new("code", ColumnType::Text).primary_key())
        .with_column(ColumnDefinition::new("seq", ColumnType::Serial));

    let manager = manager("sqlite", MockConnection::new());
    let err = manager.ensure_table("codes", &definition).await.unwrap_err();
    assert!(matches!(err, Error::Unsupported { .. }));
    assert!(manager.connection().executed().is_empty());
}

#[tokio::test]
async fn mysql_implied_sizes_are_in_sync() {
    // `NUMERIC` and `CHAR` as MySQL reports them back
    let live = TableDefinition::new()
        .with_column(ColumnDefinition::new("amount", ColumnType::Numeric).precision(10, Some(0)))
        .with_column(ColumnDefinition::new("flag", ColumnType::Char).length(1));
    let desired = TableDefinition::new()
        .with_column(ColumnDefinition::new("amount", ColumnType::Numeric))
        .with_column(ColumnDefinition::new("flag", ColumnType::Char));

    let manager = manager("mysql", MockConnection::new().with_table("t", live));
    assert!(manager.plan_table("t", &desired).await.unwrap().is_empty());
}

#[tokio::test]
async fn overridden_types_compare_as_what_the_engine_reports() {
    let options = SchemaOptions {
        type_overrides: HashMap::from([(
            "datetime".to_string(),
            "TIMESTAMP WITH TIME ZONE".to_string(),
        )]),
        ..SchemaOptions::default()
    };
    let desired = TableDefinition::new()
        .with_column(ColumnDefinition::new("seen_at", ColumnType::Datetime));

    let in_sync = TableDefinition::new()
        .with_column(ColumnDefinition::new("seen_at", ColumnType::Timestamp));
    let synced = manager("postgres", MockConnection::new().with_table("events", in_sync))
        .with_options(options.clone());
    assert!(synced.plan_table("events", &desired).await.unwrap().is_empty());

    let stale_table = TableDefinition::new()
        .with_column(ColumnDefinition::new("seen_at", ColumnType::Text));
    let stale = manager("postgres", MockConnection::new().with_table("events", stale_table))
        .with_options(options);
    assert_eq!(
        stale.plan_table("events", &desired).await.unwrap(),
        vec![concat!(
            r#"ALTER TABLE "events" ALTER COLUMN "seen_at" TYPE TIMESTAMP WITH TIME ZONE USING "seen_at"::TIMESTAMP WITH TIME ZONE, "#,
            r#"ALTER COLUMN "seen_at" DROP DEFAULT, "#,
            r#"ALTER COLUMN "seen_at" DROP NOT NULL"#
        )]
    );
}
