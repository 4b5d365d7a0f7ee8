//! Table introspection
//!
//! This module reads a live table back into a [`TableDefinition`] so it can be
//! compared with the desired one.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use sqlx::{FromRow, MySqlPool, PgPool, SqlitePool};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::types::{ColumnDefinition, ColumnType, DefaultValue, TableDefinition};

/// Reads table definitions from a live database
#[async_trait]
pub trait Introspector: Send + Sync {
    /// Describe `table`, or fail with [`Error::TableNotFound`] when it does
    /// not exist
    async fn table_definition(&self, table: &str) -> Result<TableDefinition>;
}

#[async_trait]
impl Introspector for DatabaseConnection {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        let definition = match self {
            DatabaseConnection::Postgres(pool) => {
                PostgresIntrospector { pool }.table_definition(table).await?
            }
            DatabaseConnection::MySql(pool) => {
                MySqlIntrospector { pool }.table_definition(table).await?
            }
            DatabaseConnection::Sqlite(pool) => {
                SqliteIntrospector { pool }.table_definition(table).await?
            }
        };

        tracing::debug!(
            table,
            columns = definition.columns.len(),
            indexes = definition.unique_indexes.len() + definition.multi_indexes.len(),
            "Introspected table"
        );
        Ok(definition)
    }
}

/// A reported type broken into canonical type and size attributes
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedType {
    pub column_type: ColumnType,
    pub length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
}

/// Map a type string reported by an engine (`character varying`,
/// `VARCHAR(255)`, `decimal(10,2)`, `tinyint(1)`) to a canonical type
pub fn parse_column_type(raw: &str) -> ParsedType {
    let lowered = raw.trim().to_lowercase();
    let (base, args) = match lowered.find('(') {
        Some(open) => {
            let close = lowered[open..]
                .find(')')
                .map(|i| open + i)
                .unwrap_or(lowered.len());
            let args: Vec<u32> = lowered[open + 1..close]
                .split(',')
                .filter_map(|a| a.trim().parse().ok())
                .collect();
            let rest = lowered.get(close + 1..).unwrap_or("").trim();
            let base = format!("{} {}", lowered[..open].trim(), rest);
            (base.trim().to_string(), args)
        }
        None => (lowered.clone(), Vec::new()),
    };

    let column_type = match base.as_str() {
        "tinyint" if args == [1] => ColumnType::Boolean,
        "int" | "int4" => ColumnType::Integer,
        "int2" => ColumnType::SmallInt,
        "int8" => ColumnType::BigInt,
        "character varying" => ColumnType::Varchar,
        "character" | "bpchar" => ColumnType::Char,
        "float4" => ColumnType::Float,
        "double precision" | "float8" => ColumnType::Double,
        "time without time zone" => ColumnType::Time,
        "timestamp without time zone" => ColumnType::Datetime,
        "timestamp with time zone" | "timestamptz" => ColumnType::Timestamp,
        "bytea" => ColumnType::Blob,
        other => ColumnType::from(other),
    };

    let (length, precision, scale) = match &column_type {
        ColumnType::Numeric => (None, args.first().copied(), args.get(1).copied()),
        ColumnType::Char | ColumnType::Varchar | ColumnType::Custom(_) => {
            (args.first().copied(), None, None)
        }
        _ => (None, None, None),
    };

    ParsedType {
        column_type,
        length,
        precision,
        scale,
    }
}

static CAST_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^(.*)::[A-Za-z_][A-Za-z0-9_ ]*$").expect("valid cast regex"));

static PG_INDEX_DEF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^CREATE (UNIQUE )?INDEX \S+ ON \S+ (?:USING \w+ )?\((.+)\)")
        .expect("valid index definition regex")
});

/// Drop a trailing `::type` cast from a Postgres default expression
pub fn strip_cast(raw: &str) -> &str {
    match CAST_SUFFIX.captures(raw.trim()).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => raw,
    }
}

/// Interpret a default expression as reported by the engine.
///
/// Returns `None` for `NULL` and for sequence defaults, which belong to the
/// column's autoincrement flag instead.
pub fn parse_default(raw: &str, column_type: &ColumnType) -> Option<DefaultValue> {
    let mut value = raw.trim();
    while value.len() >= 2 && value.starts_with('(') && value.ends_with(')') {
        value = value[1..value.len() - 1].trim();
    }

    let lowered = value.to_lowercase();
    if lowered == "null" || lowered.starts_with("nextval(") {
        return None;
    }
    if lowered.starts_with("current_timestamp") || lowered == "now()" {
        return Some(DefaultValue::CurrentTimestamp);
    }

    let quoted = value.len() >= 2 && value.starts_with('\'') && value.ends_with('\'');
    let text = if quoted {
        value[1..value.len() - 1].replace("''", "'")
    } else {
        value.to_string()
    };

    match column_type {
        ColumnType::Boolean => match text.to_lowercase().as_str() {
            "1" | "true" | "t" | "b'1'" => Some(DefaultValue::Boolean(true)),
            "0" | "false" | "f" | "b'0'" => Some(DefaultValue::Boolean(false)),
            _ => Some(DefaultValue::Text(text)),
        },
        t if t.is_integer() => match text.parse::<i64>() {
            Ok(i) => Some(DefaultValue::Integer(i)),
            Err(_) => Some(DefaultValue::Text(text)),
        },
        ColumnType::Numeric | ColumnType::Float | ColumnType::Double => {
            match text.parse::<f64>() {
                Ok(f) => Some(DefaultValue::Float(f)),
                Err(_) => Some(DefaultValue::Text(text)),
            }
        }
        _ => Some(DefaultValue::Text(text)),
    }
}

fn to_u32(value: Option<i64>) -> Option<u32> {
    value.and_then(|v| u32::try_from(v).ok())
}

fn introspection_error(table: &str, error: sqlx::Error) -> Error {
    Error::Introspection(format!("{}: {}", table, error))
}

/// Assemble a column from reported parts.
///
/// Engines may report a default on a NOT NULL column; the definition model
/// does not allow both, so the default wins and the column reads as
/// nullable.
fn assemble_column(
    name: &str,
    parsed: ParsedType,
    nullable: bool,
    raw_default: Option<&str>,
    autoincrement: bool,
) -> ColumnDefinition {
    let mut column = ColumnDefinition::new(name, parsed.column_type);
    column.length = parsed.length;
    column.precision = parsed.precision;
    column.scale = parsed.scale;
    column.nullable = nullable;
    column.autoincrement = autoincrement;
    if !autoincrement {
        column.default = raw_default.and_then(|d| parse_default(d, &column.column_type));
    }
    if column.default.is_some() && !column.nullable {
        tracing::debug!(column = name, "Column reports a default and NOT NULL, reading as nullable");
        column.nullable = true;
    }
    column
}

fn add_index(definition: &mut TableDefinition, name: String, columns: Vec<String>, unique: bool) {
    // Expression indexes have no column list a definition could declare
    if columns.is_empty() || columns.iter().any(|c| definition.column(c).is_none()) {
        tracing::warn!(index = %name, "Skipping index over expressions or unknown columns");
        return;
    }
    if unique {
        definition.unique_indexes.insert(name, columns);
    } else {
        definition.multi_indexes.insert(name, columns);
    }
}

#[derive(FromRow)]
struct PgColumnRow {
    column_name: String,
    data_type: String,
    udt_name: String,
    is_nullable: String,
    is_identity: String,
    column_default: Option<String>,
    character_maximum_length: Option<i32>,
    numeric_precision: Option<i32>,
    numeric_scale: Option<i32>,
}

#[derive(FromRow)]
struct PgKeyRow {
    constraint_name: String,
    column_name: String,
}

#[derive(FromRow)]
struct PgIndexRow {
    indexname: String,
    indexdef: String,
}

/// PostgreSQL introspector
struct PostgresIntrospector<'a> {
    pool: &'a PgPool,
}

#[async_trait]
impl<'a> Introspector for PostgresIntrospector<'a> {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        let sql = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                udt_name::text AS udt_name,
                is_nullable::text AS is_nullable,
                is_identity::text AS is_identity,
                column_default::text AS column_default,
                character_maximum_length::int4 AS character_maximum_length,
                numeric_precision::int4 AS numeric_precision,
                numeric_scale::int4 AS numeric_scale
            FROM information_schema.columns
            WHERE table_schema = current_schema() AND table_name = $1
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, PgColumnRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        if rows.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }

        let mut definition = TableDefinition::new();
        for row in rows {
            let reported = match row.data_type.as_str() {
                "USER-DEFINED" | "ARRAY" => row.udt_name.as_str(),
                other => other,
            };
            let mut parsed = parse_column_type(reported);
            match parsed.column_type {
                ColumnType::Char | ColumnType::Varchar => {
                    parsed.length = to_u32(row.character_maximum_length.map(i64::from));
                }
                ColumnType::Numeric => {
                    parsed.precision = to_u32(row.numeric_precision.map(i64::from));
                    parsed.scale = to_u32(row.numeric_scale.map(i64::from));
                }
                _ => {}
            }

            let autoincrement = row.is_identity == "YES"
                || row
                    .column_default
                    .as_deref()
                    .map_or(false, |d| d.starts_with("nextval("));

            definition.columns.push(assemble_column(
                &row.column_name,
                parsed,
                row.is_nullable == "YES",
                row.column_default.as_deref().map(strip_cast),
                autoincrement,
            ));
        }

        let sql = r#"
            SELECT
                tc.constraint_name::text AS constraint_name,
                kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
                AND tc.table_schema = current_schema()
                AND tc.table_name = $1
            ORDER BY kcu.ordinal_position
        "#;

        let key_rows = sqlx::query_as::<_, PgKeyRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        let key_constraint = key_rows.first().map(|r| r.constraint_name.clone());
        definition.primary_key = key_rows.into_iter().map(|r| r.column_name).collect();

        let sql = r#"
            SELECT indexname::text AS indexname, indexdef::text AS indexdef
            FROM pg_indexes
            WHERE schemaname = current_schema() AND tablename = $1
            ORDER BY indexname
        "#;

        let index_rows = sqlx::query_as::<_, PgIndexRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        for row in index_rows {
            if key_constraint.as_deref() == Some(row.indexname.as_str()) {
                continue;
            }
            let Some(captures) = PG_INDEX_DEF.captures(&row.indexdef) else {
                tracing::warn!(table, index = %row.indexname, "Unrecognized index definition");
                continue;
            };
            let unique = captures.get(1).is_some();
            let columns = captures
                .get(2)
                .map(|m| {
                    m.as_str()
                        .split(',')
                        .map(|c| c.trim().trim_matches('"').to_string())
                        .collect()
                })
                .unwrap_or_default();
            add_index(&mut definition, row.indexname, columns, unique);
        }

        Ok(definition)
    }
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    column_type: String,
    is_nullable: String,
    column_default: Option<String>,
    extra: String,
}

#[derive(FromRow)]
struct MySqlIndexRow {
    index_name: String,
    column_name: Option<String>,
    non_unique: i64,
}

/// MySQL introspector
struct MySqlIntrospector<'a> {
    pool: &'a MySqlPool,
}

#[async_trait]
impl<'a> Introspector for MySqlIntrospector<'a> {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        let sql = r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(COLUMN_TYPE AS CHAR) AS column_type,
                CAST(IS_NULLABLE AS CHAR) AS is_nullable,
                CAST(COLUMN_DEFAULT AS CHAR) AS column_default,
                CAST(EXTRA AS CHAR) AS extra
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
        "#;

        let rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        if rows.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }

        let mut definition = TableDefinition::new();
        for row in rows {
            let extra = row.extra.to_lowercase();
            let autoincrement = extra.contains("auto_increment");
            let mut column = assemble_column(
                &row.column_name,
                parse_column_type(&row.column_type),
                row.is_nullable == "YES",
                row.column_default.as_deref(),
                autoincrement,
            );

            // Anything else in EXTRA (ON UPDATE, generated columns) was not
            // declared by a definition and shows up as a difference
            let residue = extra
                .replace("auto_increment", "")
                .replace("default_generated", "");
            if !residue.trim().is_empty() {
                column
                    .extra
                    .insert("extra".to_string(), residue.trim().to_string());
            }
            definition.columns.push(column);
        }

        let sql = r#"
            SELECT
                CAST(INDEX_NAME AS CHAR) AS index_name,
                CAST(COLUMN_NAME AS CHAR) AS column_name,
                CAST(NON_UNIQUE AS SIGNED) AS non_unique
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
            ORDER BY INDEX_NAME, SEQ_IN_INDEX
        "#;

        let index_rows = sqlx::query_as::<_, MySqlIndexRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        let mut indexes: Vec<(String, Vec<String>, bool)> = Vec::new();
        for row in index_rows {
            let Some(column) = row.column_name else {
                continue;
            };
            if row.index_name == "PRIMARY" {
                definition.primary_key.push(column);
                continue;
            }
            match indexes.iter_mut().find(|(name, _, _)| *name == row.index_name) {
                Some((_, columns, _)) => columns.push(column),
                None => indexes.push((row.index_name, vec![column], row.non_unique == 0)),
            }
        }
        for (name, columns, unique) in indexes {
            add_index(&mut definition, name, columns, unique);
        }

        Ok(definition)
    }
}

#[derive(FromRow)]
struct SqliteColumnRow {
    name: String,
    declared_type: String,
    not_null: i64,
    default_value: Option<String>,
    pk: i64,
}

#[derive(FromRow)]
struct SqliteIndexRow {
    name: String,
    is_unique: i64,
    origin: String,
}

/// SQLite introspector
struct SqliteIntrospector<'a> {
    pool: &'a SqlitePool,
}

#[async_trait]
impl<'a> Introspector for SqliteIntrospector<'a> {
    async fn table_definition(&self, table: &str) -> Result<TableDefinition> {
        let sql = r#"
            SELECT name, type AS declared_type, "notnull" AS not_null,
                   dflt_value AS default_value, pk
            FROM pragma_table_info(?1)
            ORDER BY cid
        "#;

        let rows = sqlx::query_as::<_, SqliteColumnRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

        if rows.is_empty() {
            return Err(Error::TableNotFound {
                table: table.to_string(),
            });
        }

        let mut keyed: Vec<&SqliteColumnRow> = rows.iter().filter(|r| r.pk > 0).collect();
        keyed.sort_by_key(|r| r.pk);

        // A lone INTEGER primary key aliases the rowid and assigns its own values
        let rowid_alias = match keyed.as_slice() {
            [only] if only.declared_type.eq_ignore_ascii_case("integer") => {
                Some(only.name.clone())
            }
            _ => None,
        };

        let mut definition = TableDefinition::new();
        definition.primary_key = keyed.iter().map(|r| r.name.clone()).collect();
        for row in &rows {
            definition.columns.push(assemble_column(
                &row.name,
                parse_column_type(&row.declared_type),
                row.not_null == 0,
                row.default_value.as_deref(),
                rowid_alias.as_deref() == Some(row.name.as_str()),
            ));
        }

        let sql = r#"SELECT name, "unique" AS is_unique, origin FROM pragma_index_list(?1)"#;
        let mut index_rows = sqlx::query_as::<_, SqliteIndexRow>(sql)
            .bind(table)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;
        index_rows.sort_by(|a, b| a.name.cmp(&b.name));

        for index in index_rows {
            if index.origin == "pk" {
                continue;
            }
            let columns: Vec<Option<String>> = sqlx::query_scalar(
                "SELECT name FROM pragma_index_info(?1) ORDER BY seqno",
            )
            .bind(&index.name)
            .fetch_all(self.pool)
            .await
            .map_err(|e| introspection_error(table, e))?;

            let columns = columns.into_iter().flatten().collect();
            add_index(&mut definition, index.name, columns, index.is_unique != 0);
        }

        Ok(definition)
    }
}
