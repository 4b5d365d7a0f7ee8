//! Type definitions for declared and introspected table shapes

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{Error, Result};

/// Canonical logical column type.
///
/// Dialects map these tags to their own type names; anything not recognised
/// is carried through verbatim as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    SmallInt,
    Integer,
    BigInt,
    /// Auto-generating integer
    Serial,
    Char,
    Varchar,
    Text,
    Numeric,
    Float,
    Double,
    Boolean,
    Date,
    Time,
    Datetime,
    Timestamp,
    Blob,
    Json,
    Custom(String),
}

impl ColumnType {
    /// The canonical tag, as used in definition files and type overrides
    pub fn as_str(&self) -> &str {
        match self {
            ColumnType::SmallInt => "smallint",
            ColumnType::Integer => "integer",
            ColumnType::BigInt => "bigint",
            ColumnType::Serial => "serial",
            ColumnType::Char => "char",
            ColumnType::Varchar => "varchar",
            ColumnType::Text => "text",
            ColumnType::Numeric => "numeric",
            ColumnType::Float => "float",
            ColumnType::Double => "double",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::Time => "time",
            ColumnType::Datetime => "datetime",
            ColumnType::Timestamp => "timestamp",
            ColumnType::Blob => "blob",
            ColumnType::Json => "json",
            ColumnType::Custom(name) => name,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ColumnType::SmallInt | ColumnType::Integer | ColumnType::BigInt | ColumnType::Serial
        )
    }

    /// Types whose default may be the current-timestamp keyword
    pub fn is_datetime(&self) -> bool {
        matches!(self, ColumnType::Datetime | ColumnType::Timestamp)
    }
}

impl From<&str> for ColumnType {
    fn from(tag: &str) -> Self {
        match tag.trim().to_lowercase().as_str() {
            "smallint" => ColumnType::SmallInt,
            "int" | "integer" => ColumnType::Integer,
            "bigint" => ColumnType::BigInt,
            "serial" => ColumnType::Serial,
            "char" => ColumnType::Char,
            "varchar" | "string" => ColumnType::Varchar,
            "text" => ColumnType::Text,
            "numeric" | "decimal" => ColumnType::Numeric,
            "float" | "real" => ColumnType::Float,
            "double" => ColumnType::Double,
            "bool" | "boolean" => ColumnType::Boolean,
            "date" => ColumnType::Date,
            "time" => ColumnType::Time,
            "datetime" => ColumnType::Datetime,
            "timestamp" => ColumnType::Timestamp,
            "blob" => ColumnType::Blob,
            "json" => ColumnType::Json,
            _ => ColumnType::Custom(tag.trim().to_string()),
        }
    }
}

impl From<String> for ColumnType {
    fn from(tag: String) -> Self {
        ColumnType::from(tag.as_str())
    }
}

impl From<ColumnType> for String {
    fn from(column_type: ColumnType) -> Self {
        column_type.as_str().to_string()
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The keyword accepted in definition files for the current-timestamp default
pub const CURRENT_TIMESTAMP: &str = "CURRENT_TIMESTAMP";

/// A column default: either a literal or the current-timestamp sentinel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawDefault", into = "RawDefault")]
pub enum DefaultValue {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    CurrentTimestamp,
}

impl DefaultValue {
    pub fn text(value: impl Into<String>) -> Self {
        DefaultValue::Text(value.into())
    }

    /// Stable textual form used for column comparison
    pub fn canonical(&self) -> String {
        match self {
            DefaultValue::Boolean(b) => b.to_string(),
            DefaultValue::Integer(i) => i.to_string(),
            DefaultValue::Float(f) => f.to_string(),
            DefaultValue::Text(s) => s.clone(),
            DefaultValue::CurrentTimestamp => CURRENT_TIMESTAMP.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDefault {
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<RawDefault> for DefaultValue {
    fn from(raw: RawDefault) -> Self {
        match raw {
            RawDefault::Boolean(b) => DefaultValue::Boolean(b),
            RawDefault::Integer(i) => DefaultValue::Integer(i),
            RawDefault::Float(f) => DefaultValue::Float(f),
            RawDefault::Text(s) if s.eq_ignore_ascii_case(CURRENT_TIMESTAMP) => {
                DefaultValue::CurrentTimestamp
            }
            RawDefault::Text(s) => DefaultValue::Text(s),
        }
    }
}

impl From<DefaultValue> for RawDefault {
    fn from(value: DefaultValue) -> Self {
        match value {
            DefaultValue::Boolean(b) => RawDefault::Boolean(b),
            DefaultValue::Integer(i) => RawDefault::Integer(i),
            DefaultValue::Float(f) => RawDefault::Float(f),
            DefaultValue::Text(s) => RawDefault::Text(s),
            DefaultValue::CurrentTimestamp => RawDefault::Text(CURRENT_TIMESTAMP.to_string()),
        }
    }
}

/// A column's participation in a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyRole {
    #[default]
    None,
    Primary,
    Unique,
    Multi,
}

fn default_nullable() -> bool {
    true
}

/// One column's declared shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<DefaultValue>,
    #[serde(default)]
    pub key_role: KeyRole,
    #[serde(default)]
    pub autoincrement: bool,
    /// Metadata reported by introspection that has no dedicated field.
    /// Compared like any other attribute.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl ColumnDefinition {
    /// Create a nullable column with no default
    pub fn new(name: &str, column_type: impl Into<ColumnType>) -> Self {
        Self {
            name: name.to_string(),
            column_type: column_type.into(),
            length: None,
            precision: None,
            scale: None,
            nullable: true,
            default: None,
            key_role: KeyRole::None,
            autoincrement: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: Option<u32>) -> Self {
        self.precision = Some(precision);
        self.scale = scale;
        self
    }

    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    pub fn default_value(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    pub fn key_role(mut self, role: KeyRole) -> Self {
        self.key_role = role;
        self
    }

    pub fn primary_key(self) -> Self {
        self.key_role(KeyRole::Primary)
    }

    pub fn unique(self) -> Self {
        self.key_role(KeyRole::Unique)
    }

    pub fn indexed(self) -> Self {
        self.key_role(KeyRole::Multi)
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    /// True when the column generates its own values
    pub fn is_auto_generated(&self) -> bool {
        self.autoincrement || self.column_type == ColumnType::Serial
    }

    /// Attribute map compared by [`columns_equal`](crate::schema::diff::columns_equal).
    ///
    /// `serial` is folded into `integer` + `autoincrement` so both spellings
    /// compare equal. Key roles are not attributes: indexes belong to the
    /// table.
    pub fn attributes(&self) -> BTreeMap<String, String> {
        let mut attrs = BTreeMap::new();
        let column_type = if self.column_type == ColumnType::Serial {
            ColumnType::Integer
        } else {
            self.column_type.clone()
        };
        attrs.insert("type".to_string(), column_type.as_str().to_lowercase());
        if let Some(length) = self.length {
            attrs.insert("length".to_string(), length.to_string());
        }
        if let Some(precision) = self.precision {
            attrs.insert("precision".to_string(), precision.to_string());
        }
        // NUMERIC(10) and NUMERIC(10,0) are the same type
        if let Some(scale) = self.scale.filter(|s| *s > 0) {
            attrs.insert("scale".to_string(), scale.to_string());
        }
        attrs.insert("nullable".to_string(), self.nullable.to_string());
        if let Some(default) = &self.default {
            attrs.insert("default".to_string(), default.canonical());
        }
        if self.is_auto_generated() {
            attrs.insert("autoincrement".to_string(), "true".to_string());
        }
        for (key, value) in &self.extra {
            attrs.insert(key.clone(), value.clone());
        }
        attrs
    }

    /// Check the single-column invariants
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::DefinitionInvariant(
                "column name must not be empty".to_string(),
            ));
        }
        if self.default.is_some() && !self.nullable {
            return Err(Error::DefinitionInvariant(format!(
                "column '{}' declares both a default and NOT NULL",
                self.name
            )));
        }
        if self.autoincrement && !self.column_type.is_integer() {
            return Err(Error::DefinitionInvariant(format!(
                "column '{}' is autoincrement but has type {}",
                self.name, self.column_type
            )));
        }
        Ok(())
    }
}

/// A named index over ordered columns
pub type IndexColumns = IndexMap<String, Vec<String>>;

/// An ordered collection of columns plus keys and indexes
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableDefinition {
    pub columns: Vec<ColumnDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub primary_key: Vec<String>,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub unique_indexes: IndexColumns,
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub multi_indexes: IndexColumns,
}

impl TableDefinition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_primary_key(mut self, columns: &[&str]) -> Self {
        self.primary_key = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_unique_index(mut self, name: &str, columns: &[&str]) -> Self {
        self.unique_indexes
            .insert(name.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn with_index(mut self, name: &str, columns: &[&str]) -> Self {
        self.multi_indexes
            .insert(name.to_string(), columns.iter().map(|c| c.to_string()).collect());
        self
    }

    /// Look up a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Primary key tuple: the explicit list, followed by any column carrying
    /// the primary role that it does not already name, in declaration order.
    pub fn primary_key_columns(&self) -> Vec<String> {
        let mut key = self.primary_key.clone();
        for column in self.columns.iter().filter(|c| c.key_role == KeyRole::Primary) {
            if !key.contains(&column.name) {
                key.push(column.name.clone());
            }
        }
        key
    }

    /// True when `column` alone makes up the primary key
    pub fn is_sole_primary_key(&self, column: &str) -> bool {
        matches!(self.primary_key_columns().as_slice(), [only] if only == column)
    }

    /// Columns carrying the given single-column key role
    pub fn columns_with_role(&self, role: KeyRole) -> impl Iterator<Item = &ColumnDefinition> {
        self.columns.iter().filter(move |c| c.key_role == role)
    }

    /// Copy in the shape engines report: primary key columns without a
    /// default are NOT NULL.
    pub fn normalized(&self) -> TableDefinition {
        let key = self.primary_key_columns();
        let mut table = self.clone();
        for column in table.columns.iter_mut() {
            if column.default.is_none() && key.contains(&column.name) {
                column.nullable = false;
            }
        }
        table
    }

    /// Check every table-level invariant, then every column's own
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(Error::DefinitionInvariant(
                "table definition has no columns".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for column in &self.columns {
            column.validate()?;
            if !names.insert(column.name.as_str()) {
                return Err(Error::DefinitionInvariant(format!(
                    "duplicate column '{}'",
                    column.name
                )));
            }
        }

        let check_refs = |what: &str, columns: &[String]| -> Result<()> {
            if columns.is_empty() {
                return Err(Error::DefinitionInvariant(format!("{} has no columns", what)));
            }
            match columns.iter().find(|c| !names.contains(c.as_str())) {
                Some(missing) => Err(Error::DefinitionInvariant(format!(
                    "{} references unknown column '{}'",
                    what, missing
                ))),
                None => Ok(()),
            }
        };

        if !self.primary_key.is_empty() {
            check_refs("primary key", self.primary_key.as_slice())?;
        }

        let mut index_names = HashSet::new();
        for (name, columns) in self.unique_indexes.iter().chain(self.multi_indexes.iter()) {
            if !index_names.insert(name.as_str()) {
                return Err(Error::DefinitionInvariant(format!(
                    "duplicate index name '{}'",
                    name
                )));
            }
            check_refs(&format!("index '{}'", name), columns.as_slice())?;
        }

        Ok(())
    }
}
