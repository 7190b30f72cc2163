//! Per-backend encoding of the values stored in the migration table
//!
//! The migration table only ever holds strings, booleans and datetimes, so
//! the normalizer is small: every backend shares a default encoding and a
//! backend only overrides what its client gets wrong. MySQL stores `applied`
//! in a `TINYINT`, so it is the one backend that encodes booleans as 0/1.

use crate::date::format_datetime;
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::fmt;

/// Parameter value handed to a driver for binding
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    /// Datetime already encoded as `YYYY-MM-DD HH:MM:SS.mmm`
    DateTime(String),
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::Int(i) => write!(f, "{}", i),
            SqlValue::Text(s) | SqlValue::DateTime(s) => write!(f, "'{}'", s),
        }
    }
}

/// Supported database backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatabaseBackend {
    Postgres,
    MySql,
    Sqlite,
}

impl DatabaseBackend {
    pub const ALL: [DatabaseBackend; 3] = [
        DatabaseBackend::Postgres,
        DatabaseBackend::MySql,
        DatabaseBackend::Sqlite,
    ];

    /// Resolve a configured driver identifier
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        match identifier.to_lowercase().as_str() {
            "pg" | "postgres" | "postgresql" => Some(DatabaseBackend::Postgres),
            "mysql" | "mariadb" => Some(DatabaseBackend::MySql),
            "sqlite" | "sqlite3" => Some(DatabaseBackend::Sqlite),
            _ => None,
        }
    }

    /// Canonical identifier, as written in the configuration file
    pub fn identifier(&self) -> &'static str {
        match self {
            DatabaseBackend::Postgres => "pg",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite3",
        }
    }

    /// Every identifier accepted for this backend
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            DatabaseBackend::Postgres => &["pg", "postgres", "postgresql"],
            DatabaseBackend::MySql => &["mysql", "mariadb"],
            DatabaseBackend::Sqlite => &["sqlite3", "sqlite"],
        }
    }

    /// Cargo feature that compiles in this backend's client
    pub fn feature(&self) -> &'static str {
        match self {
            DatabaseBackend::Postgres => "postgres",
            DatabaseBackend::MySql => "mysql",
            DatabaseBackend::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for DatabaseBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// Encodes semantic values for one backend.
///
/// Every method has a default; backends override only where they diverge.
pub trait TypeConverter: Send + Sync {
    /// Identifier this converter was created for
    fn identifier(&self) -> &str;

    fn boolean(&self, value: bool) -> SqlValue {
        SqlValue::Bool(value)
    }

    fn date_time(&self, value: &NaiveDateTime) -> SqlValue {
        SqlValue::DateTime(format_datetime(value))
    }

    fn string(&self, value: Option<&str>) -> SqlValue {
        match value {
            Some(s) => SqlValue::Text(s.to_string()),
            None => SqlValue::Null,
        }
    }

    /// Read a boolean column back, whatever shape the client returned it in
    fn read_bool(&self, value: &JsonValue) -> Option<bool> {
        match value {
            JsonValue::Bool(b) => Some(*b),
            JsonValue::Number(n) => n.as_i64().map(|i| i != 0),
            JsonValue::String(s) => parse_bool_string(s),
            _ => None,
        }
    }
}

/// Parse a boolean from various string representations
pub fn parse_bool_string(s: &str) -> Option<bool> {
    match s.to_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// Converter for backends with no overrides
#[derive(Debug, Clone)]
pub struct DefaultTypeConverter {
    identifier: String,
}

impl DefaultTypeConverter {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }
}

impl TypeConverter for DefaultTypeConverter {
    fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// MySQL stores booleans as `TINYINT`
#[derive(Debug, Clone, Default)]
pub struct MySqlTypeConverter;

impl TypeConverter for MySqlTypeConverter {
    fn identifier(&self) -> &str {
        DatabaseBackend::MySql.identifier()
    }

    fn boolean(&self, value: bool) -> SqlValue {
        SqlValue::Int(i64::from(value))
    }
}

/// Create the converter for a driver identifier.
///
/// Never fails: identifiers without an override get the default encoding.
pub fn create_type_converter(identifier: &str) -> Box<dyn TypeConverter> {
    match DatabaseBackend::from_identifier(identifier) {
        Some(DatabaseBackend::MySql) => Box::new(MySqlTypeConverter),
        _ => Box::new(DefaultTypeConverter::new(identifier)),
    }
}
