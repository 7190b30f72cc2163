//! Backend driver trait
//!
//! A driver owns one connection to one backend and knows that backend's
//! dialect: placeholder syntax, how to create the migration table, and how
//! to turn native rows into [`Row`]s. Nothing above this layer depends on
//! backend-specific behavior.

use super::types::{DatabaseBackend, SqlValue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;

/// A result row, normalized across backends
pub type Row = serde_json::Map<String, JsonValue>;

/// One labeled statement of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Identifies the statement in errors, e.g. `<migration>/up/01_table.sql`
    pub label: String,
    pub sql: String,
}

impl Statement {
    pub fn new(label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            sql: sql.into(),
        }
    }
}

/// Unified driver trait, implemented once per backend
#[async_trait]
pub trait Driver: Send {
    fn backend(&self) -> DatabaseBackend;

    /// Migration table, as it must appear in SQL
    fn table_name(&self) -> &str;

    fn is_connected(&self) -> bool;

    /// Idempotent statements creating the migration table
    fn create_statements(&self) -> Vec<String>;

    /// Translate portable `?` placeholders into native syntax
    fn sql(&self, sql: &str) -> String {
        sql.to_string()
    }

    /// Connect; a no-op when already connected
    async fn connect(&mut self) -> Result<()>;

    /// Close the connection; fails when not connected
    async fn disconnect(&mut self) -> Result<()>;

    /// Run one statement after making sure the migration table exists
    async fn query(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>>;

    /// Run all statements atomically.
    ///
    /// Issues BEGIN, the create statements, then every statement in order.
    /// The first failure rolls back and returns [`Error::Query`] carrying the
    /// failing statement's label.
    async fn transaction(&mut self, statements: Vec<Statement>) -> Result<()>;
}

/// Check that the client for `backend` was compiled in
pub fn resolve_client_library(backend: DatabaseBackend) -> Result<()> {
    let available = match backend {
        DatabaseBackend::Postgres => cfg!(feature = "postgres"),
        DatabaseBackend::MySql => cfg!(feature = "mysql"),
        DatabaseBackend::Sqlite => cfg!(feature = "sqlite"),
    };

    if available {
        Ok(())
    } else {
        Err(Error::MissingDependency(format!(
            "Cannot find the \"{}\" client. You need to rebuild with `--features {}` to install it.",
            backend,
            backend.feature()
        )))
    }
}

/// Rewrite `?` placeholders as `$1, $2, ...`, leaving quoted text untouched
pub fn numbered_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut index = 0;
    let mut quote: Option<char> = None;

    for c in sql.chars() {
        match (quote, c) {
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (Some(q), _) if c == q => {
                quote = None;
                out.push(c);
            }
            (None, '?') => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }

    out
}

/// Error for operations that need an open connection
pub(crate) fn not_connected(backend: DatabaseBackend) -> Error {
    Error::NotConnected(format!("{} driver is not connected", backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbered_placeholders() {
        assert_eq!(
            numbered_placeholders("UPDATE t SET applied = ? WHERE name = ?"),
            "UPDATE t SET applied = $1 WHERE name = $2"
        );
    }

    #[test]
    fn test_numbered_placeholders_skip_literals() {
        assert_eq!(
            numbered_placeholders("SELECT '?' AS q, \"a?\" FROM t WHERE x = ?"),
            "SELECT '?' AS q, \"a?\" FROM t WHERE x = $1"
        );
        assert_eq!(numbered_placeholders("SELECT 1"), "SELECT 1");
    }

    #[test]
    fn test_resolve_builtin_clients() {
        #[cfg(feature = "sqlite")]
        assert!(resolve_client_library(DatabaseBackend::Sqlite).is_ok());
        #[cfg(not(feature = "mysql"))]
        assert!(matches!(
            resolve_client_library(DatabaseBackend::MySql),
            Err(Error::MissingDependency(_))
        ));
    }
}
