//! Connection plumbing shared by the sqlx drivers
//!
//! A [`Session`] owns one lazily opened connection. Each adapter keeps only
//! its dialect: table DDL, parameter binding and row decoding.

use crate::database::driver::{not_connected, Statement};
use crate::database::types::DatabaseBackend;
use crate::error::{Error, Result};
use async_trait::async_trait;
use sqlx::Connection;

/// Runs unprepared SQL, possibly holding several statements
#[async_trait]
pub(crate) trait RawExecute: Connection {
    async fn execute_raw(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error>;
}

macro_rules! impl_raw_execute {
    ($connection:ty) => {
        #[async_trait]
        impl RawExecute for $connection {
            async fn execute_raw(&mut self, sql: &str) -> std::result::Result<(), sqlx::Error> {
                sqlx::Executor::execute(&mut *self, sqlx::raw_sql(sql))
                    .await
                    .map(|_| ())
            }
        }
    };
}

#[cfg(feature = "postgres")]
impl_raw_execute!(sqlx::PgConnection);
#[cfg(feature = "mysql")]
impl_raw_execute!(sqlx::MySqlConnection);
#[cfg(feature = "sqlite")]
impl_raw_execute!(sqlx::SqliteConnection);

pub(crate) struct Session<C> {
    backend: DatabaseBackend,
    /// Human readable backend name for messages
    name: &'static str,
    url: String,
    connection: Option<C>,
}

impl<C: RawExecute> Session<C> {
    pub(crate) fn new(backend: DatabaseBackend, name: &'static str, url: String) -> Self {
        Self {
            backend,
            name,
            url,
            connection: None,
        }
    }

    pub(crate) fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the connection unless it is already open
    pub(crate) async fn connect(&mut self) -> Result<&mut C> {
        if self.connection.is_none() {
            let connection = C::connect(&self.url).await.map_err(|e| {
                Error::database_connection(format!("Failed to connect to {}: {}", self.name, e))
            })?;
            log::debug!("Connected to {}", self.name);
            self.connection = Some(connection);
        }

        self.connection
            .as_mut()
            .ok_or_else(|| not_connected(self.backend))
    }

    pub(crate) async fn disconnect(&mut self) -> Result<()> {
        let connection = self
            .connection
            .take()
            .ok_or_else(|| not_connected(self.backend))?;

        connection.close().await.map_err(|e| {
            Error::database_connection(format!("Failed to close {} connection: {}", self.name, e))
        })
    }

    /// Connect, then make sure the migration table exists
    pub(crate) async fn prepare(&mut self, create: &[String], table_name: &str) -> Result<&mut C> {
        let conn = self.connect().await?;
        for statement in create {
            conn.execute_raw(statement)
                .await
                .map_err(|e| Error::query(table_name, &e))?;
        }
        Ok(conn)
    }

    /// Run `steps` in one transaction, rolling back at the first failing step
    pub(crate) async fn transaction(&mut self, steps: Vec<Statement>) -> Result<()> {
        let name = self.name;
        let conn = self.connect().await?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| Error::transaction(format!("Failed to begin transaction: {}", e)))?;

        for step in steps {
            log::debug!("{} EXECUTE: {}", name, step.label);
            if let Err(err) = RawExecute::execute_raw(&mut *tx, step.sql.as_str()).await {
                if let Err(e) = tx.rollback().await {
                    log::warn!("Rollback after \"{}\" failed: {}", step.label, e);
                }
                return Err(Error::query(step.label, &err));
            }
        }

        tx.commit()
            .await
            .map_err(|e| Error::transaction(format!("Failed to commit transaction: {}", e)))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests {
    use super::*;
    use sqlx::SqliteConnection;
    use tempfile::TempDir;

    fn session(temp_dir: &TempDir) -> Session<SqliteConnection> {
        let path = temp_dir.path().join("session.sqlite3");
        Session::new(
            DatabaseBackend::Sqlite,
            "SQLite",
            format!("sqlite://{}?mode=rwc", path.display()),
        )
    }

    #[tokio::test]
    async fn test_prepare_runs_create_statements_once_connected() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);
        assert!(!session.is_connected());

        let create = vec!["CREATE TABLE IF NOT EXISTS t (id INTEGER)".to_string()];
        session.prepare(&create, "t").await.unwrap();
        session.prepare(&create, "t").await.unwrap();
        assert!(session.is_connected());

        session.disconnect().await.unwrap();
        assert!(matches!(
            session.disconnect().await,
            Err(Error::NotConnected(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_create_statement_is_labelled_with_table() {
        let temp_dir = TempDir::new().unwrap();
        let mut session = session(&temp_dir);

        let result = session
            .prepare(&["CREATE TABL broken".to_string()], "history")
            .await;
        match result {
            Err(Error::Query { label, .. }) => assert_eq!(label, "history"),
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("invalid DDL was accepted"),
        }
    }
}
