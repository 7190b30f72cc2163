//! Test doubles
//!
//! [`RecordingDriver`] implements [`Driver`] without a database. It records
//! every statement it is handed and can be told to fail on a given label,
//! which lets callers assert on what the engine would have executed.

use crate::database::driver::{not_connected, Driver, Row, Statement};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Recorded {
    queries: Vec<String>,
    transactions: Vec<Vec<Statement>>,
    connects: usize,
}

/// Shared view of what a [`RecordingDriver`] was asked to run
#[derive(Debug, Clone, Default)]
pub struct StatementLog {
    inner: Arc<Mutex<Recorded>>,
}

impl StatementLog {
    fn lock(&self) -> MutexGuard<'_, Recorded> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn queries(&self) -> Vec<String> {
        self.lock().queries.clone()
    }

    pub fn transactions(&self) -> Vec<Vec<Statement>> {
        self.lock().transactions.clone()
    }

    pub fn connects(&self) -> usize {
        self.lock().connects
    }

    /// Queries plus transactions issued so far
    pub fn count(&self) -> usize {
        let recorded = self.lock();
        recorded.queries.len() + recorded.transactions.len()
    }
}

/// In-memory [`Driver`] that records instead of executing
#[derive(Debug, Default)]
pub struct RecordingDriver {
    log: StatementLog,
    connected: bool,
    rows: Vec<Row>,
    fail_on: Option<String>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows returned by every query
    pub fn with_rows(mut self, rows: Vec<Row>) -> Self {
        self.rows = rows;
        self
    }

    /// Fail any transaction containing a statement with this label
    pub fn failing_on(mut self, label: impl Into<String>) -> Self {
        self.fail_on = Some(label.into());
        self
    }

    pub fn log(&self) -> StatementLog {
        self.log.clone()
    }
}

#[async_trait]
impl Driver for RecordingDriver {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    fn table_name(&self) -> &str {
        "recorded"
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn create_statements(&self) -> Vec<String> {
        Vec::new()
    }

    async fn connect(&mut self) -> Result<()> {
        if !self.connected {
            self.connected = true;
            self.log.lock().connects += 1;
        }
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        if !self.connected {
            return Err(not_connected(self.backend()));
        }
        self.connected = false;
        Ok(())
    }

    async fn query(&mut self, sql: &str, _params: Vec<SqlValue>) -> Result<Vec<Row>> {
        self.connect().await?;
        self.log.lock().queries.push(sql.to_string());
        Ok(self.rows.clone())
    }

    async fn transaction(&mut self, statements: Vec<Statement>) -> Result<()> {
        self.connect().await?;
        let failing = self
            .fail_on
            .as_ref()
            .and_then(|label| statements.iter().find(|s| &s.label == label))
            .map(|s| s.label.clone());
        self.log.lock().transactions.push(statements);

        match failing {
            Some(label) => Err(Error::Query {
                label,
                code: None,
                message: "statement rejected".to_string(),
            }),
            None => Ok(()),
        }
    }
}
