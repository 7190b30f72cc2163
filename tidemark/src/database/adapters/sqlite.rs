//! SQLite driver implementation

use super::session::Session;
use crate::database::driver::{Driver, Row, Statement};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::query::Query;
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Column, Row as _, Sqlite, SqliteConnection, TypeInfo, ValueRef};

/// SQLite driver over a single connection
pub struct SqliteDriver {
    table_name: String,
    session: Session<SqliteConnection>,
}

impl SqliteDriver {
    pub fn new(url: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_name: format!("\"{}\"", table_name.into()),
            session: Session::new(DatabaseBackend::Sqlite, "SQLite", url.into()),
        }
    }

    fn bind_param<'q>(
        query: Query<'q, Sqlite, SqliteArguments<'q>>,
        value: SqlValue,
    ) -> Query<'q, Sqlite, SqliteArguments<'q>> {
        match value {
            SqlValue::Null => query.bind(None::<i32>),
            SqlValue::Bool(b) => query.bind(i32::from(b)),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Text(s) | SqlValue::DateTime(s) => query.bind(s),
        }
    }

    fn row_to_json(row: &SqliteRow) -> Result<Row> {
        let mut obj = Row::new();

        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i).map_err(|e| Error::decode(e.to_string()))?;
            let value = if raw.is_null() {
                JsonValue::Null
            } else {
                // Storage class of the value, not the declared column type
                let type_name = raw.type_info().name().to_string();
                Self::extract_column_value(row, i, &type_name)?
            };
            obj.insert(column.name().to_string(), value);
        }

        Ok(obj)
    }

    fn extract_column_value(row: &SqliteRow, i: usize, type_name: &str) -> Result<JsonValue> {
        let decode = |e: sqlx::Error| Error::decode(format!("column {}: {}", i, e));

        let value = match type_name {
            "INTEGER" | "BOOLEAN" => JsonValue::from(row.try_get::<i64, _>(i).map_err(decode)?),
            "REAL" => JsonValue::from(row.try_get::<f64, _>(i).map_err(decode)?),
            _ => JsonValue::String(row.try_get_unchecked::<String, _>(i).map_err(decode)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Sqlite
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    fn create_statements(&self) -> Vec<String> {
        vec![format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             \"id\" INTEGER PRIMARY KEY AUTOINCREMENT, \
             \"name\" VARCHAR NOT NULL, \
             \"applied\" BOOLEAN NOT NULL, \
             \"migration_time\" DATETIME NOT NULL, \
             \"checksum\" TEXT NOT NULL)",
            self.table_name
        )]
    }

    async fn connect(&mut self) -> Result<()> {
        self.session.connect().await.map(|_| ())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    async fn query(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let create = self.create_statements();
        let conn = self.session.prepare(&create, &self.table_name).await?;

        log::debug!("SQLite QUERY: {}", sql);
        log::trace!("  Parameters: {:?}", params);

        let mut query = sqlx::query(sql);
        for param in params {
            query = Self::bind_param(query, param);
        }

        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Error::query(sql, &e))?;

        rows.iter().map(Self::row_to_json).collect()
    }

    async fn transaction(&mut self, statements: Vec<Statement>) -> Result<()> {
        let steps = self
            .create_statements()
            .into_iter()
            .map(|sql| Statement::new(self.table_name.as_str(), sql))
            .chain(statements)
            .collect();

        self.session.transaction(steps).await
    }
}
