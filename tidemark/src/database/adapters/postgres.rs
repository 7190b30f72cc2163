//! PostgreSQL driver implementation

use super::session::Session;
use crate::database::driver::{numbered_placeholders, Driver, Row, Statement};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::date::{format_datetime, parse_datetime};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, Postgres, Row as _, TypeInfo, ValueRef};

/// PostgreSQL driver over a single connection
pub struct PostgresDriver {
    table_name: String,
    session: Session<PgConnection>,
}

impl PostgresDriver {
    pub fn new(url: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            session: Session::new(DatabaseBackend::Postgres, "PostgreSQL", url.into()),
        }
    }

    /// Schema part of a `schema.table` name
    fn schema(&self) -> Option<&str> {
        self.table_name.split_once('.').map(|(schema, _)| schema)
    }

    fn bind_param<'q>(
        query: Query<'q, Postgres, PgArguments>,
        value: SqlValue,
    ) -> Result<Query<'q, Postgres, PgArguments>> {
        Ok(match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Text(s) => query.bind(s),
            // Postgres refuses text for a timestamp parameter
            SqlValue::DateTime(s) => query.bind(parse_datetime(&s)?),
        })
    }

    fn row_to_json(row: &PgRow) -> Result<Row> {
        let mut obj = Row::new();

        for (i, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(i).map_err(|e| Error::decode(e.to_string()))?;
            let value = if raw.is_null() {
                JsonValue::Null
            } else {
                let type_name = raw.type_info().name().to_string();
                Self::extract_column_value(row, i, &type_name)?
            };
            obj.insert(column.name().to_string(), value);
        }

        Ok(obj)
    }

    fn extract_column_value(row: &PgRow, i: usize, type_name: &str) -> Result<JsonValue> {
        let decode = |e: sqlx::Error| Error::decode(format!("column {}: {}", i, e));

        let value = match type_name {
            "BOOL" => JsonValue::Bool(row.try_get::<bool, _>(i).map_err(decode)?),
            "INT2" => JsonValue::from(row.try_get::<i16, _>(i).map_err(decode)?),
            "INT4" => JsonValue::from(row.try_get::<i32, _>(i).map_err(decode)?),
            "INT8" => JsonValue::from(row.try_get::<i64, _>(i).map_err(decode)?),
            "FLOAT4" => JsonValue::from(row.try_get::<f32, _>(i).map_err(decode)?),
            "FLOAT8" => JsonValue::from(row.try_get::<f64, _>(i).map_err(decode)?),
            "TIMESTAMP" => JsonValue::String(format_datetime(
                &row.try_get::<chrono::NaiveDateTime, _>(i).map_err(decode)?,
            )),
            "TIMESTAMPTZ" => JsonValue::String(format_datetime(
                &row.try_get::<chrono::DateTime<chrono::Utc>, _>(i)
                    .map_err(decode)?
                    .naive_utc(),
            )),
            _ => JsonValue::String(row.try_get::<String, _>(i).map_err(decode)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::Postgres
    }

    fn table_name(&self) -> &str {
        &self.table_name
    }

    fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    fn create_statements(&self) -> Vec<String> {
        let mut statements = Vec::with_capacity(2);
        if let Some(schema) = self.schema() {
            statements.push(format!("CREATE SCHEMA IF NOT EXISTS {}", schema));
        }
        statements.push(format!(
            "CREATE TABLE IF NOT EXISTS {} (\
             id serial PRIMARY KEY, \
             name character varying(255) NOT NULL, \
             applied boolean NOT NULL, \
             migration_time timestamp without time zone NOT NULL, \
             checksum text NOT NULL)",
            self.table_name
        ));
        statements
    }

    fn sql(&self, sql: &str) -> String {
        numbered_placeholders(sql)
    }

    async fn connect(&mut self) -> Result<()> {
        self.session.connect().await.map(|_| ())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.session.disconnect().await
    }

    async fn query(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        let create = self.create_statements();
        let sql = self.sql(sql);
        let conn = self.session.prepare(&create, &self.table_name).await?;

        log::debug!("PostgreSQL QUERY: {}", sql);
        log::trace!("  Parameters: {:?}", params);

        let mut query = sqlx::query(&sql);
        for param in params {
            query = Self::bind_param(query, param)?;
        }

        let rows = query
            .fetch_all(&mut *conn)
            .await
            .map_err(|e| Error::query(sql.as_str(), &e))?;

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
