//! MySQL driver implementation
//!
//! MySQL commits DDL implicitly, so a step that creates or alters tables is
//! only partially rolled back when a later statement of the same migration fails.

use super::session::Session;
use crate::database::driver::{Driver, Row, Statement};
use crate::database::types::{DatabaseBackend, SqlValue};
use crate::date::{format_datetime, parse_datetime};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use sqlx::mysql::{MySqlArguments, MySqlRow};
use sqlx::query::Query;
use sqlx::{Column, MySql, MySqlConnection, Row as _, TypeInfo, ValueRef};

/// MySQL driver over a single connection
pub struct MySqlDriver {
    table_name: String,
    session: Session<MySqlConnection>,
}

impl MySqlDriver {
    pub fn new(url: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            table_name: format!("`{}`", table_name.into()),
            session: Session::new(DatabaseBackend::MySql, "MySQL", url.into()),
        }
    }

    fn bind_param<'q>(
        query: Query<'q, MySql, MySqlArguments>,
        value: SqlValue,
    ) -> Result<Query<'q, MySql, MySqlArguments>> {
        Ok(match value {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Bool(b) => query.bind(b),
            SqlValue::Int(i) => query.bind(i),
            SqlValue::Text(s) => query.bind(s),
            SqlValue::DateTime(s) => query.bind(parse_datetime(&s)?),
        })
    }

    fn row_to_json(row: &MySqlRow) -> Result<Row> {
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

    fn extract_column_value(row: &MySqlRow, i: usize, type_name: &str) -> Result<JsonValue> {
        let decode = |e: sqlx::Error| Error::decode(format!("column {}: {}", i, e));

        let value = match type_name {
            "BOOLEAN" => JsonValue::Bool(row.try_get::<bool, _>(i).map_err(decode)?),
            "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" => {
                JsonValue::from(row.try_get::<i64, _>(i).map_err(decode)?)
            }
            name if name.ends_with("UNSIGNED") => {
                JsonValue::from(row.try_get::<u64, _>(i).map_err(decode)?)
            }
            "FLOAT" => JsonValue::from(row.try_get::<f32, _>(i).map_err(decode)?),
            "DOUBLE" => JsonValue::from(row.try_get::<f64, _>(i).map_err(decode)?),
            "DATETIME" | "TIMESTAMP" => JsonValue::String(format_datetime(
                &row.try_get::<chrono::NaiveDateTime, _>(i).map_err(decode)?,
            )),
            _ => JsonValue::String(row.try_get_unchecked::<String, _>(i).map_err(decode)?),
        };

        Ok(value)
    }
}

#[async_trait]
impl Driver for MySqlDriver {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::MySql
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
             `id` INT NOT NULL AUTO_INCREMENT, \
             `name` VARCHAR(255) NOT NULL, \
             `applied` TINYINT NOT NULL, \
             `migration_time` DATETIME(3) NOT NULL, \
             `checksum` VARCHAR(255) NOT NULL, \
             PRIMARY KEY (`id`))",
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
        let sql = self.sql(sql);
        let conn = self.session.prepare(&create, &self.table_name).await?;

        log::debug!("MySQL QUERY: {}", sql);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_backtick_quoted() {
        let driver = MySqlDriver::new("mysql://localhost/db", "tidemark_migrations");
        assert_eq!(driver.table_name(), "`tidemark_migrations`");

        let statements = driver.create_statements();
        assert!(statements[0].contains("`applied` TINYINT NOT NULL"));
        assert!(statements[0].contains("DATETIME(3)"));
    }

    #[test]
    fn test_native_placeholders() {
        let driver = MySqlDriver::new("mysql://localhost/db", "t");
        assert_eq!(driver.sql("SELECT ?"), "SELECT ?");
    }
}
