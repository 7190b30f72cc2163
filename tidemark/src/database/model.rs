//! Persistence model for the migration table
//!
//! All reads and writes of migration state go through [`Model`]. Every
//! operation connects lazily, and the driver creates the table on demand.

use crate::config::MigrationConfig;
use crate::database::driver::{Driver, Row, Statement};
use crate::database::registry::DriverRegistry;
use crate::database::types::{create_type_converter, SqlValue, TypeConverter};
use crate::date::parse_datetime;
use crate::error::{Error, Result};
use crate::migrations::{MigrationUnit, RecordedMigration};
use chrono::{NaiveDateTime, Utc};
use serde_json::Value as JsonValue;

pub struct Model {
    driver: Box<dyn Driver>,
    types: Box<dyn TypeConverter>,
}

impl Model {
    /// Build the model with the driver named by the configuration
    pub fn new(config: &MigrationConfig) -> Result<Self> {
        let driver = DriverRegistry::default().create(config)?;
        Ok(Self::with_driver(driver))
    }

    /// Build the model over an existing driver
    pub fn with_driver(driver: Box<dyn Driver>) -> Self {
        let types = create_type_converter(driver.backend().identifier());
        Self { driver, types }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn driver_mut(&mut self) -> &mut dyn Driver {
        self.driver.as_mut()
    }

    pub fn types(&self) -> &dyn TypeConverter {
        self.types.as_ref()
    }

    fn table(&self) -> &str {
        self.driver.table_name()
    }

    pub async fn connect(&mut self) -> Result<()> {
        if self.driver.is_connected() {
            return Ok(());
        }
        self.driver.connect().await
    }

    /// Disconnect; a no-op when not connected
    pub async fn disconnect(&mut self) -> Result<()> {
        if !self.driver.is_connected() {
            return Ok(());
        }
        self.driver.disconnect().await
    }

    async fn query(&mut self, sql: &str, params: Vec<SqlValue>) -> Result<Vec<Row>> {
        self.connect().await?;
        self.driver.query(sql, params).await
    }

    /// Run labeled statements in one transaction
    pub async fn transaction(&mut self, statements: Vec<Statement>) -> Result<()> {
        self.connect().await?;
        self.driver.transaction(statements).await
    }

    /// Record a freshly applied migration
    pub async fn insert(&mut self, migration: &MigrationUnit) -> Result<()> {
        self.insert_record(&migration.name, true, &now(), &migration.checksum)
            .await
    }

    /// Insert a row with explicit values
    pub async fn insert_record(
        &mut self,
        name: &str,
        applied: bool,
        migration_time: &NaiveDateTime,
        checksum: &str,
    ) -> Result<()> {
        let sql = format!(
            "INSERT INTO {} (name, applied, migration_time, checksum) VALUES (?, ?, ?, ?)",
            self.table()
        );
        let params = vec![
            self.types.string(Some(name)),
            self.types.boolean(applied),
            self.types.date_time(migration_time),
            self.types.string(Some(checksum)),
        ];
        self.query(&sql, params).await?;
        Ok(())
    }

    /// Flip the applied flag of a known migration
    pub async fn update(&mut self, name: &str, applied: bool) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET applied = ?, migration_time = ? WHERE name = ?",
            self.table()
        );
        let params = vec![
            self.types.boolean(applied),
            self.types.date_time(&now()),
            self.types.string(Some(name)),
        ];
        self.query(&sql, params).await?;
        Ok(())
    }

    /// Every row, ordered by name
    pub async fn find_all_by_name(&mut self) -> Result<Vec<RecordedMigration>> {
        let sql = format!("SELECT * FROM {} ORDER BY name", self.table());
        let rows = self.query(&sql, vec![]).await?;
        self.decode_all(&rows)
    }

    /// Applied rows, most recently applied first
    pub async fn find_last_applied(
        &mut self,
        limit_to_most_recent: bool,
    ) -> Result<Vec<RecordedMigration>> {
        let mut sql = format!(
            "SELECT * FROM {} WHERE applied = ? ORDER BY migration_time DESC, id DESC",
            self.table()
        );
        if limit_to_most_recent {
            sql.push_str(" LIMIT 1");
        }
        let params = vec![self.types.boolean(true)];
        let rows = self.query(&sql, params).await?;
        self.decode_all(&rows)
    }

    pub async fn count_all(&mut self) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) AS count FROM {}", self.table());
        let rows = self.query(&sql, vec![]).await?;

        rows.first()
            .and_then(|row| row.get("count"))
            .and_then(json_i64)
            .ok_or_else(|| Error::decode("COUNT(*) returned no count"))
    }

    pub async fn drop_table(&mut self) -> Result<()> {
        let sql = format!("DROP TABLE {}", self.table());
        self.query(&sql, vec![]).await?;
        Ok(())
    }

    fn decode_all(&self, rows: &[Row]) -> Result<Vec<RecordedMigration>> {
        rows.iter().map(|row| self.decode(row)).collect()
    }

    /// Decode one row of the migration table
    pub fn decode(&self, row: &Row) -> Result<RecordedMigration> {
        let field = |name: &str| {
            row.get(name)
                .ok_or_else(|| Error::decode(format!("missing column \"{}\"", name)))
        };
        let string = |name: &str| -> Result<String> {
            field(name)?
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| Error::decode(format!("column \"{}\" is not a string", name)))
        };

        let id = json_i64(field("id")?)
            .ok_or_else(|| Error::decode("column \"id\" is not an integer"))?;
        let applied = self
            .types
            .read_bool(field("applied")?)
            .ok_or_else(|| Error::decode("column \"applied\" is not a boolean"))?;

        Ok(RecordedMigration {
            id,
            name: string("name")?,
            applied,
            migration_time: parse_datetime(&string("migration_time")?)?,
            checksum: string("checksum")?,
        })
    }
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn json_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.parse().ok(),
        _ => None,
    }
}
