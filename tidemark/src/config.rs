//! Configuration for a migration project
//!
//! Loaded from a `tidemark.toml` file, then overridden from the environment.
//!
//! ```toml
//! directory = "migrations"
//! table_name = "tidemark_migrations"
//! driver = "pg"
//!
//! [connection]
//! url = "postgres://localhost/app"
//! ```

use crate::database::types::DatabaseBackend;
use crate::error::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the configuration file looked up in the working directory
pub const CONFIG_FILE: &str = "tidemark.toml";

/// Template written by `init`
pub const CONFIG_TEMPLATE: &str = r#"# tidemark configuration

# Directory holding one sub-directory per migration
directory = "migrations"

# Table recording which migrations have been applied
table_name = "tidemark_migrations"

# One of: pg, mysql, sqlite3
driver = "pg"

[connection]
# Connection URL for the driver (DATABASE_URL is used when absent)
url = "postgres://localhost/my_database"

# SQLite only: path to the database file, used when no url is given
# path = "db.sqlite3"
"#;

/// Connection parameters handed to the driver
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ConnectionConfig {
    #[serde(default)]
    pub url: Option<String>,

    /// SQLite database file, used when `url` is not set
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MigrationConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,

    #[serde(default = "default_table_name")]
    pub table_name: String,

    #[serde(default)]
    pub driver: Option<String>,

    #[serde(default)]
    pub connection: ConnectionConfig,
}

fn default_directory() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_table_name() -> String {
    "tidemark_migrations".to_string()
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            table_name: default_table_name(),
            driver: None,
            connection: ConnectionConfig::default(),
        }
    }
}

impl MigrationConfig {
    /// Build a configuration in code
    pub fn new(
        directory: impl Into<PathBuf>,
        driver: impl Into<String>,
        connection: ConnectionConfig,
    ) -> Self {
        Self {
            directory: directory.into(),
            driver: Some(driver.into()),
            connection,
            ..Default::default()
        }
    }

    /// Set the migration table name
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Load `tidemark.toml` from the given directory
    pub fn load(cwd: impl AsRef<Path>) -> Result<Self> {
        Self::from_file(cwd.as_ref().join(CONFIG_FILE))
    }

    /// Load configuration from a TOML file, then apply environment overrides
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        if !path_ref.is_file() {
            return Err(Error::missing_configuration(format!(
                "{} not found",
                path_ref.display()
            )));
        }

        let mut config = std::fs::read_to_string(path_ref)
            .map_err(Error::from)
            .and_then(|content| Self::from_toml(&content))
            .with_context(|| format!("Cannot load configuration {}", path_ref.display()))?;

        // Resolve the migration directory relative to the config file
        if config.directory.is_relative() {
            if let Some(parent) = path_ref.parent() {
                config.directory = parent.join(&config.directory);
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        log::debug!("Loaded configuration from: {}", path_ref.display());
        Ok(config)
    }

    /// Parse configuration from TOML text, without environment overrides
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::InvalidConfiguration(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(directory) = env::var("TIDEMARK_DIRECTORY") {
            self.directory = PathBuf::from(directory);
        }
        if let Ok(table_name) = env::var("TIDEMARK_TABLE_NAME") {
            self.table_name = table_name;
        }
        if let Ok(driver) = env::var("TIDEMARK_DRIVER") {
            self.driver = Some(driver);
        }
        if let Ok(url) = env::var("TIDEMARK_DATABASE_URL") {
            self.connection.url = Some(url);
        } else if self.connection.url.is_none() && self.connection.path.is_none() {
            if let Ok(url) = env::var("DATABASE_URL") {
                self.connection.url = Some(url);
            }
        }
    }

    /// Check that every entry the engine needs is defined
    pub fn validate(&self) -> Result<()> {
        if self.table_name.trim().is_empty() {
            return Err(Error::undefined_configuration("table_name"));
        }
        self.driver_identifier()?;
        Ok(())
    }

    /// Configured driver identifier
    pub fn driver_identifier(&self) -> Result<&str> {
        self.driver
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| Error::undefined_configuration("driver"))
    }

    /// Connection URL for the configured backend
    pub fn connection_url(&self, backend: DatabaseBackend) -> Result<String> {
        if let Some(url) = &self.connection.url {
            return Ok(url.clone());
        }

        match (backend, &self.connection.path) {
            (DatabaseBackend::Sqlite, Some(path)) => {
                Ok(format!("sqlite://{}?mode=rwc", path.display()))
            }
            _ => Err(Error::undefined_configuration("connection.url")),
        }
    }
}

/// Write the configuration template into `cwd` unless a config already exists.
///
/// Returns `true` when the file was created.
pub async fn init(cwd: impl AsRef<Path>) -> Result<bool> {
    let path = cwd.as_ref().join(CONFIG_FILE);
    if tokio::fs::try_exists(&path).await? {
        return Ok(false);
    }

    tokio::fs::write(&path, CONFIG_TEMPLATE).await?;
    Ok(true)
}
