//! Driver registry
//!
//! Maps configured driver identifiers to factories. The builtin backends are
//! registered under every alias; other backends can be plugged in with
//! [`DriverRegistry::register`].

use crate::config::MigrationConfig;
use crate::database::driver::{resolve_client_library, Driver};
use crate::database::types::DatabaseBackend;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Builds a driver from the configuration
pub type DriverFactory = Arc<dyn Fn(&MigrationConfig) -> Result<Box<dyn Driver>> + Send + Sync>;

/// Registry of driver factories keyed by identifier
#[derive(Clone)]
pub struct DriverRegistry {
    factories: BTreeMap<String, DriverFactory>,
}

impl DriverRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a factory under an identifier, replacing any previous one
    pub fn register<F>(&mut self, identifier: impl Into<String>, factory: F)
    where
        F: Fn(&MigrationConfig) -> Result<Box<dyn Driver>> + Send + Sync + 'static,
    {
        self.factories
            .insert(identifier.into().to_lowercase(), Arc::new(factory));
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.factories.contains_key(&identifier.to_lowercase())
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Build the driver named by the configuration
    pub fn create(&self, config: &MigrationConfig) -> Result<Box<dyn Driver>> {
        let identifier = config.driver_identifier()?;
        let factory = self
            .factories
            .get(&identifier.to_lowercase())
            .ok_or_else(|| Error::UnknownBackend {
                identifier: identifier.to_string(),
                known: self.identifiers().join(", "),
            })?;

        log::debug!("Creating \"{}\" driver", identifier);
        factory(config)
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        for backend in DatabaseBackend::ALL {
            for alias in backend.aliases() {
                registry.register(*alias, move |config| builtin_driver(backend, config));
            }
        }
        registry
    }
}

fn builtin_driver(backend: DatabaseBackend, config: &MigrationConfig) -> Result<Box<dyn Driver>> {
    resolve_client_library(backend)?;
    let url = config.connection_url(backend)?;
    let table_name = config.table_name.clone();

    match backend {
        #[cfg(feature = "postgres")]
        DatabaseBackend::Postgres => Ok(Box::new(
            crate::database::adapters::PostgresDriver::new(url, table_name),
        )),
        #[cfg(feature = "mysql")]
        DatabaseBackend::MySql => Ok(Box::new(crate::database::adapters::MySqlDriver::new(
            url, table_name,
        ))),
        #[cfg(feature = "sqlite")]
        DatabaseBackend::Sqlite => Ok(Box::new(crate::database::adapters::SqliteDriver::new(
            url, table_name,
        ))),
        #[allow(unreachable_patterns)]
        _ => Err(Error::MissingDependency(backend.feature().to_string())),
    }
}
