//! Database layer
//!
//! A [`Driver`] per backend, a registry selecting one by identifier, the
//! per-backend value encoding, and the [`Model`] over the migration table.

pub mod adapters;
pub mod driver;
pub mod model;
pub mod registry;
pub mod types;

pub use driver::{resolve_client_library, Driver, Row, Statement};
pub use model::Model;
pub use registry::{DriverFactory, DriverRegistry};
pub use types::{create_type_converter, DatabaseBackend, SqlValue, TypeConverter};
