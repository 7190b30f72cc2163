//! tidemark - versioned SQL migrations
//!
//! Migrations are directories of ordered `up` and `down` SQL files. tidemark
//! discovers them, checksums them, and applies each one in its own
//! transaction, recording the outcome in a migration table:
//!
//! ```text
//! migrations/
//!   20150210_221003_users/
//!     up/01_table.sql
//!     down/01_table.sql
//! ```
//!
//! PostgreSQL, MySQL and SQLite are supported through `sqlx`.

// Enforce error handling best practices
#![cfg_attr(
    not(test),
    warn(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        clippy::unimplemented,
        clippy::todo,
    )
)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used,))]

pub mod actions;
pub mod app;
pub mod checksum;
pub mod compile;
pub mod config;
pub mod database;
pub mod date;
pub mod discovery;
pub mod error;
pub mod events;
pub mod filters;
pub mod migrations;
pub mod testing;

pub use app::Tidemark;
pub use config::{ConnectionConfig, MigrationConfig};
pub use discovery::Finder;
pub use error::{Error, ErrorChain, ErrorContext, Result};
pub use events::{EventEmitter, HandlerId, MigrationEvent};
pub use migrations::{
    Batch, MigrationDirection, MigrationManager, MigrationUnit, RecordedMigration,
};
