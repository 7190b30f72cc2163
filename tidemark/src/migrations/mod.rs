//! Migration data model and the orchestrator that applies it
//!
//! A migration is a directory holding ordered `up` and `down` step files.
//! The database records, per migration name, whether it is applied and the
//! checksum it had when it was first applied.

pub mod manager;

pub use manager::MigrationManager;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Migration direction (up or down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MigrationDirection {
    Up,
    Down,
}

impl MigrationDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationDirection::Up => "up",
            MigrationDirection::Down => "down",
        }
    }
}

impl fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One SQL file of a migration direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFile {
    /// Path relative to the direction directory, `/`-separated
    pub filename: String,
    pub contents: String,
    pub checksum: String,
}

/// The ordered steps of one direction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DirectionSteps {
    pub files: Vec<StepFile>,
    pub checksum: String,
}

/// A migration as found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// `YYYYMMDD_HHMMSS_suffix`; string order is application order
    pub name: String,
    /// Number of up step files
    pub steps: usize,
    pub up: DirectionSteps,
    pub down: DirectionSteps,
    /// Rollup of the up and down checksums
    pub checksum: String,
}

impl MigrationUnit {
    pub fn direction(&self, direction: MigrationDirection) -> &DirectionSteps {
        match direction {
            MigrationDirection::Up => &self.up,
            MigrationDirection::Down => &self.down,
        }
    }

    /// Label of a step, as used in events and query errors
    pub fn step_path(&self, direction: MigrationDirection, file: &StepFile) -> String {
        format!("{}/{}/{}", self.name, direction, file.filename)
    }
}

/// A row of the migration table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedMigration {
    pub id: i64,
    pub name: String,
    pub applied: bool,
    pub migration_time: NaiveDateTime,
    pub checksum: String,
}

/// Migrations selected for one up or down invocation
#[derive(Debug, Clone, Default)]
pub struct Batch {
    /// Rows read while computing the batch
    pub recorded: Vec<RecordedMigration>,
    /// Migrations to apply, in application order
    pub migrations: Vec<MigrationUnit>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn names(&self) -> Vec<String> {
        self.migrations.iter().map(|m| m.name.clone()).collect()
    }
}
