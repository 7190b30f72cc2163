//! Batch selection: which discovered migrations to apply next.
//!
//! Pure functions over discovered and recorded state. Recorded rows with no
//! discovered counterpart never match anything.

use crate::migrations::{MigrationUnit, RecordedMigration};

/// The migration the database currently sits at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Current<'a> {
    /// Nothing applied yet
    Initial,
    Migration(&'a MigrationUnit),
}

impl<'a> Current<'a> {
    pub fn name(&self) -> Option<&'a str> {
        match self {
            Current::Initial => None,
            Current::Migration(m) => Some(m.name.as_str()),
        }
    }
}

fn find<'r>(recorded: &'r [RecordedMigration], name: &str) -> Option<&'r RecordedMigration> {
    recorded.iter().find(|rm| rm.name == name)
}

/// Discovered migrations that are unknown or recorded as not applied, oldest first
pub fn update(discovered: &[MigrationUnit], recorded: &[RecordedMigration]) -> Vec<MigrationUnit> {
    discovered
        .iter()
        .filter(|m| find(recorded, &m.name).map_or(true, |rm| !rm.applied))
        .cloned()
        .collect()
}

/// Discovered migrations recorded as applied, newest first
pub fn rollback(
    discovered: &[MigrationUnit],
    recorded: &[RecordedMigration],
) -> Vec<MigrationUnit> {
    discovered
        .iter()
        .rev()
        .filter(|m| find(recorded, &m.name).is_some_and(|rm| rm.applied))
        .cloned()
        .collect()
}

/// The discovered migration matching the last applied record
pub fn current<'a>(
    discovered: &'a [MigrationUnit],
    recorded: &[RecordedMigration],
) -> Current<'a> {
    recorded
        .iter()
        .rev()
        .filter(|rm| rm.applied)
        .find_map(|rm| discovered.iter().find(|m| m.name == rm.name))
        .map_or(Current::Initial, Current::Migration)
}

/// Name reported for the state before any migration
pub const INITIAL_STATE: &str = "initial";

/// One line of the `current` listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationState {
    pub name: String,
    pub current: bool,
    pub initial: bool,
}

/// The initial state followed by every discovered migration, flagging the current one
pub fn state(discovered: &[MigrationUnit], recorded: &[RecordedMigration]) -> Vec<MigrationState> {
    let current = current(discovered, recorded);

    std::iter::once(MigrationState {
        name: INITIAL_STATE.to_string(),
        current: current == Current::Initial,
        initial: true,
    })
    .chain(discovered.iter().map(|m| MigrationState {
        name: m.name.clone(),
        current: current.name() == Some(m.name.as_str()),
        initial: false,
    }))
    .collect()
}
