//! Authoring helpers: where new migrations and steps go on disk
//!
//! These only compute paths; the app creates the directories and files.

use crate::date::{snake, two_digits};
use crate::error::{Error, Result};
use crate::migrations::{MigrationDirection, MigrationUnit};
use chrono::NaiveDateTime;
use std::path::PathBuf;

/// Paths of a new migration, relative to the migration directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationPaths {
    pub root_dir: PathBuf,
    pub up: PathBuf,
    pub down: PathBuf,
}

/// Paths for a migration named `<YYYYMMDD_HHMMSS>_<suffix>`
pub fn create_paths(date: &NaiveDateTime, suffix: &str) -> MigrationPaths {
    let root_dir = PathBuf::from(format!("{}_{}", snake(date), suffix));

    MigrationPaths {
        up: root_dir.join(MigrationDirection::Up.as_str()),
        down: root_dir.join(MigrationDirection::Down.as_str()),
        root_dir,
    }
}

/// Resolve a migration from a partial name.
///
/// Matching is a case-insensitive substring search. An exact name, or a
/// name ending in `_<query>`, wins over other matches; otherwise the most
/// recent match is returned.
pub fn find_migration<'a>(discovered: &'a [MigrationUnit], query: &str) -> Result<&'a MigrationUnit> {
    let needle = query.to_lowercase();
    let suffix = format!("_{}", needle);

    let matches: Vec<&MigrationUnit> = discovered
        .iter()
        .filter(|m| m.name.to_lowercase().contains(&needle))
        .collect();

    matches
        .iter()
        .rev()
        .find(|m| {
            let name = m.name.to_lowercase();
            name == needle || name.ends_with(&suffix)
        })
        .or_else(|| matches.last())
        .copied()
        .ok_or_else(|| {
            Error::MigrationNotFound(format!("No migration matches \"{}\"", query))
        })
}

/// Paths of new step files appended to a migration, up steps first.
///
/// Numbering continues after the migration's existing steps.
pub fn step_paths(
    discovered: &[MigrationUnit],
    query: &str,
    suffixes: &[String],
) -> Result<Vec<PathBuf>> {
    let target = find_migration(discovered, query)?;
    let mut paths = Vec::with_capacity(suffixes.len() * 2);

    for direction in [MigrationDirection::Up, MigrationDirection::Down] {
        for (index, suffix) in suffixes.iter().enumerate() {
            let filename = format!("{}_{}.sql", two_digits(target.steps + index + 1), suffix);
            paths.push(
                PathBuf::from(&target.name)
                    .join(direction.as_str())
                    .join(filename),
            );
        }
    }

    Ok(paths)
}
