//! Bundle a migration's steps into one SQL script per direction

use crate::actions::find_migration;
use crate::error::Result;
use crate::migrations::{MigrationDirection, MigrationUnit};

/// Transforms a step's SQL before it is bundled, given `(sql, filename)`
pub type Preprocessor<'a> = &'a dyn Fn(&str, &str) -> String;

/// A migration's steps, concatenated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledMigration {
    pub name: String,
    /// Up steps in application order
    pub up: String,
    /// Down steps in application order, i.e. reversed
    pub down: String,
}

/// Compile the migration matching `query`
pub fn compile(
    discovered: &[MigrationUnit],
    query: &str,
    preprocessor: Option<Preprocessor<'_>>,
) -> Result<CompiledMigration> {
    let migration = find_migration(discovered, query)?;
    let identity = |sql: &str, _: &str| sql.to_string();
    let preprocess: Preprocessor<'_> = match preprocessor {
        Some(preprocess) => preprocess,
        None => &identity,
    };

    Ok(CompiledMigration {
        name: migration.name.clone(),
        up: bundle(migration, MigrationDirection::Up, preprocess),
        down: bundle(migration, MigrationDirection::Down, preprocess),
    })
}

fn bundle(
    migration: &MigrationUnit,
    direction: MigrationDirection,
    preprocess: Preprocessor<'_>,
) -> String {
    let files = &migration.direction(direction).files;
    let ordered: Box<dyn Iterator<Item = _>> = match direction {
        MigrationDirection::Up => Box::new(files.iter()),
        MigrationDirection::Down => Box::new(files.iter().rev()),
    };

    ordered
        .map(|file| {
            let sql = preprocess(&file.contents, &file.filename);
            format!(
                "-- {}\n{}\n",
                migration.step_path(direction, file),
                sql.trim_end()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
