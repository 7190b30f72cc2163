//! Filesystem discovery of migrations
//!
//! Layout consumed:
//!
//! ```text
//! <root>/<YYYYMMDD>_<HHMMSS>_<suffix>/up/<NN>_<label>.sql
//! <root>/<YYYYMMDD>_<HHMMSS>_<suffix>/down/<NN>_<label>.sql
//! ```
//!
//! Discovery is re-run on every command; nothing is cached between runs.

use crate::checksum::{checksum, file_checksum, rollup};
use crate::error::{Error, ErrorContext, Result};
use crate::migrations::{DirectionSteps, MigrationDirection, MigrationUnit, StepFile};
use std::path::{Path, PathBuf};

/// Reads migration directories under a root
#[derive(Debug, Clone)]
pub struct Finder {
    directory: PathBuf,
}

impl Finder {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Discover every migration under the root, ordered by name.
    ///
    /// A missing root surfaces the filesystem error unchanged.
    pub async fn discover(&self) -> Result<Vec<MigrationUnit>> {
        let mut dirs = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                dirs.push(entry.path());
            } else {
                log::trace!("Skipping non-directory {}", entry.path().display());
            }
        }

        // "Latest migration" is positional, so the order must not depend on the filesystem
        dirs.sort();

        let mut migrations = Vec::with_capacity(dirs.len());
        for dir in dirs {
            migrations.push(self.read(&dir).await?);
        }

        log::debug!(
            "Discovered {} migration(s) in {}",
            migrations.len(),
            self.directory.display()
        );
        Ok(migrations)
    }

    /// Read a single migration directory
    pub async fn read(&self, path: &Path) -> Result<MigrationUnit> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::integrity(format!("Invalid migration directory {}", path.display()))
            })?
            .to_string();

        let up = read_direction(&path.join(MigrationDirection::Up.as_str()))
            .await
            .with_context(|| format!("Cannot read migration {}", name))?;
        let down = read_direction(&path.join(MigrationDirection::Down.as_str()))
            .await
            .with_context(|| format!("Cannot read migration {}", name))?;

        check_integrity(&up, &down, &name)?;

        let up_sum = Self::direction_checksum(&up);
        let down_sum = Self::direction_checksum(&down);
        let combined = checksum(&[&up_sum, &down_sum]);

        Ok(MigrationUnit {
            name,
            steps: up.len(),
            up: DirectionSteps {
                files: up,
                checksum: up_sum,
            },
            down: DirectionSteps {
                files: down,
                checksum: down_sum,
            },
            checksum: combined,
        })
    }

    /// Rollup of per-file checksums; empty string for no files
    pub fn direction_checksum(files: &[StepFile]) -> String {
        rollup(files.iter().map(|f| f.checksum.as_str()))
    }
}

/// Verify that `up` and `down` hold the same step filenames, pairwise
pub fn check_integrity(up: &[StepFile], down: &[StepFile], name: &str) -> Result<()> {
    let len = up.len().max(down.len());

    for i in 0..len {
        match (up.get(i), down.get(i)) {
            (Some(u), Some(d)) if u.filename == d.filename => {}
            (Some(u), Some(d)) => {
                return Err(Error::integrity(format!(
                    "Step \"{}\" of migration \"{}\" has no matching down step (found \"{}\")",
                    u.filename, name, d.filename
                )))
            }
            (Some(u), None) => {
                return Err(Error::integrity(format!(
                    "Missing down step \"{}\" in migration \"{}\"",
                    u.filename, name
                )))
            }
            (None, Some(d)) => {
                return Err(Error::integrity(format!(
                    "Missing up step \"{}\" in migration \"{}\"",
                    d.filename, name
                )))
            }
            (None, None) => {}
        }
    }

    Ok(())
}

/// Read every file below a direction directory, sorted by relative path
async fn read_direction(root: &Path) -> Result<Vec<StepFile>> {
    let mut paths = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
            } else {
                paths.push(path);
            }
        }
    }

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let filename = relative_name(root, &path)?;
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("Cannot read step {}", path.display()))?;
        let checksum = file_checksum(&filename, &bytes);
        let contents = match String::from_utf8(bytes) {
            Ok(contents) => contents,
            Err(err) => {
                log::warn!("Step {} is not valid UTF-8", path.display());
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        };
        files.push(StepFile {
            filename,
            contents,
            checksum,
        });
    }

    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

fn relative_name(root: &Path, path: &Path) -> Result<String> {
    let relative = path.strip_prefix(root).map_err(|_| {
        Error::integrity(format!(
            "{} is outside of {}",
            path.display(),
            root.display()
        ))
    })?;

    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts
        .map(|p| p.join("/"))
        .ok_or_else(|| Error::integrity(format!("Non UTF-8 step filename {}", path.display())))
}
