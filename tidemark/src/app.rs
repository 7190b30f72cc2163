//! Application facade
//!
//! [`Tidemark`] ties the configuration, the orchestrator and discovery
//! together behind the operations a front end exposes.

use crate::actions::{create_paths, step_paths, MigrationPaths};
use crate::compile::{compile, CompiledMigration, Preprocessor};
use crate::config::{self, MigrationConfig};
use crate::database::driver::Driver;
use crate::error::{Error, Result};
use crate::events::{EventEmitter, HandlerId, MigrationEvent};
use crate::filters::{state, MigrationState};
use crate::migrations::{Batch, MigrationManager};
use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Write the configuration template into `cwd` if none exists, reporting the outcome
pub async fn init(cwd: impl AsRef<Path>, events: &EventEmitter) -> Result<bool> {
    let created = config::init(cwd).await?;
    events.emit(if created {
        MigrationEvent::InitSuccess
    } else {
        MigrationEvent::InitNoop
    });
    Ok(created)
}

pub struct Tidemark {
    manager: MigrationManager,
}

impl Tidemark {
    /// Build the engine from a configuration; the driver is resolved eagerly
    pub fn new(config: MigrationConfig) -> Result<Self> {
        Ok(Self {
            manager: MigrationManager::new(config)?,
        })
    }

    pub fn with_driver(config: MigrationConfig, driver: Box<dyn Driver>) -> Self {
        Self {
            manager: MigrationManager::with_driver(config, driver),
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        self.manager.config()
    }

    pub fn manager_mut(&mut self) -> &mut MigrationManager {
        &mut self.manager
    }

    fn directory(&self) -> &Path {
        &self.manager.config().directory
    }

    /// Subscribe to lifecycle events
    pub fn on<F>(&mut self, handler: F) -> HandlerId
    where
        F: Fn(&MigrationEvent) + Send + Sync + 'static,
    {
        self.manager.events_mut().on(handler)
    }

    pub fn off(&mut self, id: HandlerId) -> bool {
        self.manager.events_mut().off(id)
    }

    pub async fn init(&self, cwd: impl AsRef<Path>) -> Result<bool> {
        init(cwd, self.manager.events()).await
    }

    /// Create the directories of a new migration.
    ///
    /// Only one unapplied migration may exist at a time.
    pub async fn create(&mut self, date: &NaiveDateTime, suffix: &str) -> Result<MigrationPaths> {
        let batch = self.manager.get_update_batch().await?;
        if !batch.is_empty() {
            return Err(Error::PendingMigrations(
                "You can only edit one new migration at a time, run \"tidemark up\" before creating a new one"
                    .to_string(),
            ));
        }

        let paths = create_paths(date, suffix);
        let directory = self.directory().to_path_buf();
        let events = self.manager.events();

        events.emit(MigrationEvent::MigrationDirectoryCreated {
            path: paths.root_dir.display().to_string(),
        });
        tokio::fs::create_dir_all(&directory).await?;

        for dir in [&paths.up, &paths.down] {
            events.emit(MigrationEvent::DirectionDirectoryCreated {
                path: dir.display().to_string(),
            });
            tokio::fs::create_dir_all(directory.join(dir)).await?;
        }

        Ok(paths)
    }

    /// Add empty step files to the migration matching `query`
    pub async fn step(&self, query: &str, suffixes: &[String]) -> Result<Vec<PathBuf>> {
        let discovered = self.manager.discover().await?;
        let paths = step_paths(&discovered, query, suffixes)?;

        for path in &paths {
            let target = self.directory().join(path);
            if let Some(parent) = target.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&target, "").await?;
            self.manager.events().emit(MigrationEvent::StepFileCreated {
                path: path.display().to_string(),
            });
        }

        Ok(paths)
    }

    /// The initial state and every discovered migration, flagging the current one
    pub async fn current(&mut self) -> Result<Vec<MigrationState>> {
        let discovered = self.manager.discover().await?;
        let recorded = self.manager.recorded().await?;
        Ok(state(&discovered, &recorded))
    }

    /// Bundle the migration matching `query` into one script per direction
    pub async fn compile(
        &self,
        query: &str,
        preprocessor: Option<Preprocessor<'_>>,
    ) -> Result<CompiledMigration> {
        let discovered = self.manager.discover().await?;
        compile(&discovered, query, preprocessor)
    }

    /// Apply every pending migration. Returns the applied batch.
    pub async fn up(&mut self) -> Result<Batch> {
        let batch = self.manager.get_update_batch().await?;
        self.manager.up(&batch).await?;
        Ok(batch)
    }

    /// Revert the last applied migration, or all of them
    pub async fn down(&mut self, all: bool) -> Result<Batch> {
        let batch = self.manager.get_rollback_batch(!all).await?;
        self.manager.down(&batch).await?;
        Ok(batch)
    }

    /// Release the database connection
    pub async fn destroy(&mut self) -> Result<()> {
        self.manager.destroy().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingDriver;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn app(temp_dir: &TempDir) -> Tidemark {
        let config = MigrationConfig {
            directory: temp_dir.path().join("migrations"),
            driver: Some("sqlite3".to_string()),
            ..Default::default()
        };
        Tidemark::with_driver(config, Box::new(RecordingDriver::new()))
    }

    fn record_events(app: &mut Tidemark) -> Arc<Mutex<Vec<MigrationEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        app.on(move |e| sink.lock().unwrap().push(e.clone()));
        seen
    }

    #[tokio::test]
    async fn test_init_reports_outcome() {
        let temp_dir = TempDir::new().unwrap();
        let mut app = app(&temp_dir);
        let seen = record_events(&mut app);

        assert!(app.init(temp_dir.path()).await.unwrap());
        assert!(!app.init(temp_dir.path()).await.unwrap());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![MigrationEvent::InitSuccess, MigrationEvent::InitNoop]
        );
    }

    #[tokio::test]
    async fn test_create_then_step() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("migrations")).unwrap();
        let mut app = app(&temp_dir);
        let seen = record_events(&mut app);

        let date = chrono::NaiveDate::from_ymd_opt(2015, 2, 10)
            .unwrap()
            .and_hms_opt(22, 10, 3)
            .unwrap();
        let paths = app.create(&date, "foobar").await.unwrap();
        let root = temp_dir.path().join("migrations").join(&paths.root_dir);
        assert!(root.join("up").is_dir());
        assert!(root.join("down").is_dir());

        let steps = app
            .step("foobar", &["table".to_string()])
            .await
            .unwrap();
        assert_eq!(steps.len(), 2);
        assert!(root.join("up").join("01_table.sql").is_file());
        assert!(root.join("down").join("01_table.sql").is_file());

        let seen = seen.lock().unwrap();
        assert!(seen.contains(&MigrationEvent::MigrationDirectoryCreated {
            path: "20150210_221003_foobar".to_string()
        }));
        assert!(seen
            .iter()
            .any(|e| matches!(e, MigrationEvent::StepFileCreated { .. })));
    }

    #[tokio::test]
    async fn test_create_refuses_with_pending_migration() {
        let temp_dir = TempDir::new().unwrap();
        let pending = temp_dir.path().join("migrations/20150101_000000_pending");
        std::fs::create_dir_all(pending.join("up")).unwrap();
        std::fs::create_dir_all(pending.join("down")).unwrap();
        let mut app = app(&temp_dir);

        let date = chrono::Utc::now().naive_utc();
        assert!(matches!(
            app.create(&date, "next").await,
            Err(Error::PendingMigrations(_))
        ));
    }

    #[tokio::test]
    async fn test_current_on_fresh_database() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("migrations/20150101_000000_a/up")).unwrap();
        std::fs::create_dir_all(temp_dir.path().join("migrations/20150101_000000_a/down")).unwrap();
        let mut app = app(&temp_dir);

        let state = app.current().await.unwrap();
        assert_eq!(state.len(), 2);
        assert!(state[0].initial && state[0].current);
        assert!(!state[1].current);
    }
}
