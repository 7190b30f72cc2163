//! Migration orchestrator
//!
//! Per migration name, the recorded state moves through:
//!
//! ```text
//! Unknown --up--> Applied (insert)
//! Applied --down--> PendingDown (applied = false)
//! PendingDown --up--> Applied (applied = true)
//! ```
//!
//! Each migration runs in its own transaction. A batch is applied
//! sequentially and stops at the first failure; migrations committed
//! earlier in the batch stay committed.

use crate::config::MigrationConfig;
use crate::database::driver::{Driver, Statement};
use crate::database::model::Model;
use crate::discovery::Finder;
use crate::error::{Error, ErrorContext, Result};
use crate::events::{EventEmitter, MigrationEvent};
use crate::filters;
use crate::migrations::{Batch, MigrationDirection, MigrationUnit, RecordedMigration};

/// Applies batches of migrations against one database
pub struct MigrationManager {
    config: MigrationConfig,
    model: Model,
    finder: Finder,
    events: EventEmitter,
}

impl MigrationManager {
    /// Create a manager with the driver named by the configuration.
    ///
    /// Fails eagerly on an unknown driver; no connection is opened.
    pub fn new(config: MigrationConfig) -> Result<Self> {
        let model = Model::new(&config)?;
        Ok(Self::with_model(config, model))
    }

    /// Create a manager over an existing driver
    pub fn with_driver(config: MigrationConfig, driver: Box<dyn Driver>) -> Self {
        Self::with_model(config, Model::with_driver(driver))
    }

    fn with_model(config: MigrationConfig, model: Model) -> Self {
        let finder = Finder::new(&config.directory);
        Self {
            config,
            model,
            finder,
            events: EventEmitter::new(),
        }
    }

    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    pub fn finder(&self) -> &Finder {
        &self.finder
    }

    pub fn events(&self) -> &EventEmitter {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventEmitter {
        &mut self.events
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    /// Discover migrations on disk and report how many were found
    pub async fn discover(&self) -> Result<Vec<MigrationUnit>> {
        let discovered = self.finder.discover().await?;
        self.events.emit(MigrationEvent::Discovered {
            count: discovered.len(),
        });
        Ok(discovered)
    }

    /// Every recorded migration, ordered by name
    pub async fn recorded(&mut self) -> Result<Vec<RecordedMigration>> {
        self.model
            .find_all_by_name()
            .await
            .context("Cannot load recorded migrations")
    }

    /// Migrations to apply with `up`, oldest first
    pub async fn get_update_batch(&mut self) -> Result<Batch> {
        let discovered = self.discover().await?;
        let recorded = self.recorded().await?;

        Self::verify_lock(&discovered, &recorded)?;
        let migrations = filters::update(&discovered, &recorded);

        log::debug!("Update batch: {} migration(s)", migrations.len());
        Ok(Batch {
            recorded,
            migrations,
        })
    }

    /// Migrations to revert with `down`, newest first.
    ///
    /// With `limit_to_last`, only the most recently applied migration is selected.
    pub async fn get_rollback_batch(&mut self, limit_to_last: bool) -> Result<Batch> {
        let discovered = self.discover().await?;
        let recorded = self
            .model
            .find_last_applied(limit_to_last)
            .await
            .context("Cannot load applied migrations")?;

        Self::verify_lock(&discovered, &recorded)?;
        let migrations = filters::rollback(&discovered, &recorded);

        log::debug!("Rollback batch: {} migration(s)", migrations.len());
        Ok(Batch {
            recorded,
            migrations,
        })
    }

    /// Refuse to run when an already recorded migration changed on disk.
    ///
    /// The latest discovered migration is exempt: it may still be under edit.
    pub fn verify_lock(discovered: &[MigrationUnit], recorded: &[RecordedMigration]) -> Result<()> {
        let Some((_latest, settled)) = discovered.split_last() else {
            return Ok(());
        };

        for migration in settled {
            let tampered = recorded
                .iter()
                .any(|rm| rm.name == migration.name && rm.checksum != migration.checksum);

            if tampered {
                return Err(Error::Tampered {
                    name: migration.name.clone(),
                });
            }
        }

        Ok(())
    }

    pub async fn up(&mut self, batch: &Batch) -> Result<()> {
        self.apply_batch(batch, MigrationDirection::Up).await
    }

    pub async fn down(&mut self, batch: &Batch) -> Result<()> {
        self.apply_batch(batch, MigrationDirection::Down).await
    }

    /// Apply every migration of the batch in order, stopping at the first failure
    pub async fn apply_batch(&mut self, batch: &Batch, direction: MigrationDirection) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::EmptyBatch(direction.to_string()));
        }

        self.events.emit(MigrationEvent::ApplyBatch {
            direction,
            names: batch.names(),
        });

        self.model.connect().await?;
        for migration in &batch.migrations {
            self.apply_one(migration, &batch.recorded, direction).await?;
        }

        Ok(())
    }

    /// Run one migration's steps in a single transaction, then record the outcome
    pub async fn apply_one(
        &mut self,
        migration: &MigrationUnit,
        recorded: &[RecordedMigration],
        direction: MigrationDirection,
    ) -> Result<()> {
        let known = recorded.iter().find(|rm| rm.name == migration.name);

        match (direction, known) {
            (MigrationDirection::Up, Some(rm)) if rm.applied => {
                return Err(Error::integrity(format!(
                    "Migration \"{}\" is already applied",
                    migration.name
                )))
            }
            (MigrationDirection::Down, Some(rm)) if !rm.applied => {
                return Err(Error::integrity(format!(
                    "Migration \"{}\" is not applied",
                    migration.name
                )))
            }
            (MigrationDirection::Down, None) => {
                return Err(Error::integrity(format!(
                    "Migration \"{}\" was never applied",
                    migration.name
                )))
            }
            _ => {}
        }

        self.events.emit(MigrationEvent::ApplyMigration {
            name: migration.name.clone(),
            direction,
        });

        let files = &migration.direction(direction).files;
        let ordered: Vec<_> = match direction {
            MigrationDirection::Up => files.iter().collect(),
            MigrationDirection::Down => files.iter().rev().collect(),
        };

        let statements: Vec<Statement> = ordered
            .into_iter()
            .map(|file| {
                let path = migration.step_path(direction, file);
                self.events.emit(MigrationEvent::ApplyStep { path: path.clone() });
                Statement::new(path, file.contents.as_str())
            })
            .collect();

        self.model.transaction(statements).await?;

        match known {
            Some(rm) => {
                self.model
                    .update(&rm.name, direction == MigrationDirection::Up)
                    .await?
            }
            None => self.model.insert(migration).await?,
        }

        log::debug!("Applied {} ({})", migration.name, direction);
        Ok(())
    }

    /// Close the database connection
    pub async fn destroy(&mut self) -> Result<()> {
        self.model.disconnect().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorChain;
    use crate::filters::tests::{record, unit};
    use crate::testing::RecordingDriver;

    fn manager(driver: RecordingDriver) -> MigrationManager {
        MigrationManager::with_driver(MigrationConfig::default(), Box::new(driver))
    }

    fn tampered(name: &str) -> RecordedMigration {
        RecordedMigration {
            checksum: "edited".to_string(),
            ..record(name, true)
        }
    }

    #[test]
    fn test_verify_lock_detects_tampering() {
        let discovered = vec![unit("a"), unit("b")];

        match MigrationManager::verify_lock(&discovered, &[tampered("a")]) {
            Err(Error::Tampered { name }) => assert_eq!(name, "a"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_migration_table_is_reported_with_context() {
        let mut row = crate::database::Row::new();
        row.insert("name".to_string(), serde_json::json!(42));
        let mut manager = manager(RecordingDriver::new().with_rows(vec![row]));

        let err = manager.recorded().await.unwrap_err();
        let chain = ErrorChain::new(&err);
        assert_eq!(chain.chain()[0], "Cannot load recorded migrations");
        assert!(matches!(chain.root_cause(), Error::Decode(_)));
    }

    #[test]
    fn test_verify_lock_exempts_latest_migration() {
        let discovered = vec![unit("a"), unit("b")];
        let recorded = vec![record("a", true), tampered("b")];

        assert!(MigrationManager::verify_lock(&discovered, &recorded).is_ok());
        assert!(MigrationManager::verify_lock(&[], &recorded).is_ok());
    }

    #[tokio::test]
    async fn test_empty_batch_issues_no_statement() {
        let driver = RecordingDriver::new();
        let log = driver.log();
        let mut manager = manager(driver);

        let result = manager.up(&Batch::default()).await;
        match result {
            Err(Error::EmptyBatch(direction)) => assert_eq!(direction, "up"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(matches!(
            manager.down(&Batch::default()).await,
            Err(Error::EmptyBatch(_))
        ));
        assert_eq!(log.count(), 0);
        assert_eq!(log.connects(), 0);
    }

    #[tokio::test]
    async fn test_apply_one_reverses_down_steps() {
        use crate::migrations::{DirectionSteps, StepFile};

        let files = |contents: [&str; 2]| DirectionSteps {
            files: ["01_a.sql", "02_b.sql"]
                .iter()
                .zip(contents)
                .map(|(filename, contents)| StepFile {
                    filename: filename.to_string(),
                    contents: contents.to_string(),
                    checksum: String::new(),
                })
                .collect(),
            checksum: String::new(),
        };
        let migration = MigrationUnit {
            steps: 2,
            up: files(["CREATE a", "CREATE b"]),
            down: files(["DROP a", "DROP b"]),
            ..unit("m")
        };

        let driver = RecordingDriver::new();
        let log = driver.log();
        let mut manager = manager(driver);

        manager
            .apply_one(&migration, &[record("m", true)], MigrationDirection::Down)
            .await
            .unwrap();

        let transactions = log.transactions();
        assert_eq!(
            transactions[0],
            vec![
                Statement::new("m/down/02_b.sql", "DROP b"),
                Statement::new("m/down/01_a.sql", "DROP a"),
            ]
        );
        // The known row is updated, not inserted
        assert!(log.queries()[0].starts_with("UPDATE"));
    }

    #[tokio::test]
    async fn test_apply_one_inserts_unknown_migration() {
        let driver = RecordingDriver::new();
        let log = driver.log();
        let mut manager = manager(driver);

        manager
            .apply_one(&unit("m"), &[], MigrationDirection::Up)
            .await
            .unwrap();

        assert!(log.queries()[0].starts_with("INSERT"));
    }

    #[tokio::test]
    async fn test_apply_one_rejects_invalid_transitions() {
        let driver = RecordingDriver::new();
        let log = driver.log();
        let mut manager = manager(driver);

        let up_twice = manager
            .apply_one(&unit("m"), &[record("m", true)], MigrationDirection::Up)
            .await;
        let down_unknown = manager
            .apply_one(&unit("m"), &[], MigrationDirection::Down)
            .await;

        assert!(matches!(up_twice, Err(Error::Integrity(_))));
        assert!(matches!(down_unknown, Err(Error::Integrity(_))));
        assert_eq!(log.count(), 0);
    }

    #[tokio::test]
    async fn test_failure_stops_batch() {
        let driver = RecordingDriver::new().failing_on("b/up/01_x.sql");
        let log = driver.log();
        let mut manager = manager(driver);

        let step = |name: &str| {
            let mut m = unit(name);
            m.up.files.push(crate::migrations::StepFile {
                filename: "01_x.sql".into(),
                contents: "SELECT 1".into(),
                checksum: String::new(),
            });
            m
        };
        let batch = Batch {
            recorded: vec![],
            migrations: vec![step("a"), step("b"), step("c")],
        };

        match manager.up(&batch).await {
            Err(Error::Query { label, .. }) => assert_eq!(label, "b/up/01_x.sql"),
            other => panic!("unexpected result: {other:?}"),
        }

        // a committed and recorded, b rolled back, c never attempted
        assert_eq!(log.transactions().len(), 2);
        assert_eq!(log.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_events_are_emitted() {
        use std::sync::{Arc, Mutex};

        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut manager = manager(RecordingDriver::new());
        let sink = seen.clone();
        manager
            .events_mut()
            .on(move |e| sink.lock().unwrap().push(e.clone()));

        let batch = Batch {
            recorded: vec![],
            migrations: vec![unit("a")],
        };
        manager.up(&batch).await.unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(
            *seen,
            vec![
                MigrationEvent::ApplyBatch {
                    direction: MigrationDirection::Up,
                    names: vec!["a".to_string()],
                },
                MigrationEvent::ApplyMigration {
                    name: "a".to_string(),
                    direction: MigrationDirection::Up,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_destroy_is_safe_when_disconnected() {
        let mut manager = manager(RecordingDriver::new());
        manager.destroy().await.unwrap();
    }
}
