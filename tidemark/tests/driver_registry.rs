//! Plugging drivers into the engine without a database

use tempfile::TempDir;
use tidemark::database::{Driver, DriverRegistry};
use tidemark::testing::RecordingDriver;
use tidemark::{Batch, Error, MigrationConfig, MigrationManager, Tidemark};

fn config(temp_dir: &TempDir, driver: &str) -> MigrationConfig {
    MigrationConfig {
        directory: temp_dir.path().to_path_buf(),
        driver: Some(driver.to_string()),
        ..Default::default()
    }
}

#[test]
fn test_register_custom_backend() {
    let temp_dir = TempDir::new().unwrap();
    let mut registry = DriverRegistry::new();
    registry.register("memory", |_config| {
        Ok(Box::new(RecordingDriver::new()) as Box<dyn Driver>)
    });

    let driver = registry.create(&config(&temp_dir, "MEMORY")).unwrap();
    assert!(!driver.is_connected());

    match registry.create(&config(&temp_dir, "pg")) {
        Err(Error::UnknownBackend { known, .. }) => assert_eq!(known, "memory"),
        Err(other) => panic!("unexpected error: {other:?}"),
        Ok(_) => panic!("pg is not registered"),
    }
}

#[test]
fn test_unknown_driver_fails_before_any_connection() {
    let temp_dir = TempDir::new().unwrap();
    assert!(matches!(
        MigrationManager::new(config(&temp_dir, "oracle")),
        Err(Error::UnknownBackend { .. })
    ));
    assert!(matches!(
        Tidemark::new(MigrationConfig::default()),
        Err(Error::UndefinedConfiguration(_))
    ));
}

#[tokio::test]
async fn test_nothing_to_apply_touches_no_migration_state() {
    let temp_dir = TempDir::new().unwrap();
    let driver = RecordingDriver::new();
    let log = driver.log();
    let mut app = Tidemark::with_driver(config(&temp_dir, "memory"), Box::new(driver));

    assert!(matches!(app.up().await, Err(Error::EmptyBatch(_))));
    assert!(matches!(app.down(true).await, Err(Error::EmptyBatch(_))));

    // Only the two reads computing the batches
    assert_eq!(log.queries().len(), 2);
    assert!(log.transactions().is_empty());

    let mut manager = MigrationManager::with_driver(
        config(&temp_dir, "memory"),
        Box::new(RecordingDriver::new()),
    );
    assert!(matches!(
        manager.up(&Batch::default()).await,
        Err(Error::EmptyBatch(_))
    ));

    app.destroy().await.unwrap();
}
