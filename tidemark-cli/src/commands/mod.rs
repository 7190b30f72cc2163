pub mod compile;
pub mod create;
pub mod current;
pub mod init;
pub mod rollback;
pub mod step;
pub mod update;

use std::path::Path;
use tidemark::{MigrationConfig, Tidemark};

pub fn load_config(path: &Path) -> anyhow::Result<MigrationConfig> {
    Ok(MigrationConfig::from_file(path)?)
}

/// Release the connection, then surface the command's own outcome first
pub async fn finish<T>(app: &mut Tidemark, result: tidemark::Result<T>) -> anyhow::Result<T> {
    let released = app.destroy().await;
    let value = result?;
    if let Err(err) = released {
        log::warn!("Failed to release the database connection: {}", err);
    }
    Ok(value)
}
