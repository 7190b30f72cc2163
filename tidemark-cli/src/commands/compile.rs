use super::finish;
use crate::output::show_info;
use std::path::PathBuf;
use tidemark::{MigrationConfig, Tidemark};

pub async fn run(config: MigrationConfig, migration: String, dir: PathBuf) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    let result = app.compile(&migration, None).await;
    let compiled = finish(&mut app, result).await?;

    let target = dir.join(&compiled.name);
    tokio::fs::create_dir_all(&target).await?;

    for (direction, sql) in [("up", &compiled.up), ("down", &compiled.down)] {
        let path = target.join(format!("{}.sql", direction));
        tokio::fs::write(&path, sql).await?;
        show_info(format!("Dumped \"{}\" to \"{}\"", direction, path.display()));
    }
    Ok(())
}
