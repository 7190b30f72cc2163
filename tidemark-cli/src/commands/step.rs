use super::finish;
use crate::output::show_info;
use tidemark::{MigrationConfig, MigrationEvent, Tidemark};

pub async fn run(
    config: MigrationConfig,
    migration: String,
    suffixes: Vec<String>,
) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    app.on(|event| {
        if let MigrationEvent::StepFileCreated { path } = event {
            show_info(format!("Created {}", path));
        }
    });

    let result = app.step(&migration, &suffixes).await;
    finish(&mut app, result).await?;
    Ok(())
}
