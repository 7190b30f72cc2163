use super::finish;
use crate::output::{show_info, show_verbose};
use tidemark::{Error, MigrationConfig, MigrationEvent, Tidemark};

pub async fn run(config: MigrationConfig, verbose: bool) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    app.on(move |event| match event {
        MigrationEvent::ApplyMigration { name, .. } => show_info(format!("Applying \"{}\"", name)),
        MigrationEvent::ApplyStep { path } if verbose => {
            show_verbose(format!("Running \"{}\"", path))
        }
        _ => {}
    });

    let result = match app.up().await {
        Err(Error::EmptyBatch(_)) => {
            show_info("Everything already up to date");
            Ok(())
        }
        other => other.map(|_| ()),
    };
    finish(&mut app, result).await
}
