use super::finish;
use crate::output::{show_info, show_verbose};
use tidemark::{Error, MigrationConfig, MigrationEvent, Tidemark};

pub async fn run(config: MigrationConfig, all: bool, verbose: bool) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    app.on(move |event| match event {
        MigrationEvent::ApplyMigration { name, .. } => {
            show_info(format!("Rolling back \"{}\"", name))
        }
        MigrationEvent::ApplyStep { path } if verbose => {
            show_verbose(format!("Running \"{}\"", path))
        }
        _ => {}
    });

    let result = match app.down(all).await {
        Err(Error::EmptyBatch(_)) => {
            show_info("Already at the earliest revision");
            Ok(())
        }
        other => other.map(|_| ()),
    };
    finish(&mut app, result).await
}
