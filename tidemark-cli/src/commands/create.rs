use super::finish;
use crate::output::{show_info, show_verbose};
use tidemark::{MigrationConfig, MigrationEvent, Tidemark};

pub async fn run(config: MigrationConfig, suffix: String, verbose: bool) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    app.on(move |event| match event {
        MigrationEvent::MigrationDirectoryCreated { path } => show_info(format!("Created {}", path)),
        MigrationEvent::DirectionDirectoryCreated { path } if verbose => {
            show_verbose(format!("Created {}", path))
        }
        _ => {}
    });

    let now = chrono::Local::now().naive_local();
    let result = app.create(&now, &suffix).await;
    finish(&mut app, result).await?;
    Ok(())
}
