use crate::output::show_info;
use std::path::Path;
use tidemark::config::CONFIG_FILE;
use tidemark::{EventEmitter, MigrationEvent};

pub async fn run(cwd: &Path) -> anyhow::Result<()> {
    let mut events = EventEmitter::new();
    events.on(|event| match event {
        MigrationEvent::InitSuccess => show_info(format!("Created {}", CONFIG_FILE)),
        MigrationEvent::InitNoop => show_info(format!("{} already exists", CONFIG_FILE)),
        _ => {}
    });

    tidemark::app::init(cwd, &events).await?;
    Ok(())
}
