use super::finish;
use tidemark::{MigrationConfig, Tidemark};

pub async fn run(config: MigrationConfig) -> anyhow::Result<()> {
    let mut app = Tidemark::new(config)?;
    let result = app.current().await;
    let states = finish(&mut app, result).await?;

    for state in states {
        let label = if state.initial {
            "Initial state".to_string()
        } else {
            state.name
        };
        if state.current {
            println!("* {}", label);
        } else {
            println!("  {}", label);
        }
    }
    Ok(())
}
