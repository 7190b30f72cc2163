use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "tidemark")]
#[command(about = "Versioned SQL migrations, one transaction per migration")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file, relative to the current directory
    #[arg(short, long, global = true, default_value = tidemark::config::CONFIG_FILE)]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a configuration template into the current directory
    Init,

    /// Create a new migration directory
    Create {
        /// Name appended to the migration timestamp
        suffix: String,
    },

    /// Create new step files in a migration, matched by partial name
    Step {
        /// Part of the migration name
        migration: String,

        /// One step file is created per suffix, in both directions
        suffixes: Vec<String>,
    },

    /// Migrate the database to the latest version
    #[command(alias = "up")]
    Update,

    /// Revert the last migration
    #[command(alias = "down")]
    Rollback {
        /// Revert every applied migration
        #[arg(short, long)]
        all: bool,
    },

    /// Show the current migration
    #[command(alias = "cur")]
    Current,

    /// Bundle a migration into one up.sql and one down.sql
    Compile {
        /// Part of the migration name
        migration: String,

        /// Output directory; files land in <dir>/<migration>/
        #[arg(short, long, default_value = ".")]
        dir: PathBuf,
    },
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let config_path = cwd.join(&cli.config);
    let config = || commands::load_config(&config_path);
    let verbose = cli.verbose;

    match cli.command {
        Commands::Init => commands::init::run(&cwd).await,
        Commands::Create { suffix } => commands::create::run(config()?, suffix, verbose).await,
        Commands::Step {
            migration,
            suffixes,
        } => commands::step::run(config()?, migration, suffixes).await,
        Commands::Update => commands::update::run(config()?, verbose).await,
        Commands::Rollback { all } => commands::rollback::run(config()?, all, verbose).await,
        Commands::Current => commands::current::run(config()?).await,
        Commands::Compile { migration, dir } => {
            commands::compile::run(config()?, migration, cwd.join(dir)).await
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    if let Err(err) = run(cli).await {
        output::show_error(&err);
        std::process::exit(1);
    }
}
