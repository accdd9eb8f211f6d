use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use libris_app::Application;
use libris_kernel::settings::Settings;

/// Command-line entrypoint for the libris book service
#[derive(Debug, Parser)]
#[command(name = "libris", version, about)]
struct Cli {
    /// Directory holding base.toml and the per-environment overlays
    #[arg(long, global = true, env = "LIBRIS_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (local, staging, production)
    #[arg(long = "env", global = true, env = "LIBRIS_ENV")]
    environment: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Migrate, then serve HTTP until interrupted
    Serve,
    /// Apply pending schema migrations and exit
    Migrate,
    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        match (&self.config_dir, &self.environment) {
            (None, None) => Settings::load(),
            (config_dir, environment) => {
                let config_dir = match config_dir {
                    Some(dir) => dir.clone(),
                    None => std::env::current_dir()
                        .context("unable to resolve current directory")?
                        .join("config"),
                };
                Settings::load_from(&config_dir, environment.as_deref().unwrap_or("local"))
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli
        .settings()
        .with_context(|| "failed to load libris settings")?;

    if let Command::Config = cli.command {
        let mut printable = settings.clone();
        printable.database.url = settings.database.redacted_url();
        println!("{}", serde_json::to_string_pretty(&printable)?);
        return Ok(());
    }

    libris_telemetry::init(&settings.telemetry)?;
    tracing::info!(env = ?settings.environment, command = ?cli.command, "libris CLI starting");

    let app = Application::build(&settings).await?;
    match cli.command {
        Command::Serve => app.run(&settings).await,
        Command::Migrate => {
            let applied = app.migrate().await?;
            tracing::info!(applied, "migrate finished");
            Ok(())
        }
        Command::Config => Ok(()),
    }
}
