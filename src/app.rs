// Declare modules
pub mod cli;
pub mod config;
pub mod error;
pub mod formatter;
pub mod models;
pub mod qa;
pub mod scanner;
pub mod server;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

use self::cli::{Cli, Command};
use self::config::{SettingsStore, DEFAULT_BIND};
use self::formatter::OutputGenerator;
use self::qa::QaClient;
use self::scanner::Scanner;
use self::server::AppState;

/// Loads settings and dispatches the selected command.
pub async fn run(cli: Cli) -> Result<()> {
    let store = SettingsStore::load(&cli.settings)
        .with_context(|| format!("Failed to load settings from {:?}", cli.settings))?;

    if let Some(dir) = cli.base_dir.as_deref() {
        let dir = store
            .override_base_dir(dir)
            .with_context(|| format!("Invalid --base-dir {:?}", dir))?;
        log::info!("Using base directory {:?} for this run", dir);
    }

    let command = cli.command.unwrap_or(Command::Serve {
        bind: DEFAULT_BIND.to_string(),
    });

    match command {
        Command::Serve { bind } => {
            log::info!("Settings file: {:?}", store.path());
            let settings = store.settings();
            let qa = QaClient::new(
                settings.qa_endpoint,
                Duration::from_secs(settings.qa_timeout_secs),
            )
            .context("Failed to build HTTP client")?;
            let state = AppState {
                store: Arc::new(store),
                qa,
            };
            server::serve(&bind, state).await?;
        }
        Command::Tree => {
            let config = store.enumeration_config();
            let enumeration = Scanner::new(&config).scan()?;
            log::info!("{} file(s) listed", enumeration.file_count);
            println!("{}", serde_json::to_string_pretty(&enumeration.nodes)?);
        }
        Command::Concat {
            paths,
            line_numbers,
        } => {
            let result = OutputGenerator::render(&store.base_dir(), &paths, line_numbers);
            print!("{}", result.text);
        }
        Command::SetBaseDir { path } => {
            let dir = store.update_base_dir(&path)?;
            println!("Base directory set to {}", dir.display());
        }
    }

    Ok(())
}
