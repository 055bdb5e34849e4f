mod calendar;
mod cli;
mod config;
mod engine;
mod error;
mod harvest;
mod records;
mod report;
mod router;
mod spreadsheet;
mod store;
mod ui;
mod wizard;
mod workflow;

use anyhow::{Context, Result};
use clap::Parser;
use inquire::Confirm;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::AppConfig;
use engine::{Engine, LiveEffects, Settings};
use router::Router;
use store::Store;
use ui::Palette;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    }
    .context("failed to load configuration")?;
    if let Some(store) = cli.store {
        config.store_path = store;
    }
    if let Some(template) = cli.template {
        config.template_path = template;
    }

    let store = Store::new(config.store_path.clone());
    match cli.command.unwrap_or(Command::Start) {
        Command::Start => {
            let snapshot = store.load().context("failed to read the record store")?;
            let effects = LiveEffects::new(&config).context("failed to build the HTTP client")?;
            let router = Router::new(store, snapshot);
            let mut engine = Engine::new(router, effects, Settings::from(&config));
            wizard::run(&mut engine).await?;
        }
        Command::Status => {
            let snapshot = store.load().context("failed to read the record store")?;
            ui::print_status(
                &Palette::default(),
                &snapshot.base_info,
                snapshot.clients.values(),
                snapshot.invoices.values(),
            );
        }
        Command::Reset { yes } => {
            let confirmed = yes
                || Confirm::new(&format!("Delete every record in {}?", store.path().display()))
                    .with_default(false)
                    .prompt()?;
            if confirmed {
                store.clear()?;
                Palette::default().success("Store cleared");
            }
        }
    }

    Ok(())
}

/// Logs go to stderr so they never mix with the prompts.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("invoicer=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("invoicer=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
