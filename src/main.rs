use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use fitcoach::{
    OutputFmt,
    config::{Backend, Config, Settings},
    db::SqliteStore,
    logging,
    storage::MemoryStore,
};

mod cli;
mod commands;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let fmt = OutputFmt::from_flag(cli.json);
    let config_path = Config::default_path().context("Could not determine config directory")?;
    let cfg = Config::load(&config_path)?;

    // Config commands must keep working when the stored config is invalid.
    let cmd = match cli.cmd {
        Commands::Config(cmd) => {
            logging::init("warn");
            return commands::config::handle(cmd, &config_path, fmt);
        }
        other => other,
    };

    let settings = Settings::from_config(&cfg).context("invalid config, see `fitcoach config list`")?;
    logging::init(&settings.log_level);
    tracing::debug!(?settings, "settings resolved");

    match settings.backend {
        Backend::Sqlite => {
            let store = SqliteStore::open(&settings.database)
                .await
                .with_context(|| format!("opening database `{}`", settings.database))?;
            store.seed_if_empty().await?;
            let ctx = commands::Ctx::new(Arc::new(store), settings, fmt);
            commands::run(cmd, &ctx).await
        }
        Backend::Memory => {
            let store = MemoryStore::seeded().await?;
            let ctx = commands::Ctx::new(Arc::new(store), settings, fmt);
            commands::run(cmd, &ctx).await
        }
    }
}
