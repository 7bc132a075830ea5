//! `formrelay` - serve pages and relay form submissions into a JSON log

mod cli;

use anyhow::Context;
use clap::Parser;

use cli::{Cli, Command};
use formrelay_core::{logging::init_logging, App, Config};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.as_deref()).context("loading configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config).await,
        Command::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

async fn serve(config: &Config) -> anyhow::Result<()> {
    let app = App::bind(config).await.context("binding sockets")?;
    tracing::info!(
        http = %app.http_addr(),
        relay = %app.relay_addr(),
        store = %config.store.path.display(),
        "formrelay started"
    );

    app.run(shutdown_signal()).await?;
    tracing::info!("formrelay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c, stopping");
    }
}
