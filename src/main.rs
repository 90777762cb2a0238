use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use dynlens::app::AppContext;
use dynlens::cli::{commands, Cli, Commands};
use dynlens::config::Config;
use dynlens::i18n;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    i18n::init(cli.lang.as_deref().unwrap_or(&config.lang));

    let settings = cli.settings(&config)?;
    let ctx = AppContext::new(config, None)?;

    match &cli.command {
        Commands::Fetch { view } => {
            commands::fetch(&ctx, &settings, view.as_deref()).await?;
        }
        Commands::Summarize { creator } => {
            commands::summarize(&ctx, &settings, creator).await?;
        }
        Commands::Tui => {
            dynlens::tui::run(ctx.store.clone(), settings).await?;
        }
    }

    Ok(())
}
