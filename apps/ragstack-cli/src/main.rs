mod commands;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ragstack_core::config::Config;
use ragstack_pipeline::Pipeline;

use commands::{Cli, Commands};

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    init_tracing(&config.app().logging.filter);
    info!(backend = ?config.app().storage.backend, model = %config.app().embedding.model, "starting");

    let pipeline = Pipeline::from_config(config.app()).await?;

    match cli.command {
        Commands::Ingest { dir, limit } => commands::ingest(&pipeline, &dir, limit).await?,
        Commands::Ask { question, k } => commands::ask(&pipeline, &question, k).await?,
        Commands::Answer { question, k } => commands::answer(&pipeline, &question, k).await?,
        Commands::Strategies => commands::strategies(&pipeline),
        Commands::Strategy { name } => commands::strategy(&pipeline, name.as_deref())?,
        Commands::Params { set } => commands::params(&pipeline, &set)?,
        Commands::Namespaces => commands::namespaces(&pipeline).await?,
        Commands::Switch { model, dimension } => commands::switch(&pipeline, &model, dimension).await?,
        Commands::Clear => commands::clear(&pipeline).await?,
        Commands::Stats => commands::stats(&pipeline).await?,
    }
    Ok(())
}
