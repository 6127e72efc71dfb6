mod cli;
mod commands;

use cli::{Cli, Commands};
use commands::{coverage, filter, heatmap, render, summary};

fn init_tracing(verbose: u8) -> anyhow::Result<()> {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))
}

pub async fn run() -> anyhow::Result<()> {
    use clap::Parser;

    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match &cli.command {
        Commands::Summary(args) => summary::run(&cli, args).await,
        Commands::Filter(args) => filter::run(&cli, args).await,
        Commands::Coverage(args) => coverage::run(&cli, args).await,
        Commands::Heatmap(args) => heatmap::run(&cli, args).await,
        Commands::Render(args) => render::run(&cli, args).await,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> { run().await }
