mod cli;
mod config;

use clap::Parser;
use cli::{Cli, Commands};
use config::GatherConfig;
use tracing::debug;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--format json` output stays clean
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = cli.config;
    let load = || -> anyhow::Result<GatherConfig> {
        Ok(GatherConfig::load_or_default(&config_path)?.with_overrides(cli.api_url, cli.token))
    };

    match cli.command {
        Commands::Config(cmd) => cli::config_cmd::run(cmd, &config_path, load).await,
        command => {
            let config = load()?;
            let directory = cli::connect(&config)?;
            debug!("Using API at {}", directory.api().base_url());

            let result = match command {
                Commands::Event(args) => cli::event::run(args, &directory).await,
                Commands::Profile(args) => cli::profile::run(args, &directory).await,
                Commands::Rsvp(args) => cli::rsvp::run(args, &directory).await,
                Commands::Config(_) => unreachable!("handled above"),
            };

            debug!("Cache: {}", directory.cache().metrics().summary());
            result
        }
    }
}
