pub mod config_cmd;
pub mod event;
pub mod profile;
pub mod rsvp;

use crate::config::GatherConfig;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gather_client::{EntityCache, EventDirectory, HttpEntityApi};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "gather")]
#[command(version, about = "Browse events, profiles and RSVPs")]
pub struct Cli {
    /// Path to gather.toml
    #[arg(
        long,
        global = true,
        env = "GATHER_CONFIG",
        default_value = "gather.toml"
    )]
    pub config: PathBuf,

    /// API base URL (overrides config file)
    #[arg(long, global = true, env = "GATHER_API_URL")]
    pub api_url: Option<String>,

    /// Bearer token (overrides config file)
    #[arg(long, global = true, env = "GATHER_API_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show an event page
    Event(EventArgs),
    /// Show a user profile
    Profile(ProfileArgs),
    /// Respond to an event
    Rsvp(RsvpArgs),
    /// Config file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Args, Debug)]
pub struct EventArgs {
    /// Event ID
    pub id: String,
    /// Include this viewer's RSVP
    #[arg(long)]
    pub viewer: Option<String>,
    /// Output format: text or json
    #[arg(long, default_value = "text")]
    pub format: String,
}

#[derive(Args, Debug)]
pub struct ProfileArgs {
    /// User ID
    pub id: String,
    /// Also list the user's albums
    #[arg(long)]
    pub albums: bool,
}

#[derive(Args, Debug)]
pub struct RsvpArgs {
    /// Event ID
    pub event_id: String,
    /// Email of the responding user
    pub viewer: String,
    /// going, interested or not-going
    pub status: String,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Check gather.toml for errors
    Validate,
    /// Print the effective configuration
    Show,
}

pub type Directory = EventDirectory<HttpEntityApi>;

/// Build the HTTP client and its cache from a validated config.
pub fn connect(config: &GatherConfig) -> Result<Directory> {
    let errors = config.validate();
    if !errors.is_empty() {
        anyhow::bail!("invalid configuration:\n  - {}", errors.join("\n  - "));
    }

    let mut api = HttpEntityApi::new(
        &config.api.base_url,
        Duration::from_secs(config.api.timeout_secs),
    )?;
    if let Some(token) = &config.api.token {
        api = api.with_token(token.clone());
    }
    let cache = EntityCache::new(config.cache.clone())?;

    Ok(EventDirectory::new(Arc::new(api), cache))
}
