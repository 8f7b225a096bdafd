use crate::cli::ConfigCommands;
use crate::config::GatherConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// `load` yields the effective config (file plus flag and env overrides).
pub async fn run(
    cmd: ConfigCommands,
    config_path: &Path,
    load: impl FnOnce() -> Result<GatherConfig>,
) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => {
            check(config_path)?;
            println!("{}: ok", config_path.display());
            Ok(())
        }
        ConfigCommands::Show => show(load()?),
    }
}

/// Parse and validate the file itself, ignoring overrides. Every problem is
/// reported, not just the first.
fn check(config_path: &Path) -> Result<()> {
    let config = GatherConfig::load(config_path)?;
    let problems = config.validate();
    if problems.is_empty() {
        return Ok(());
    }

    let listing: Vec<String> = problems
        .iter()
        .map(|problem| format!("{}: {}", config_path.display(), problem))
        .collect();
    anyhow::bail!("{}", listing.join("\n"))
}

/// Print the configuration after flag and env overrides. The token is masked.
fn show(mut config: GatherConfig) -> Result<()> {
    if config.api.token.is_some() {
        config.api.token = Some("********".into());
    }
    let rendered = toml::to_string_pretty(&config).context("rendering config as TOML")?;
    println!("{}", rendered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_check_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gather.toml");
        fs::write(&path, "[api]\nbase_url = \"https://events.example.com\"\n").unwrap();

        assert!(check(&path).is_ok());
    }

    #[test]
    fn test_check_lists_every_problem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gather.toml");
        fs::write(
            &path,
            "[api]\nbase_url = \"ftp://x\"\ntimeout_secs = 0\n",
        )
        .unwrap();

        let message = check(&path).unwrap_err().to_string();
        assert_eq!(message.lines().count(), 2);
        assert!(message.contains("http(s)"));
        assert!(message.contains("timeout_secs"));
    }

    #[test]
    fn test_check_rejects_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check(&dir.path().join("absent.toml")).is_err());

        let path = dir.path().join("gather.toml");
        fs::write(&path, "[cache\n").unwrap();
        assert!(check(&path).is_err());
    }

    #[test]
    fn test_check_reports_oversized_throttle_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gather.toml");
        fs::write(&path, "[cache]\nthrottle_window_ms = 99999999999999\n").unwrap();

        let message = check(&path).unwrap_err().to_string();
        assert!(message.contains("throttle window"));
    }
}
