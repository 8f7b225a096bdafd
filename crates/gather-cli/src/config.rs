use anyhow::{Context, Result};
use gather_cache::CacheConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Contents of `gather.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatherConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".into(),
            token: None,
            timeout_secs: 10,
        }
    }
}

impl GatherConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = toml::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }

    /// Load `path`, or fall back to defaults when it doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::debug!("{} not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply `--api-url` / `--token` (or their env vars) on top of the file.
    pub fn with_overrides(mut self, api_url: Option<String>, token: Option<String>) -> Self {
        if let Some(url) = api_url {
            self.api.base_url = url;
        }
        if token.is_some() {
            self.api.token = token;
        }
        self
    }

    /// Every problem found, empty when the config is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.api.base_url.trim().is_empty() {
            errors.push("api.base_url must not be empty".to_string());
        } else if !(self.api.base_url.starts_with("http://")
            || self.api.base_url.starts_with("https://"))
        {
            errors.push(format!(
                "api.base_url must be an http(s) URL, got {:?}",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            errors.push("api.timeout_secs must be > 0".to_string());
        }
        if let Err(e) = self.cache.validate() {
            errors.push(format!("cache: {e}"));
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gather_cache::KeyMatch;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_full_file() {
        let file = write_config(
            r#"
[api]
base_url = "https://events.example.com/api"
token = "secret"
timeout_secs = 3

[cache]
default_ttl_ms = 60000
throttle_window_ms = 250
key_match = "substring"
"#,
        );

        let config = GatherConfig::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://events.example.com/api");
        assert_eq!(config.api.token.as_deref(), Some("secret"));
        assert_eq!(config.api.timeout_secs, 3);
        assert_eq!(config.cache.default_ttl, Duration::from_secs(60));
        assert_eq!(config.cache.throttle_window, Duration::from_millis(250));
        assert_eq!(config.cache.key_match, KeyMatch::Substring);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[cache]\nthrottle_window_ms = 0\n");

        let config = GatherConfig::load(file.path()).unwrap();
        assert_eq!(config.api, ApiConfig::default());
        assert_eq!(config.cache.default_ttl, CacheConfig::default().default_ttl);
        assert!(config.cache.throttle_window.is_zero());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = GatherConfig::load_or_default(&dir.path().join("gather.toml")).unwrap();
        assert_eq!(config, GatherConfig::default());
        assert!(GatherConfig::load(&dir.path().join("gather.toml")).is_err());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let file = write_config("[api\nbase_url = ");
        assert!(GatherConfig::load(file.path()).is_err());
        assert!(GatherConfig::load_or_default(file.path()).is_err());
    }

    #[test]
    fn test_validate_collects_every_error() {
        let mut config = GatherConfig::default();
        config.api.base_url = "ftp://example.com".into();
        config.api.timeout_secs = 0;
        config.cache.default_ttl = Duration::ZERO;

        let errors = config.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("http(s)"));
        assert!(errors[1].contains("timeout_secs"));
        assert!(errors[2].starts_with("cache:"));
    }

    #[test]
    fn test_overrides() {
        let config = GatherConfig::default()
            .with_overrides(Some("https://other.example.com".into()), None);
        assert_eq!(config.api.base_url, "https://other.example.com");
        assert_eq!(config.api.token, None);

        let config = config.with_overrides(None, Some("t0ken".into()));
        assert_eq!(config.api.base_url, "https://other.example.com");
        assert_eq!(config.api.token.as_deref(), Some("t0ken"));
    }

    #[test]
    fn test_show_round_trips_through_toml() {
        let config = GatherConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        assert!(rendered.contains("[api]"));
        assert!(rendered.contains("throttle_window_ms = 500"));
        assert_eq!(toml::from_str::<GatherConfig>(&rendered).unwrap(), config);
    }
}
