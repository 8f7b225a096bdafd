use crate::error::{CacheError, Result};
use crate::key::KeyMatch;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upper bound for TTLs and the throttle window: one year.
pub const MAX_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Configuration for a [`crate::RequestCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Lifetime of a stored value when the write doesn't pick one. Default: 5 minutes.
    #[serde(rename = "default_ttl_ms", with = "duration_millis")]
    pub default_ttl: Duration,

    /// Minimum spacing between producer calls for the same key. Default: 500ms.
    /// Zero disables throttling.
    #[serde(rename = "throttle_window_ms", with = "duration_millis")]
    pub throttle_window: Duration,

    /// How `invalidate_matching` compares patterns to keys. Default: segment.
    pub key_match: KeyMatch,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(5 * 60),
            throttle_window: Duration::from_millis(500),
            key_match: KeyMatch::Segment,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_throttle_window(mut self, window: Duration) -> Self {
        self.throttle_window = window;
        self
    }

    pub fn with_key_match(mut self, key_match: KeyMatch) -> Self {
        self.key_match = key_match;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_ttl.is_zero() {
            return Err(CacheError::Validation("default_ttl must be > 0".into()));
        }
        if self.default_ttl > MAX_DURATION {
            return Err(CacheError::Validation(format!(
                "default_ttl must be at most {:?}, got {:?}",
                MAX_DURATION, self.default_ttl
            )));
        }
        if self.throttle_window > MAX_DURATION {
            return Err(CacheError::InvalidThrottleWindow(self.throttle_window));
        }

        Ok(())
    }
}

// Durations travel as whole milliseconds in config files.
mod duration_millis {
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = u64::try_from(duration.as_millis()).map_err(S::Error::custom)?;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.default_ttl, Duration::from_secs(300));
        assert_eq!(config.throttle_window, Duration::from_millis(500));
        assert_eq!(config.key_match, KeyMatch::Segment);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = CacheConfig::new().with_default_ttl(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CacheError::Validation(_))));
    }

    #[test]
    fn test_durations_are_bounded() {
        let config = CacheConfig::new().with_default_ttl(Duration::MAX);
        assert!(matches!(config.validate(), Err(CacheError::Validation(_))));

        let config = CacheConfig::new().with_throttle_window(Duration::MAX);
        assert_eq!(
            config.validate(),
            Err(CacheError::InvalidThrottleWindow(Duration::MAX))
        );

        let config = CacheConfig::new()
            .with_default_ttl(MAX_DURATION)
            .with_throttle_window(MAX_DURATION);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serializing_huge_duration_fails() {
        let config = CacheConfig::new().with_default_ttl(Duration::MAX);
        assert!(serde_json::to_value(&config).is_err());
    }

    #[test]
    fn test_zero_throttle_allowed() {
        let config = CacheConfig::new().with_throttle_window(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_serde_uses_millis() {
        let config = CacheConfig::new()
            .with_default_ttl(Duration::from_secs(60))
            .with_key_match(KeyMatch::Substring);
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["default_ttl_ms"], 60_000);
        assert_eq!(json["throttle_window_ms"], 500);
        assert_eq!(json["key_match"], "substring");

        let parsed: CacheConfig =
            serde_json::from_str(r#"{"throttle_window_ms": 250}"#).unwrap();
        assert_eq!(parsed.throttle_window, Duration::from_millis(250));
        assert_eq!(parsed.default_ttl, Duration::from_secs(300));
    }
}
