//! Retry budget configuration
//!
//! Loads configuration with the following precedence (low to high):
//! 1. Built-in defaults (one second deadline, three attempts, 25ms waits)
//! 2. YAML file named by `CONVERGE_RETRY_CONFIG`
//! 3. Environment variables (`CONVERGE_RETRY_*` prefix)
//!
//! Slow CI machines can stretch every budget without touching test code.

use crate::error::{Error, Result};
use crate::retry::{CountPolicy, DeadlinePolicy, RetryPolicy};
use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::str::FromStr;
use std::time::Duration;

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "CONVERGE_RETRY_CONFIG";

/// Which policy [`HarnessConfig::policy`] builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum PolicyKind {
    /// Fixed number of attempts
    Count,

    /// Fixed wall-clock budget (default)
    #[default]
    Deadline,
}

impl FromStr for PolicyKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "count" => Ok(Self::Count),
            "deadline" => Ok(Self::Deadline),
            other => Err(Error::invalid_config(format!(
                "Unknown retry policy: {other}. Valid policies: count, deadline"
            ))),
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count => write!(f, "count"),
            Self::Deadline => write!(f, "deadline"),
        }
    }
}

/// Complete harness configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct HarnessConfig {
    /// Policy used by [`run_configured`](crate::retry::run_configured)
    #[serde(default)]
    pub default_policy: PolicyKind,

    /// Count policy settings
    #[serde(default)]
    pub count: CountSettings,

    /// Deadline policy settings
    #[serde(default)]
    pub deadline: DeadlineSettings,
}

/// Settings for [`CountPolicy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CountSettings {
    /// Maximum number of attempts
    #[serde(default = "default_attempts")]
    pub attempts: u32,

    /// Pause between attempts in milliseconds
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl Default for CountSettings {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            wait_ms: default_wait_ms(),
        }
    }
}

/// Settings for [`DeadlinePolicy`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DeadlineSettings {
    /// Total time budget in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Pause between attempts in milliseconds
    #[serde(default = "default_wait_ms")]
    pub wait_ms: u64,
}

impl Default for DeadlineSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            wait_ms: default_wait_ms(),
        }
    }
}

fn default_attempts() -> u32 {
    3
}
fn default_wait_ms() -> u64 {
    25
}
fn default_timeout_ms() -> u64 {
    1000
}

impl HarnessConfig {
    /// Load configuration from the file named by `CONVERGE_RETRY_CONFIG`, if
    /// set, then apply environment overrides
    pub fn load() -> Result<Self> {
        let config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::load_from(Utf8Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env_overrides()
    }

    /// Load configuration from a YAML file, without environment overrides
    pub fn load_from(path: &Utf8Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config_not_found(path.as_str()));
        }
        let content = fs::read_to_string(path)?;
        let config = serde_yaml_ng::from_str(&content)?;
        tracing::debug!(path = %path, "loaded retry configuration");
        Ok(config)
    }

    /// Apply `CONVERGE_RETRY_*` environment variable overrides
    pub fn apply_env_overrides(mut self) -> Result<Self> {
        if let Ok(val) = env::var("CONVERGE_RETRY_POLICY") {
            self.default_policy = val.parse()?;
        }

        if let Ok(val) = env::var("CONVERGE_RETRY_ATTEMPTS") {
            self.count.attempts = val.parse().map_err(|_| {
                Error::invalid_config("CONVERGE_RETRY_ATTEMPTS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONVERGE_RETRY_COUNT_WAIT_MS") {
            self.count.wait_ms = val.parse().map_err(|_| {
                Error::invalid_config("CONVERGE_RETRY_COUNT_WAIT_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONVERGE_RETRY_TIMEOUT_MS") {
            self.deadline.timeout_ms = val.parse().map_err(|_| {
                Error::invalid_config("CONVERGE_RETRY_TIMEOUT_MS must be a valid number")
            })?;
        }

        if let Ok(val) = env::var("CONVERGE_RETRY_DEADLINE_WAIT_MS") {
            self.deadline.wait_ms = val.parse().map_err(|_| {
                Error::invalid_config("CONVERGE_RETRY_DEADLINE_WAIT_MS must be a valid number")
            })?;
        }

        Ok(self)
    }

    /// Build a fresh count policy from these settings
    pub fn count_policy(&self) -> CountPolicy {
        CountPolicy::new(
            self.count.attempts,
            Duration::from_millis(self.count.wait_ms),
        )
    }

    /// Build a fresh deadline policy from these settings
    pub fn deadline_policy(&self) -> DeadlinePolicy {
        DeadlinePolicy::new(
            Duration::from_millis(self.deadline.timeout_ms),
            Duration::from_millis(self.deadline.wait_ms),
        )
    }

    /// Build a fresh policy of the configured default kind
    pub fn policy(&self) -> Box<dyn RetryPolicy> {
        match self.default_policy {
            PolicyKind::Count => Box::new(self.count_policy()),
            PolicyKind::Deadline => Box::new(self.deadline_policy()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use serial_test::serial;
    use tempfile::TempDir;

    const OVERRIDE_VARS: [&str; 6] = [
        CONFIG_PATH_ENV,
        "CONVERGE_RETRY_POLICY",
        "CONVERGE_RETRY_ATTEMPTS",
        "CONVERGE_RETRY_COUNT_WAIT_MS",
        "CONVERGE_RETRY_TIMEOUT_MS",
        "CONVERGE_RETRY_DEADLINE_WAIT_MS",
    ];

    fn clear_env() {
        for var in OVERRIDE_VARS {
            env::remove_var(var);
        }
    }

    fn write_config(dir: &TempDir, yaml: &str) -> Utf8PathBuf {
        let path = Utf8PathBuf::from_path_buf(dir.path().join("retry.yaml")).unwrap();
        fs::write(&path, yaml).unwrap();
        path
    }

    #[test]
    fn test_defaults_match_builtin_policies() {
        let config = HarnessConfig::default();
        assert_eq!(config.default_policy, PolicyKind::Deadline);

        let count = config.count_policy();
        assert_eq!(count.count(), 3);
        assert_eq!(count.wait(), Duration::from_millis(25));

        let deadline = config.deadline_policy();
        assert_eq!(deadline.timeout(), Duration::from_secs(1));
        assert_eq!(deadline.wait(), Duration::from_millis(25));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: HarnessConfig = serde_yaml_ng::from_str("count:\n  attempts: 7\n").unwrap();

        assert_eq!(config.count.attempts, 7);
        assert_eq!(config.count.wait_ms, 25);
        assert_eq!(config.deadline, DeadlineSettings::default());
    }

    #[test]
    fn test_yaml_round_trip_uses_kebab_case() {
        let yaml = serde_yaml_ng::to_string(&HarnessConfig::default()).unwrap();

        assert!(yaml.contains("default-policy: deadline"));
        assert!(yaml.contains("wait-ms: 25"));
        assert!(yaml.contains("timeout-ms: 1000"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(
            &dir,
            "default-policy: count\ncount:\n  attempts: 5\n  wait-ms: 0\n",
        );

        let config = HarnessConfig::load_from(&path).unwrap();
        assert_eq!(config.default_policy, PolicyKind::Count);
        assert_eq!(config.count_policy().count(), 5);
    }

    #[test]
    fn test_load_from_missing_file() {
        let err = HarnessConfig::load_from(Utf8Path::new("/nonexistent/retry.yaml")).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_load_from_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "count: [not, a, map]\n");

        let err = HarnessConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::YamlParse(_)));
    }

    #[test]
    fn test_policy_kind_parsing() {
        assert_eq!("count".parse::<PolicyKind>().unwrap(), PolicyKind::Count);
        assert_eq!(" Deadline ".parse::<PolicyKind>().unwrap(), PolicyKind::Deadline);
        assert!("backoff".parse::<PolicyKind>().is_err());
        assert_eq!(PolicyKind::Count.to_string(), "count");
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        clear_env();
        env::set_var("CONVERGE_RETRY_POLICY", "count");
        env::set_var("CONVERGE_RETRY_ATTEMPTS", "9");
        env::set_var("CONVERGE_RETRY_TIMEOUT_MS", "4000");

        let config = HarnessConfig::load().unwrap();
        clear_env();

        assert_eq!(config.default_policy, PolicyKind::Count);
        assert_eq!(config.count.attempts, 9);
        assert_eq!(config.deadline.timeout_ms, 4000);
        assert_eq!(config.deadline.wait_ms, 25);
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "count:\n  attempts: 5\n  wait-ms: 10\n");
        env::set_var(CONFIG_PATH_ENV, path.as_str());
        env::set_var("CONVERGE_RETRY_COUNT_WAIT_MS", "1");

        let config = HarnessConfig::load().unwrap();
        clear_env();

        assert_eq!(config.count.attempts, 5);
        assert_eq!(config.count.wait_ms, 1);
    }

    #[test]
    #[serial]
    fn test_invalid_env_number() {
        clear_env();
        env::set_var("CONVERGE_RETRY_DEADLINE_WAIT_MS", "soon");

        let err = HarnessConfig::load().unwrap_err();
        clear_env();

        assert!(matches!(err, Error::InvalidConfig { .. }));
        assert!(err.to_string().contains("CONVERGE_RETRY_DEADLINE_WAIT_MS"));
    }
}
