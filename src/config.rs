use crate::{browser::LaunchOptions,
            error::{BrowserError, Result},
            runtime::ExecutionMode};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

/// Settings for a [`Scraper`](crate::Scraper) and its session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// How operational failures are surfaced (default: strict)
    pub mode: ExecutionMode,

    /// Default wait bound for each operation, in milliseconds
    pub timeout_ms: u64,

    /// How long `start()` waits for the worker loop to become ready
    pub startup_timeout_ms: u64,

    /// How long `stop()` waits for the worker thread to exit
    pub shutdown_timeout_ms: u64,

    pub launch: LaunchOptions,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Strict,
            timeout_ms: 30_000,
            startup_timeout_ms: 30_000,
            shutdown_timeout_ms: 5_000,
            launch: LaunchOptions::default(),
        }
    }
}

impl ScraperConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON or YAML file, chosen by extension. Missing fields take defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .map_err(|e| BrowserError::InvalidConfig(format!("Cannot read {}: {}", path.display(), e)))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase);
        let config = match extension.as_deref() {
            Some("json") => serde_json::from_str(&raw).map_err(|e| BrowserError::InvalidConfig(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&raw).map_err(|e| BrowserError::InvalidConfig(e.to_string()))?
            }
            _ => {
                return Err(BrowserError::InvalidConfig(format!(
                    "Unsupported config format: {} (expected .json, .yaml or .yml)",
                    path.display()
                )));
            }
        };

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Shorthand for `mode(ExecutionMode::Resilient)`
    pub fn resilient(self) -> Self {
        self.mode(ExecutionMode::Resilient)
    }

    pub fn timeout_ms(mut self, millis: u64) -> Self {
        self.timeout_ms = millis;
        self
    }

    pub fn startup_timeout_ms(mut self, millis: u64) -> Self {
        self.startup_timeout_ms = millis;
        self
    }

    pub fn shutdown_timeout_ms(mut self, millis: u64) -> Self {
        self.shutdown_timeout_ms = millis;
        self
    }

    pub fn launch(mut self, launch: LaunchOptions) -> Self {
        self.launch = launch;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = ScraperConfig::default();
        assert_eq!(config.mode, ExecutionMode::Strict);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.shutdown_timeout_ms, 5_000);
        assert!(config.launch.headless);
    }

    #[test]
    fn test_builder() {
        let config = ScraperConfig::new().resilient().timeout_ms(2_000).launch(LaunchOptions::new().headless(false));
        assert_eq!(config.mode, ExecutionMode::Resilient);
        assert_eq!(config.timeout_ms, 2_000);
        assert!(!config.launch.headless);
    }

    #[test]
    fn test_from_yaml_file() {
        let file = write_temp(
            ".yaml",
            "mode: resilient\ntimeout_ms: 3000\nlaunch:\n  headless: false\n  slow_mo_ms: 500\n",
        );

        let config = ScraperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, ExecutionMode::Resilient);
        assert_eq!(config.timeout_ms, 3000);
        assert_eq!(config.startup_timeout_ms, 30_000);
        assert!(!config.launch.headless);
        assert_eq!(config.launch.slow_mo_ms, 500);
    }

    #[test]
    fn test_from_json_file() {
        let file = write_temp(".json", r#"{ "mode": "strict", "shutdown_timeout_ms": 250 }"#);

        let config = ScraperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.mode, ExecutionMode::Strict);
        assert_eq!(config.shutdown_timeout_ms, 250);
    }

    #[test]
    fn test_rejects_unknown_extension() {
        let file = write_temp(".toml", "mode = 'strict'");
        assert!(matches!(ScraperConfig::from_file(file.path()), Err(BrowserError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_mode() {
        let file = write_temp(".json", r#"{ "mode": "sandbox" }"#);
        assert!(matches!(ScraperConfig::from_file(file.path()), Err(BrowserError::InvalidConfig(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = ScraperConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(err.to_string().contains("Cannot read"));
    }
}
