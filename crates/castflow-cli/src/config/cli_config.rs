//! CLI configuration file support
//!
//! Loads configuration from ~/.config/castflow/config.toml

use castflow_browser::{PlaywrightConfig, Viewport};
use castflow_core::{RunSettings, Timings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// CLI configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub browser: BrowserConfig,
    /// Overrides of individual wait budgets and poll settings
    #[serde(default)]
    pub timings: Timings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub headless: bool,
    /// Node.js executable (defaults to `node` on PATH)
    pub node_binary: Option<String>,
    /// Directory `playwright` is installed in
    pub driver_dir: Option<PathBuf>,
    pub viewport: Option<Viewport>,
}

impl CliConfig {
    /// Load configuration from default path
    pub fn load() -> Self {
        Self::load_from_path(Self::default_path())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: Option<PathBuf>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => Self::parse(&path, &content),
            Err(error) => {
                warn!(path = %path.display(), %error, "Failed to read config, using defaults");
                Self::default()
            }
        }
    }

    fn parse(path: &Path, content: &str) -> Self {
        toml::from_str(content).unwrap_or_else(|error| {
            warn!(path = %path.display(), %error, "Invalid config, using defaults");
            Self::default()
        })
    }

    /// Get the default configuration file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("castflow").join("config.toml"))
    }

    /// Settings for every job of this invocation. `--headless` only ever
    /// turns headless mode on.
    pub fn run_settings(&self, headless_flag: bool) -> RunSettings {
        RunSettings {
            headless: headless_flag || self.browser.headless,
            viewport: self.browser.viewport,
            timings: self.timings.clone(),
        }
    }

    pub fn playwright_config(&self) -> PlaywrightConfig {
        let mut config = PlaywrightConfig::default();
        if let Some(node_binary) = &self.browser.node_binary {
            config.node_binary = node_binary.clone();
        }
        config.driver_dir = self.browser.driver_dir.clone();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = CliConfig::load_from_path(Some(dir.path().join("absent.toml")));
        assert!(!config.browser.headless);
        assert_eq!(config.timings, Timings::default());
    }

    #[test]
    fn test_partial_timings_override() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[browser]
headless = true
node_binary = "/opt/node/bin/node"

[browser.viewport]
width = 1280
height = 720

[timings]
poll_interval_ms = 500
"#,
        )
        .unwrap();

        let config = CliConfig::load_from_path(Some(path));
        assert_eq!(config.timings.poll_interval_ms, 500);
        assert_eq!(
            config.timings.navigation_ms,
            Timings::default().navigation_ms
        );

        let settings = config.run_settings(false);
        assert!(settings.headless);
        assert_eq!(
            settings.viewport,
            Some(Viewport {
                width: 1280,
                height: 720
            })
        );
        assert_eq!(config.playwright_config().node_binary, "/opt/node/bin/node");
    }

    #[test]
    fn test_invalid_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[browser\nheadless = ").unwrap();
        let config = CliConfig::load_from_path(Some(path));
        assert!(!config.browser.headless);
        assert!(config.run_settings(true).headless);
    }
}
