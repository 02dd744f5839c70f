//! Configuration loading.
//!
//! Layered figment: compiled defaults, then `pane.toml`, then `PANE_*`
//! environment variables. Per-domain override descriptors ride along in the
//! same file, so adding a known target is a config edit, not a code change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::enroll::{EnrollSettings, OverrideDescriptor};
use crate::error::{PaneError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub enroll: EnrollConfig,
    pub alias: AliasConfig,
    pub card: CardConfig,
    /// Per-domain override descriptors (see `enroll::flavor`).
    pub overrides: Vec<OverrideDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollConfig {
    pub navigation_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub screenshot_dir: PathBuf,
    pub headless: bool,
}

impl Default for EnrollConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_secs: 30,
            settle_delay_ms: 4000,
            screenshot_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pane")
                .join("screenshots"),
            headless: true,
        }
    }
}

impl EnrollConfig {
    pub fn settings(&self) -> EnrollSettings {
        EnrollSettings {
            navigation_timeout: Duration::from_secs(self.navigation_timeout_secs),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
            screenshot_dir: self.screenshot_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub base_url: String,
    pub api_key: String,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.alias.example".to_string(),
            api_key: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    pub base_url: String,
    pub api_key: String,
    pub spend_limit_cents: u64,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.card.example".to_string(),
            api_key: String::new(),
            spend_limit_cents: 100,
        }
    }
}

impl Config {
    /// Default config file location under the platform config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pane")
            .join("pane.toml")
    }

    /// Load configuration, layering `path` (or the default location) and
    /// `PANE_`-prefixed environment variables over compiled defaults.
    /// A missing file is fine; defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path.map(Path::to_path_buf).unwrap_or_else(Self::default_path);
        Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed("PANE_").split("__"))
            .extract()
            .map_err(|e| PaneError::Config(e.to_string()))
    }

    /// Write the compiled defaults to `path` as a starting point.
    pub fn write_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&Config::default())
            .map_err(|e| PaneError::Config(e.to_string()))?;
        std::fs::write(path, raw)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.enroll.navigation_timeout_secs, 30);
        assert!(config.enroll.headless);
        assert!(config.overrides.is_empty());
        let settings = config.enroll.settings();
        assert_eq!(settings.settle_delay, Duration::from_millis(4000));
    }

    #[test]
    fn toml_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pane.toml");
        std::fs::write(
            &path,
            r##"
            [enroll]
            navigation_timeout_secs = 5
            headless = false

            [[overrides]]
            domain = "signup.test"
            submit_selector = "#go"
            "##,
        )
        .unwrap();

        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.enroll.navigation_timeout_secs, 5);
        assert!(!config.enroll.headless);
        assert_eq!(config.overrides.len(), 1);
        assert_eq!(config.overrides[0].domain, "signup.test");
    }

    #[test]
    fn write_default_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pane.toml");
        Config::write_default(&path).unwrap();
        let config = Config::load(Some(&path)).unwrap();
        assert_eq!(config.card.spend_limit_cents, 100);
    }
}
