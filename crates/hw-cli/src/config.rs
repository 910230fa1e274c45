//! Configuration loading and management.

use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use hw_core::InferenceConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Inference thresholds and project timezone.
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("hw.db"),
            inference: InferenceConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    ///
    /// Later sources win: defaults, the platform config file, `config_path`,
    /// then `HW_*` environment variables (`__` separates nested keys, e.g.
    /// `HW_INFERENCE__TIMEZONE`).
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed("HW_").split("__"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for hw.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("hw"))
}

/// Returns the platform-specific data directory for hw.
///
/// On Linux: `~/.local/share/hw`
fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("hw"))
}
