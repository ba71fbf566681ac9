use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    location::{LocationAuthorization, ResolverTimeouts},
    model::{Coordinate, TemperatureUnit},
    weather::request::DEFAULT_BASE_URL,
};

pub const DEFAULT_FALLBACK_LATITUDE: f64 = 23.112650;
pub const DEFAULT_FALLBACK_LONGITUDE: f64 = 72.583618;

/// The coordinate used when the device location is unavailable.
pub fn default_fallback() -> Coordinate {
    Coordinate::new_unchecked(DEFAULT_FALLBACK_LATITUDE, DEFAULT_FALLBACK_LONGITUDE)
}

/// Temperature units: what the service reports and what to show.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitsConfig {
    pub native: TemperatureUnit,
    pub display: TemperatureUnit,
}

impl Default for UnitsConfig {
    fn default() -> Self {
        Self { native: TemperatureUnit::Fahrenheit, display: TemperatureUnit::Celsius }
    }
}

/// Persisted location settings used by the terminal location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LocationConfig {
    /// Last authorization decision.
    pub permission: LocationAuthorization,

    /// Coordinate reported as the device location, if known.
    pub device: Option<Coordinate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub authorization_secs: u64,
    pub location_secs: u64,
    pub http_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { authorization_secs: 60, location_secs: 30, http_secs: 10 }
    }
}

impl TimeoutConfig {
    pub fn resolver(&self) -> ResolverTimeouts {
        ResolverTimeouts {
            authorization: Duration::from_secs(self.authorization_secs),
            location_fix: Duration::from_secs(self.location_secs),
        }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
///
/// [fallback]
/// latitude = 23.11265
/// longitude = 72.583618
///
/// [location]
/// permission = "when_in_use"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,

    /// Overrides [`DEFAULT_BASE_URL`].
    pub base_url: Option<String>,

    pub fallback: Coordinate,
    pub units: UnitsConfig,
    pub location: LocationConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: None,
            fallback: default_fallback(),
            units: UnitsConfig::default(),
            location: LocationConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.api_key = Some(api_key);
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return defaults.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "wherecast", "wherecast")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}
