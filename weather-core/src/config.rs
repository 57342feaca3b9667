use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::ProviderId;

pub const GEOCODE_KEY_ENV: &str = "GOOGLE_GEOCODE_KEY";

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Environment variable holding the primary API key for a provider.
pub fn env_key_for(id: ProviderId) -> &'static str {
    match id {
        ProviderId::OpenWeatherMap => "OPEN_WEATHER_MAP_KEY",
        ProviderId::WeatherUnderground => "WEATHER_UNDERGROUND_KEY",
        ProviderId::DarkSky => "DARK_SKY_KEY",
    }
}

/// Credentials for a single provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,

    /// Second credential for providers that resolve coordinates first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geocode_key: Option<String>,
}

impl ProviderConfig {
    pub fn with_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            geocode_key: None,
        }
    }
}

/// HTTP service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Per-provider time limit. Absent means no limit beyond the transport's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            provider_timeout_secs: None,
        }
    }
}

fn default_listen_addr() -> String {
    DEFAULT_LISTEN_ADDR.to_string()
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    /// Example TOML:
    /// [providers.openweathermap]
    /// api_key = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Config {
    /// Load config from the platform location, or an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            // First run: no config file, return empty.
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location, creating parent directories as needed.
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
        let dirs = ProjectDirs::from("dev", "weather-task", "weather-cli")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Overlay credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Overlay credentials from `lookup`. Non-empty values win over the file;
    /// a geocoding key alone does not enable a provider.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        for &id in ProviderId::all() {
            if let Some(key) = lookup(env_key_for(id)) {
                self.providers
                    .entry(id.as_str().to_string())
                    .and_modify(|cfg| cfg.api_key = key.clone())
                    .or_insert_with(|| ProviderConfig::with_key(key.clone()));
            }
        }

        if let Some(geocode_key) = lookup(GEOCODE_KEY_ENV) {
            for &id in ProviderId::all().iter().filter(|id| id.needs_geocode_key()) {
                if let Some(cfg) = self.providers.get_mut(id.as_str()) {
                    cfg.geocode_key = Some(geocode_key.clone());
                }
            }
        }
    }

    pub fn provider_config(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.get(id.as_str())
    }

    /// Set/replace a provider's credentials.
    pub fn upsert_provider(&mut self, provider_id: ProviderId, provider: ProviderConfig) {
        self.providers.insert(provider_id.as_str().to_string(), provider);
    }

    /// Returns API key for a provider, if present.
    pub fn provider_api_key(&self, provider_id: ProviderId) -> Option<&str> {
        self.provider_config(provider_id).map(|cfg| cfg.api_key.as_str())
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_api_key(provider_id).is_some()
    }

    /// Configured providers in `ProviderId::all()` order.
    pub fn configured_providers(&self) -> Vec<ProviderId> {
        ProviderId::all()
            .iter()
            .copied()
            .filter(|id| self.is_provider_configured(*id))
            .collect()
    }

    pub fn provider_timeout(&self) -> Option<Duration> {
        self.server.provider_timeout_secs.map(Duration::from_secs)
    }
}
