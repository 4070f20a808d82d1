use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, path::PathBuf, time::Duration};

use crate::{provider::ProviderId, render::Language};

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Credentials for a single provider. Which fields are needed depends on
/// the provider: OpenWeatherMap takes an API key, Meteomatics a login.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Credentials in the shape the provider expects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderCredentials {
    ApiKey(String),
    Login { username: String, password: String },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeocodingConfig {
    /// Optional ArcGIS token; the locality search works without one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Optional default provider id, e.g. "openweathermap" or "meteomatics".
    #[serde(default)]
    pub default_provider: Option<String>,

    #[serde(default)]
    pub language: Language,

    /// Where the weather cache lives. Defaults to the platform data dir.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Example TOML:
    /// [providers.openweathermap]
    /// api_key = "..."
    ///
    /// [providers.meteomatics]
    /// username = "..."
    /// password = "..."
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub geocoding: GeocodingConfig,
}

impl Config {
    /// Return the default provider as a strongly-typed ProviderId.
    pub fn default_provider_id(&self) -> Result<ProviderId> {
        let s = self.default_provider.as_ref().ok_or_else(|| {
            anyhow::anyhow!(
                "No default provider configured.\n\
                 Hint: run `meteobot configure <provider>` (e.g. `meteobot configure openweathermap`) first."
            )
        })?;

        ProviderId::try_from(s.as_str())
    }

    /// Store default provider as string.
    pub fn set_default_provider(&mut self, id: ProviderId) {
        self.default_provider = Some(id.as_str().to_string());
    }

    /// Load config from the platform location, or an empty default on first run.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(cfg)
    }

    /// Save config to the platform location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file_path()?)
    }

    /// Save config to `path`, creating parent directories as needed.
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

    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "meteobot", "meteobot")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Path to the weather cache database, creating its directory.
    pub fn cache_file_path(&self) -> Result<PathBuf> {
        let path = match &self.cache_path {
            Some(path) => path.clone(),
            None => Self::project_dirs()?.data_dir().join("weather_cache.db"),
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create cache directory: {}", parent.display())
            })?;
        }

        Ok(path)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS))
    }

    /// Override file values with environment variables, looked up through
    /// `lookup` (normally `std::env::var`).
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let owm = ProviderId::OpenWeatherMap.as_str().to_string();
        let meteomatics = ProviderId::Meteomatics.as_str().to_string();

        if let Some(key) = lookup("OPEN_WEATHER_API_KEY") {
            self.providers.entry(owm).or_default().api_key = Some(key);
        }
        if let Some(username) = lookup("METEOMATICS_USERNAME") {
            self.providers.entry(meteomatics.clone()).or_default().username = Some(username);
        }
        if let Some(password) = lookup("METEOMATICS_PASSWORD") {
            self.providers.entry(meteomatics).or_default().password = Some(password);
        }
        if let Some(key) = lookup("GEOCODING_API_KEY") {
            self.geocoding.api_key = Some(key);
        }
        if let Some(path) = lookup("METEOBOT_CACHE_PATH") {
            self.cache_path = Some(PathBuf::from(path));
        }
    }

    /// Convenience helper: set/replace a provider API key and set it as the
    /// default provider if none is set yet.
    pub fn upsert_provider_api_key(&mut self, provider_id: ProviderId, api_key: String) {
        self.providers.entry(provider_id.as_str().to_string()).or_default().api_key = Some(api_key);
        self.default_if_unset(provider_id);
    }

    /// Same as [`Config::upsert_provider_api_key`] for username/password providers.
    pub fn upsert_provider_login(&mut self, provider_id: ProviderId, username: String, password: String) {
        let entry = self.providers.entry(provider_id.as_str().to_string()).or_default();
        entry.username = Some(username);
        entry.password = Some(password);
        self.default_if_unset(provider_id);
    }

    fn default_if_unset(&mut self, provider_id: ProviderId) {
        if self.default_provider.is_none() {
            self.default_provider = Some(provider_id.to_string());
        }
    }

    /// Returns credentials for a provider, if all the fields it needs are present.
    pub fn provider_credentials(&self, provider_id: ProviderId) -> Option<ProviderCredentials> {
        let cfg = self.providers.get(provider_id.as_str())?;

        match provider_id {
            ProviderId::OpenWeatherMap => cfg.api_key.clone().map(ProviderCredentials::ApiKey),
            ProviderId::Meteomatics => match (&cfg.username, &cfg.password) {
                (Some(username), Some(password)) => Some(ProviderCredentials::Login {
                    username: username.clone(),
                    password: password.clone(),
                }),
                _ => None,
            },
        }
    }

    pub fn is_provider_configured(&self, provider_id: ProviderId) -> bool {
        self.provider_credentials(provider_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderId;

    #[test]
    fn default_provider_id_errors_when_not_set() {
        let cfg = Config::default();
        let err = cfg.default_provider_id().unwrap_err();

        assert!(err.to_string().contains("No default provider configured"));
    }

    #[test]
    fn set_api_key_and_default_for_provider() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::OpenWeatherMap);

        assert_eq!(
            cfg.provider_credentials(ProviderId::OpenWeatherMap),
            Some(ProviderCredentials::ApiKey("OPEN_KEY".into()))
        );
        assert!(cfg.is_provider_configured(ProviderId::OpenWeatherMap));
    }

    #[test]
    fn upsert_does_not_override_existing_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());
        cfg.upsert_provider_login(ProviderId::Meteomatics, "user".into(), "pass".into());

        let default = cfg.default_provider_id().expect("default provider must exist");

        assert_eq!(default, ProviderId::OpenWeatherMap);
        assert!(cfg.is_provider_configured(ProviderId::OpenWeatherMap));
        assert!(cfg.is_provider_configured(ProviderId::Meteomatics));
    }

    #[test]
    fn set_default_provider_overrides_default() {
        let mut cfg = Config::default();

        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());
        cfg.upsert_provider_login(ProviderId::Meteomatics, "user".into(), "pass".into());

        cfg.set_default_provider(ProviderId::Meteomatics);

        let default = cfg.default_provider_id().expect("default provider must exist");
        assert_eq!(default, ProviderId::Meteomatics);
    }

    #[test]
    fn meteomatics_needs_both_username_and_password() {
        let mut cfg = Config::default();
        cfg.apply_env(|name| (name == "METEOMATICS_USERNAME").then(|| "user".to_string()));

        assert!(!cfg.is_provider_configured(ProviderId::Meteomatics));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "FROM_FILE".into());

        cfg.apply_env(|name| match name {
            "OPEN_WEATHER_API_KEY" => Some("FROM_ENV".to_string()),
            "METEOMATICS_USERNAME" => Some("user".to_string()),
            "METEOMATICS_PASSWORD" => Some("pass".to_string()),
            "METEOBOT_CACHE_PATH" => Some("/tmp/meteobot.db".to_string()),
            _ => None,
        });

        assert_eq!(
            cfg.provider_credentials(ProviderId::OpenWeatherMap),
            Some(ProviderCredentials::ApiKey("FROM_ENV".into()))
        );
        assert!(cfg.is_provider_configured(ProviderId::Meteomatics));
        assert_eq!(cfg.cache_path, Some(PathBuf::from("/tmp/meteobot.db")));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "OPEN_KEY".into());
        cfg.language = Language::English;
        cfg.request_timeout_secs = Some(3);
        cfg.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.default_provider_id().unwrap(), ProviderId::OpenWeatherMap);
        assert_eq!(loaded.language, Language::English);
        assert_eq!(loaded.request_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();

        assert!(cfg.providers.is_empty());
        assert_eq!(cfg.language, Language::Ukrainian);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));
    }

    #[test]
    fn cache_path_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            cache_path: Some(dir.path().join("data").join("weather_cache.db")),
            ..Config::default()
        };

        let path = cfg.cache_file_path().unwrap();
        assert!(path.parent().unwrap().is_dir());
    }
}
