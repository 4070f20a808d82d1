use crate::{
    Config, ForecastPeriod, LocationKey, WeatherReport,
    config::ProviderCredentials,
    provider::{meteomatics::MeteomaticsProvider, openweathermap::OpenWeatherMapProvider},
};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{collections::HashMap, convert::TryFrom, fmt::Debug, sync::Arc};
use tracing::debug;

pub mod meteomatics;
pub mod openweathermap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeatherMap,
    Meteomatics,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "openweathermap",
            ProviderId::Meteomatics => "meteomatics",
        }
    }

    /// Name shown to users in menus.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenWeatherMap => "Openweathermap",
            ProviderId::Meteomatics => "Meteomatics",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeatherMap, ProviderId::Meteomatics]
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.trim().to_lowercase();

        match lower.as_str() {
            "openweathermap" => Ok(ProviderId::OpenWeatherMap),
            "meteomatics" => Ok(ProviderId::Meteomatics),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweathermap, meteomatics."
            )),
        }
    }
}

/// Everything that can go wrong while talking to a weather provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Failed to reach {provider}: {source}")]
    Transport {
        provider: ProviderId,
        #[source]
        source: reqwest::Error,
    },
    #[error("{provider} request failed with status {status}: {body}")]
    Status {
        provider: ProviderId,
        status: StatusCode,
        body: String,
    },
    #[error("Failed to parse {provider} response: {reason}")]
    Payload { provider: ProviderId, reason: String },
    #[error("{period} forecast is not implemented for {provider}")]
    NotImplemented {
        provider: ProviderId,
        period: ForecastPeriod,
    },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::Transport { provider, .. }
            | ProviderError::Status { provider, .. }
            | ProviderError::Payload { provider, .. }
            | ProviderError::NotImplemented { provider, .. } => *provider,
        }
    }
}

#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    fn id(&self) -> ProviderId;

    /// One report for `Current` and `Today`, one per day for `FiveDays`.
    async fn fetch(
        &self,
        location: &LocationKey,
        period: ForecastPeriod,
    ) -> Result<Vec<WeatherReport>, ProviderError>;
}

/// Construct a provider from config and explicit ProviderId.
pub fn provider_from_config(
    id: ProviderId,
    config: &Config,
    http: Client,
) -> anyhow::Result<Arc<dyn WeatherProvider>> {
    let credentials = config.provider_credentials(id).ok_or_else(|| {
        anyhow::anyhow!(
            "No credentials configured for provider '{id}'.\n\
                 Hint: run `meteobot configure {id}` and enter them."
        )
    })?;

    let provider: Arc<dyn WeatherProvider> = match (id, credentials) {
        (ProviderId::OpenWeatherMap, ProviderCredentials::ApiKey(api_key)) => {
            Arc::new(OpenWeatherMapProvider::new(api_key, http))
        }
        (ProviderId::Meteomatics, ProviderCredentials::Login { username, password }) => {
            Arc::new(MeteomaticsProvider::new(username, password, http))
        }
        (id, _) => {
            return Err(anyhow::anyhow!("Credentials for provider '{id}' have the wrong shape"));
        }
    };

    Ok(provider)
}

/// The providers a resolver may dispatch to, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct ProviderSet {
    providers: HashMap<ProviderId, Arc<dyn WeatherProvider>>,
}

impl ProviderSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every provider that has credentials in `config`, sharing one HTTP
    /// client. Providers without credentials are skipped.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(config.request_timeout()).build()?;
        let mut set = Self::new();

        for id in ProviderId::all() {
            match provider_from_config(*id, config, http.clone()) {
                Ok(provider) => set.insert(provider),
                Err(err) => debug!(provider = %id, "provider disabled: {err}"),
            }
        }

        Ok(set)
    }

    pub fn with(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.insert(provider);
        self
    }

    pub fn insert(&mut self, provider: Arc<dyn WeatherProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn get(&self, id: ProviderId) -> Option<&Arc<dyn WeatherProvider>> {
        self.providers.get(&id)
    }

    pub fn contains(&self, id: ProviderId) -> bool {
        self.providers.contains_key(&id)
    }
}

/// Read the body of `res`, turning a non-success status into an error.
pub(crate) async fn success_body(
    provider: ProviderId,
    res: reqwest::Response,
) -> Result<String, ProviderError> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ProviderError::Transport { provider, source })?;

    if !status.is_success() {
        return Err(ProviderError::Status {
            provider,
            status,
            body: truncate_body(&body),
        });
    }

    Ok(body)
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX {
        let cut = (0..=MAX).rev().find(|i| body.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn provider_id_parse_ignores_case() {
        assert_eq!(ProviderId::try_from("Openweathermap").unwrap(), ProviderId::OpenWeatherMap);
        assert_eq!(ProviderId::try_from(" METEOMATICS ").unwrap(), ProviderId::Meteomatics);
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("sinoptik").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn provider_from_config_errors_when_missing_credentials() {
        let cfg = Config::default();
        let err = provider_from_config(ProviderId::OpenWeatherMap, &cfg, Client::new()).unwrap_err();
        assert!(err.to_string().contains("No credentials configured for provider"));
    }

    #[test]
    fn provider_set_only_holds_configured_providers() {
        let mut cfg = Config::default();
        cfg.upsert_provider_api_key(ProviderId::OpenWeatherMap, "KEY".to_string());

        let set = ProviderSet::from_config(&cfg).unwrap();
        assert!(set.contains(ProviderId::OpenWeatherMap));
        assert!(!set.contains(ProviderId::Meteomatics));
    }

    #[test]
    fn provider_set_builds_meteomatics_from_login() {
        let mut cfg = Config::default();
        cfg.upsert_provider_login(ProviderId::Meteomatics, "user".into(), "secret".into());

        let set = ProviderSet::from_config(&cfg).unwrap();
        let provider = set.get(ProviderId::Meteomatics).expect("meteomatics configured");
        assert_eq!(provider.id(), ProviderId::Meteomatics);
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let body = "й".repeat(150);
        let truncated = truncate_body(&body);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 203);
    }
}
