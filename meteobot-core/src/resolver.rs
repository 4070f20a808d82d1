//! Cache-or-fetch orchestration for a single weather request.
//!
//! A request is checked against the cache first. A fresh record is served as
//! is; an absent or stale one is replaced by a provider fetch, and the result
//! is written back stamped with the current time. A failed fetch leaves the
//! cache untouched.

use chrono::Utc;
use tracing::{error, info};

use crate::{
    cache::{CacheError, CacheKey, WeatherCache},
    model::{ForecastPeriod, LocationKey, WeatherReport},
    provider::{ProviderError, ProviderId, ProviderSet},
    render::{Language, failure_message, render_reports},
};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("Unknown weather provider '{0}'")]
    UnknownProvider(String),
    #[error("Weather provider '{0}' has no credentials configured")]
    ProviderNotConfigured(ProviderId),
    #[error("{period} forecast is not implemented for {provider}")]
    NotImplemented {
        provider: ProviderId,
        period: ForecastPeriod,
    },
    #[error(transparent)]
    Provider(ProviderError),
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl From<ProviderError> for ResolveError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotImplemented { provider, period } => {
                ResolveError::NotImplemented { provider, period }
            }
            other => ResolveError::Provider(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportSource {
    Cache,
    Provider,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub reports: Vec<WeatherReport>,
    pub source: ReportSource,
}

/// Shared by every request; wrap it in an `Arc` to hand it to tasks.
#[derive(Debug, Clone)]
pub struct WeatherResolver {
    cache: WeatherCache,
    providers: ProviderSet,
    language: Language,
}

impl WeatherResolver {
    pub fn new(cache: WeatherCache, providers: ProviderSet, language: Language) -> Self {
        Self { cache, providers, language }
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub async fn resolve(
        &self,
        location: &LocationKey,
        provider_name: &str,
        period: ForecastPeriod,
    ) -> Result<Resolution, ResolveError> {
        self.resolve_at(location, provider_name, period, Utc::now().timestamp()).await
    }

    /// [`resolve`](Self::resolve) with an explicit clock, epoch seconds.
    pub async fn resolve_at(
        &self,
        location: &LocationKey,
        provider_name: &str,
        period: ForecastPeriod,
        now: i64,
    ) -> Result<Resolution, ResolveError> {
        let id = ProviderId::try_from(provider_name)
            .map_err(|_| ResolveError::UnknownProvider(provider_name.to_string()))?;
        let provider = self
            .providers
            .get(id)
            .ok_or(ResolveError::ProviderNotConfigured(id))?;

        let key = CacheKey::new(location.clone(), id, period);
        let lookup = self.cache.lookup(&key, now).await?;

        if let (true, Some(record)) = (lookup.fresh, lookup.record.as_ref()) {
            let reports = record.reports().inspect_err(|err| {
                error!(provider = %id, %location, %period, "cached weather is unreadable: {err}");
            })?;
            info!(provider = %id, %location, %period, "serving weather from cache");
            return Ok(Resolution {
                reports,
                source: ReportSource::Cache,
            });
        } else if lookup.record.is_some() {
            info!(provider = %id, %location, %period, "cached weather is stale, refetching");
        } else {
            info!(provider = %id, %location, %period, "no cached weather, fetching");
        }

        let reports = match provider.fetch(location, period).await {
            Ok(reports) => reports,
            Err(err) => {
                error!(provider = %id, %location, %period, "weather fetch failed: {err}");
                return Err(err.into());
            }
        };

        let payload = serde_json::to_string(&reports).map_err(CacheError::from)?;
        self.cache.upsert(&key, &payload, now).await?;

        Ok(Resolution {
            reports,
            source: ReportSource::Provider,
        })
    }

    /// The rendered message for `city_name`, or a user-facing failure text.
    pub async fn compile_weather_output(
        &self,
        location: &LocationKey,
        provider_name: &str,
        period: ForecastPeriod,
        city_name: &str,
    ) -> String {
        match self.resolve(location, provider_name, period).await {
            Ok(resolution) => render_reports(city_name, &resolution.reports, period, self.language),
            Err(err) => failure_message(&err, self.language),
        }
    }
}
