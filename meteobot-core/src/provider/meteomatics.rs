use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

use crate::{
    condition::WeatherSummary,
    model::{ForecastPeriod, LocationKey, WeatherReport},
    provider::{ProviderError, ProviderId, success_body},
    units::{WindDirection, hpa_to_mm_hg, math_round},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.meteomatics.com";

const WIND_SPEED: &str = "wind_speed_10m:ms";
const WIND_DIR: &str = "wind_dir_10m:d";
const TEMPERATURE: &str = "t_2m:C";
const PRESSURE: &str = "msl_pressure:hPa";
const SYMBOL: &str = "weather_symbol_1h:idx";
const PRECIPITATION: &str = "precip_24h:mm";
const MAX_TEMPERATURE: &str = "t_max_2m_24h:C";
const MIN_TEMPERATURE: &str = "t_min_2m_24h:C";
const HUMIDITY: &str = "relative_humidity_2m:p";

const PARAMETERS: [&str; 9] = [
    WIND_SPEED,
    WIND_DIR,
    TEMPERATURE,
    PRESSURE,
    SYMBOL,
    PRECIPITATION,
    MAX_TEMPERATURE,
    MIN_TEMPERATURE,
    HUMIDITY,
];

/// Meteomatics marks values it could not compute with this number.
const INVALID_VALUE: f64 = -999.0;

/// Meteomatics time-series API. Only current conditions are supported.
#[derive(Debug, Clone)]
pub struct MeteomaticsProvider {
    username: String,
    password: String,
    base_url: String,
    http: Client,
}

impl MeteomaticsProvider {
    pub fn new(username: String, password: String, http: Client) -> Self {
        Self {
            username,
            password,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_current(&self, location: &LocationKey) -> Result<WeatherReport, ProviderError> {
        let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
        let url = format!(
            "{}/{now}/{}/{},{}/json",
            self.base_url,
            PARAMETERS.join(","),
            location.latitude(),
            location.longitude(),
        );
        debug!(%location, "requesting Meteomatics current conditions");

        let res = self
            .http
            .get(&url)
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|source| ProviderError::Transport { provider: self.id(), source })?;

        let body = success_body(self.id(), res).await?;

        let parsed: MmResponse =
            serde_json::from_str(&body).map_err(|e| self.payload_error(e.to_string()))?;

        if let Some(status) = parsed.status.as_deref().filter(|s| *s != "OK") {
            return Err(self.payload_error(format!("response status is '{status}'")));
        }

        Ok(current_report(&parsed))
    }

    fn payload_error(&self, reason: impl Into<String>) -> ProviderError {
        ProviderError::Payload {
            provider: self.id(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MmValue {
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct MmCoordinates {
    #[serde(default)]
    dates: Vec<MmValue>,
}

#[derive(Debug, Deserialize)]
struct MmParameter {
    parameter: String,
    #[serde(default)]
    coordinates: Vec<MmCoordinates>,
}

#[derive(Debug, Deserialize)]
struct MmResponse {
    status: Option<String>,
    #[serde(default)]
    data: Vec<MmParameter>,
}

impl MmResponse {
    fn first_value(&self) -> Option<&MmValue> {
        self.data
            .iter()
            .flat_map(|p| p.coordinates.first())
            .flat_map(|c| c.dates.first())
            .next()
    }

    /// First valid value of every parameter.
    fn values(&self) -> HashMap<&str, f64> {
        self.data
            .iter()
            .filter_map(|p| {
                let value = p.coordinates.first()?.dates.first()?.value?;
                (value != INVALID_VALUE).then_some((p.parameter.as_str(), value))
            })
            .collect()
    }
}

fn current_report(parsed: &MmResponse) -> WeatherReport {
    let values = parsed.values();
    let get = |name: &str| values.get(name).copied();

    let observed = parsed
        .first_value()
        .and_then(|v| DateTime::parse_from_rfc3339(&v.date).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    WeatherReport {
        observed_at: observed.timestamp(),
        date: observed.format("%Y-%m-%d %H:%M").to_string(),
        summary: get(SYMBOL).and_then(|code| WeatherSummary::from_meteomatics_code(code as i64)),
        temperature: get(TEMPERATURE).map(math_round),
        max_temperature: get(MAX_TEMPERATURE).map(math_round),
        min_temperature: get(MIN_TEMPERATURE).map(math_round),
        wind_speed: get(WIND_SPEED),
        wind_direction: WindDirection::from_bearing(get(WIND_DIR)),
        pressure_mm_hg: get(PRESSURE).map(hpa_to_mm_hg),
        precipitation: get(PRECIPITATION),
        humidity: get(HUMIDITY).map(|h| h.clamp(0.0, 100.0).round() as u8),
        sunrise: None,
        sunset: None,
    }
}

#[async_trait]
impl WeatherProvider for MeteomaticsProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Meteomatics
    }

    async fn fetch(
        &self,
        location: &LocationKey,
        period: ForecastPeriod,
    ) -> Result<Vec<WeatherReport>, ProviderError> {
        match period {
            ForecastPeriod::Current => Ok(vec![self.fetch_current(location).await?]),
            ForecastPeriod::Today | ForecastPeriod::FiveDays => Err(ProviderError::NotImplemented {
                provider: self.id(),
                period,
            }),
        }
    }
}
