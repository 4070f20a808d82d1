use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
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

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
/// Today plus the next five days.
const FORECAST_DAYS: usize = 6;

#[derive(Debug, Clone)]
pub struct OpenWeatherMapProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherMapProvider {
    pub fn new(api_key: String, http: Client) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn fetch_one_call(&self, location: &LocationKey) -> Result<OwOneCall, ProviderError> {
        let url = format!("{}/data/2.5/onecall", self.base_url);
        debug!(%location, "requesting OpenWeatherMap one call");

        let res = self
            .http
            .get(&url)
            .query(&[
                ("lat", location.latitude()),
                ("lon", location.longitude()),
                ("appid", self.api_key.as_str()),
                ("exclude", "hourly,minutely,alerts"),
                ("units", "metric"),
                ("lang", "en"),
                ("mode", "json"),
            ])
            .send()
            .await
            .map_err(|source| ProviderError::Transport { provider: self.id(), source })?;

        let body = success_body(self.id(), res).await?;

        serde_json::from_str(&body).map_err(|e| self.payload_error(e.to_string()))
    }

    fn payload_error(&self, reason: impl Into<String>) -> ProviderError {
        ProviderError::Payload {
            provider: self.id(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct OwVolume {
    #[serde(rename = "1h")]
    one_hour: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwCurrent {
    dt: i64,
    temp: Option<f64>,
    pressure: Option<f64>,
    humidity: Option<u8>,
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    #[serde(default)]
    weather: Vec<OwCondition>,
    rain: Option<OwVolume>,
    snow: Option<OwVolume>,
}

#[derive(Debug, Deserialize)]
struct OwDailyTemp {
    min: Option<f64>,
    max: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwDaily {
    dt: i64,
    temp: Option<OwDailyTemp>,
    pressure: Option<f64>,
    humidity: Option<u8>,
    wind_speed: Option<f64>,
    wind_deg: Option<f64>,
    sunrise: Option<i64>,
    sunset: Option<i64>,
    #[serde(default)]
    weather: Vec<OwCondition>,
    rain: Option<f64>,
    snow: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OwOneCall {
    #[serde(default)]
    timezone_offset: i32,
    current: Option<OwCurrent>,
    #[serde(default)]
    daily: Vec<OwDaily>,
}

impl OwOneCall {
    fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.timezone_offset).unwrap_or_else(|| Utc.fix())
    }
}

fn summary(conditions: &[OwCondition]) -> Option<WeatherSummary> {
    conditions
        .first()
        .and_then(|c| WeatherSummary::from_openweathermap_code(c.id))
}

/// `a + b`, or `None` when neither is present.
fn total(a: Option<f64>, b: Option<f64>) -> Option<f64> {
    match (a, b) {
        (None, None) => None,
        (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
    }
}

fn local_time(ts: i64, offset: FixedOffset, fmt: &str) -> Option<String> {
    DateTime::from_timestamp(ts, 0).map(|dt| dt.with_timezone(&offset).format(fmt).to_string())
}

fn current_report(current: &OwCurrent, offset: FixedOffset) -> WeatherReport {
    WeatherReport {
        observed_at: current.dt,
        date: local_time(current.dt, offset, "%Y-%m-%d %H:%M").unwrap_or_default(),
        summary: summary(&current.weather),
        temperature: current.temp.map(math_round),
        max_temperature: None,
        min_temperature: None,
        wind_speed: current.wind_speed,
        wind_direction: WindDirection::from_bearing(current.wind_deg),
        pressure_mm_hg: current.pressure.map(hpa_to_mm_hg),
        precipitation: total(
            current.rain.as_ref().and_then(|v| v.one_hour),
            current.snow.as_ref().and_then(|v| v.one_hour),
        ),
        humidity: current.humidity,
        sunrise: current.sunrise.and_then(|ts| local_time(ts, offset, "%Y-%m-%d %H:%M:%S")),
        sunset: current.sunset.and_then(|ts| local_time(ts, offset, "%Y-%m-%d %H:%M:%S")),
    }
}

fn daily_report(day: &OwDaily, offset: FixedOffset) -> WeatherReport {
    WeatherReport {
        observed_at: day.dt,
        date: local_time(day.dt, offset, "%Y-%m-%d").unwrap_or_default(),
        summary: summary(&day.weather),
        temperature: None,
        max_temperature: day.temp.as_ref().and_then(|t| t.max).map(math_round),
        min_temperature: day.temp.as_ref().and_then(|t| t.min).map(math_round),
        wind_speed: day.wind_speed,
        wind_direction: WindDirection::from_bearing(day.wind_deg),
        pressure_mm_hg: day.pressure.map(hpa_to_mm_hg),
        precipitation: total(day.rain, day.snow),
        humidity: day.humidity,
        sunrise: day.sunrise.and_then(|ts| local_time(ts, offset, "%Y-%m-%d %H:%M:%S")),
        sunset: day.sunset.and_then(|ts| local_time(ts, offset, "%Y-%m-%d %H:%M:%S")),
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherMapProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenWeatherMap
    }

    async fn fetch(
        &self,
        location: &LocationKey,
        period: ForecastPeriod,
    ) -> Result<Vec<WeatherReport>, ProviderError> {
        let parsed = self.fetch_one_call(location).await?;
        let offset = parsed.offset();

        match period {
            ForecastPeriod::Current => {
                let current = parsed
                    .current
                    .as_ref()
                    .ok_or_else(|| self.payload_error("response contained no current conditions"))?;
                Ok(vec![current_report(current, offset)])
            }
            ForecastPeriod::Today => {
                let today = parsed
                    .daily
                    .first()
                    .ok_or_else(|| self.payload_error("response contained no daily forecast"))?;
                Ok(vec![daily_report(today, offset)])
            }
            ForecastPeriod::FiveDays => {
                if parsed.daily.is_empty() {
                    return Err(self.payload_error("response contained no daily forecast"));
                }
                Ok(parsed
                    .daily
                    .iter()
                    .take(FORECAST_DAYS)
                    .map(|day| daily_report(day, offset))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenWeatherMapProvider {
        OpenWeatherMapProvider::new("KEY".into(), Client::new()).with_base_url(server.uri())
    }

    fn location() -> LocationKey {
        LocationKey::new("46.4725", "30.7371")
    }

    fn one_call_body() -> serde_json::Value {
        let daily: Vec<serde_json::Value> = (0..8i64)
            .map(|i| {
                json!({
                    "dt": 1652518800 + i * 86400,
                    "sunrise": 1652494869 + i * 86400,
                    "sunset": 1652548046 + i * 86400,
                    "temp": {"day": 20.1, "min": 12.4, "max": 22.5},
                    "pressure": 1000,
                    "humidity": 55,
                    "wind_speed": 4.2,
                    "wind_deg": 359,
                    "weather": [{"id": 501}],
                    "rain": 1.25
                })
            })
            .collect();

        json!({
            "lat": 46.4725,
            "lon": 30.7371,
            "timezone": "Europe/Kiev",
            "timezone_offset": 10800,
            "current": {
                "dt": 1652527777,
                "sunrise": 1652494869,
                "sunset": 1652548046,
                "temp": 21.5,
                "pressure": 1013,
                "humidity": 40,
                "wind_speed": 3.5,
                "wind_deg": 45,
                "weather": [{"id": 800, "main": "Clear", "description": "clear sky"}]
            },
            "daily": daily
        })
    }

    #[tokio::test]
    async fn current_weather_is_parsed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/onecall"))
            .and(query_param("lat", "46.4725"))
            .and(query_param("lon", "30.7371"))
            .and(query_param("appid", "KEY"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .expect(1)
            .mount(&server)
            .await;

        let reports = provider(&server).fetch(&location(), ForecastPeriod::Current).await.unwrap();

        assert_eq!(reports.len(), 1);
        let r = &reports[0];
        assert_eq!(r.observed_at, 1652527777);
        assert_eq!(r.date, "2022-05-14 14:29");
        assert_eq!(r.summary, Some(WeatherSummary::Clear));
        assert_eq!(r.temperature, Some(22));
        assert_eq!(r.pressure_mm_hg, Some(760));
        assert_eq!(r.humidity, Some(40));
        assert_eq!(r.wind_direction, WindDirection::NorthEast);
        assert_eq!(r.sunrise.as_deref(), Some("2022-05-14 05:21:09"));
        assert_eq!(r.precipitation, None);
    }

    #[tokio::test]
    async fn today_uses_first_daily_entry() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .mount(&server)
            .await;

        let reports = provider(&server).fetch(&location(), ForecastPeriod::Today).await.unwrap();

        assert_eq!(reports.len(), 1);
        let r = &reports[0];
        assert_eq!(r.date, "2022-05-14");
        assert_eq!(r.max_temperature, Some(23));
        assert_eq!(r.min_temperature, Some(12));
        assert_eq!(r.temperature, None);
        assert_eq!(r.summary, Some(WeatherSummary::Rain));
        assert_eq!(r.wind_direction, WindDirection::North);
        assert_eq!(r.pressure_mm_hg, Some(750));
        assert_eq!(r.precipitation, Some(1.25));
    }

    #[tokio::test]
    async fn five_days_returns_today_and_five_more() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(one_call_body()))
            .mount(&server)
            .await;

        let reports = provider(&server).fetch(&location(), ForecastPeriod::FiveDays).await.unwrap();

        assert_eq!(reports.len(), FORECAST_DAYS);
        assert_eq!(reports[1].date, "2022-05-15");
    }

    #[tokio::test]
    async fn missing_optional_fields_are_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data/2.5/onecall"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "current": {"dt": 1652527777}
            })))
            .mount(&server)
            .await;

        let reports = provider(&server).fetch(&location(), ForecastPeriod::Current).await.unwrap();

        let r = &reports[0];
        assert_eq!(r.summary, None);
        assert_eq!(r.temperature, None);
        assert_eq!(r.wind_direction, WindDirection::Unknown);
        assert_eq!(r.sunrise, None);
        assert_eq!(r.date, "2022-05-14 11:29");
    }

    #[tokio::test]
    async fn bad_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&location(), ForecastPeriod::Current).await.unwrap_err();

        match err {
            ProviderError::Status { status, body, .. } => {
                assert_eq!(status.as_u16(), 401);
                assert_eq!(body, "Invalid API key");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_json_is_a_payload_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&location(), ForecastPeriod::Current).await.unwrap_err();
        assert!(matches!(err, ProviderError::Payload { provider: ProviderId::OpenWeatherMap, .. }));
    }

    #[tokio::test]
    async fn missing_daily_block_is_a_payload_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"current": {"dt": 1}})))
            .mount(&server)
            .await;

        let err = provider(&server).fetch(&location(), ForecastPeriod::Today).await.unwrap_err();
        assert!(matches!(err, ProviderError::Payload { .. }));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let p = OpenWeatherMapProvider::new("KEY".into(), Client::new()).with_base_url("http://127.0.0.1:9");

        let err = p.fetch(&location(), ForecastPeriod::Current).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport { .. }));
    }
}
