use std::{fmt, str::FromStr};

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::{condition::WeatherSummary, units::WindDirection};

/// Separator between latitude and longitude inside a [`LocationKey`].
pub const LOCATION_SEPARATOR: char = ',';

/// Canonical latitude/longitude pair used as part of the cache key.
///
/// Both coordinates are kept exactly as the decimal strings they were built
/// from. No rounding is applied, so `46.47,30.73` and `46.470,30.73` are two
/// different keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocationKey {
    latitude: String,
    longitude: String,
}

impl LocationKey {
    pub fn new(latitude: impl Into<String>, longitude: impl Into<String>) -> Self {
        Self {
            latitude: latitude.into().trim().to_string(),
            longitude: longitude.into().trim().to_string(),
        }
    }

    /// Build a key from numeric coordinates, using the shortest decimal
    /// representation that round-trips.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude.to_string(), longitude.to_string())
    }

    pub fn latitude(&self) -> &str {
        &self.latitude
    }

    pub fn longitude(&self) -> &str {
        &self.longitude
    }

    /// The string stored in the cache table.
    pub fn as_key(&self) -> String {
        format!("{}{LOCATION_SEPARATOR}{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}

impl FromStr for LocationKey {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = value.split_once(LOCATION_SEPARATOR).ok_or_else(|| {
            anyhow!("Location '{value}' must look like '<latitude>{LOCATION_SEPARATOR}<longitude>'")
        })?;

        for (label, part) in [("latitude", lat), ("longitude", lon)] {
            part.trim()
                .parse::<f64>()
                .map_err(|_| anyhow!("Invalid {label} '{part}' in location '{value}'"))?;
        }

        Ok(Self::new(lat, lon))
    }
}

/// Request granularity. Also the third component of the cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForecastPeriod {
    Current,
    Today,
    FiveDays,
}

impl ForecastPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastPeriod::Current => "current",
            ForecastPeriod::Today => "today",
            ForecastPeriod::FiveDays => "five_days",
        }
    }

    pub const fn all() -> &'static [ForecastPeriod] {
        &[ForecastPeriod::Current, ForecastPeriod::Today, ForecastPeriod::FiveDays]
    }
}

impl fmt::Display for ForecastPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ForecastPeriod {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_lowercase().replace('-', "_").as_str() {
            "current" => Ok(ForecastPeriod::Current),
            "today" => Ok(ForecastPeriod::Today),
            "five_days" => Ok(ForecastPeriod::FiveDays),
            _ => Err(anyhow!(
                "Unknown forecast period '{value}'. Supported periods: current, today, five-days."
            )),
        }
    }
}

/// One observation or forecast day in the provider-independent shape.
///
/// This is what the cache stores (as a JSON array) and what the renderer
/// reads. Everything a provider may omit is an `Option`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    /// Provider timestamp of the observation / forecast day, epoch seconds.
    pub observed_at: i64,
    /// Display date in the location's local time.
    pub date: String,
    pub summary: Option<WeatherSummary>,
    pub temperature: Option<i64>,
    pub max_temperature: Option<i64>,
    pub min_temperature: Option<i64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: WindDirection,
    pub pressure_mm_hg: Option<i64>,
    pub precipitation: Option<f64>,
    pub humidity: Option<u8>,
    pub sunrise: Option<String>,
    pub sunset: Option<String>,
}
