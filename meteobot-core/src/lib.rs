//! Core library for the `meteobot` weather assistant.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - Weather providers behind one trait, plus the ArcGIS geocoder
//! - A SQLite response cache with a one hour freshness window
//! - The resolver that decides between cache and provider
//! - Message rendering in Ukrainian and English
//!
//! It is used by `meteobot-cli`, but a chat front-end only needs
//! [`WeatherResolver::compile_weather_output`].

pub mod cache;
pub mod condition;
pub mod config;
pub mod freshness;
pub mod geocoding;
pub mod model;
pub mod provider;
pub mod render;
pub mod resolver;
pub mod units;

pub use cache::{CacheError, CacheKey, WeatherCache, WeatherRecord};
pub use config::{Config, ProviderConfig};
pub use geocoding::{ArcGisGeocoder, Geocoder, GeocodingError, LocationPoint};
pub use model::{ForecastPeriod, LocationKey, WeatherReport};
pub use provider::{ProviderError, ProviderId, ProviderSet, WeatherProvider};
pub use render::Language;
pub use resolver::{ReportSource, Resolution, ResolveError, WeatherResolver};
