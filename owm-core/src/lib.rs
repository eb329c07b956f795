//! Core library for the OpenWeatherMap connection adapter.
//!
//! This crate defines:
//! - Secrets & credential handling (AppID resolution)
//! - The [`WeatherConnection`] adapter over the OpenWeatherMap REST API
//! - Response caching keyed by the resolved call parameters
//!
//! It is used by `owm-cli`, but can also be embedded in dashboards or services.

pub mod cache;
pub mod connection;
pub mod error;
pub mod model;
pub mod secrets;

pub use cache::{CacheKey, MemoryCache, ResponseCache};
pub use connection::{ConnectOptions, ForecastOpts, QueryOpts, WeatherConnection};
pub use error::WeatherError;
pub use model::{ForecastKind, Location, Units};
pub use secrets::Secrets;
