//! Weather fetching and normalization for the dashboard.
//!
//! Supports OpenWeatherMap One Call 3.0 (numeric condition codes) and Home
//! Assistant weather entities (named conditions), normalized into a single
//! [`Weather`] snapshot, with a time-bounded cache in front of the network.

pub mod cache;
pub mod icons;
pub mod provider;
pub mod types;

pub use cache::{CacheLookup, FileCache, TimedCache, WeatherCache};
pub use provider::{fetch_cached, EntityStateClient, OpenWeatherClient, WeatherSource};
pub use types::{Forecast, HourlyForecast, Weather, WeatherError};
