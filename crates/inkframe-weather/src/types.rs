//! Weather payload types and the normalized snapshot model.

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::icons;

/// Weather service errors.
#[derive(Debug, Error)]
pub enum WeatherError {
    /// A field the snapshot cannot be built without was absent upstream.
    #[error("Upstream weather payload missing required field: {0}")]
    MissingField(&'static str),

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Weather API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

// --- Raw OpenWeatherMap One Call 3.0 payload ---

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionTag {
    pub id: i32,
}

#[derive(Debug, Deserialize)]
pub struct OneCallCurrent {
    pub temp: f64,
}

#[derive(Debug, Deserialize)]
pub struct OneCallTemp {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Deserialize)]
pub struct OneCallHourly {
    pub dt: i64,
    pub temp: f64,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
}

#[derive(Debug, Deserialize)]
pub struct OneCallDaily {
    pub dt: i64,
    pub temp: OneCallTemp,
    #[serde(default)]
    pub weather: Vec<ConditionTag>,
}

#[derive(Debug, Deserialize)]
pub struct OneCallResponse {
    pub current: OneCallCurrent,
    #[serde(default)]
    pub hourly: Vec<OneCallHourly>,
    #[serde(default)]
    pub daily: Vec<OneCallDaily>,
}

// --- Raw Home Assistant weather entity payload ---

#[derive(Debug, Deserialize)]
pub struct EntityState {
    pub state: String,
    pub attributes: EntityAttributes,
}

#[derive(Debug, Deserialize)]
pub struct EntityAttributes {
    pub temperature: f64,
    #[serde(default)]
    pub forecast: Vec<EntityForecast>,
}

#[derive(Debug, Deserialize)]
pub struct EntityForecast {
    pub datetime: String,
    pub temperature: f64,
    #[serde(default)]
    pub templow: Option<f64>,
    #[serde(default)]
    pub condition: Option<String>,
}

// --- Normalized model ---

/// One future day of forecast.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Forecast {
    pub date: DateTime<FixedOffset>,
    pub high_temp: i32,
    pub low_temp: i32,
    pub condition: String,
    pub weather_class: String,
}

/// One hour of forecast; only present for hourly-capable providers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HourlyForecast {
    pub date: DateTime<FixedOffset>,
    pub temp: i32,
    pub condition: String,
    pub weather_class: String,
}

/// Normalized weather snapshot for one render cycle.
///
/// `forecasts` never includes the current day; the earliest daily entry is
/// popped during construction to seed the top-level fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weather {
    pub temperature: i32,
    pub high_temp: i32,
    pub low_temp: i32,
    pub condition: String,
    pub weather_class: String,
    pub forecasts: Vec<Forecast>,
    pub hourly: Vec<HourlyForecast>,
}

/// First condition tag id, or the synthetic id 0 (maps to the unknown
/// sentinel) when the list is empty.
fn first_condition_id(weather: &[ConditionTag]) -> i32 {
    weather.first().map_or(0, |w| w.id)
}

fn epoch_to_local(secs: i64, tz: Tz) -> DateTime<FixedOffset> {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .unwrap_or_default()
        .with_timezone(&tz)
        .fixed_offset()
}

impl HourlyForecast {
    pub fn from_one_call(raw: &OneCallHourly, tz: Tz) -> Self {
        let (weather_class, condition) = icons::map_condition_code(first_condition_id(&raw.weather));
        Self {
            date: epoch_to_local(raw.dt, tz),
            temp: raw.temp as i32,
            condition,
            weather_class,
        }
    }
}

impl Forecast {
    pub fn from_one_call(raw: &OneCallDaily, tz: Tz) -> Self {
        let (weather_class, condition) = icons::map_condition_code(first_condition_id(&raw.weather));
        Self {
            date: epoch_to_local(raw.dt, tz),
            high_temp: raw.temp.max as i32,
            low_temp: raw.temp.min as i32,
            condition,
            weather_class,
        }
    }

    fn from_entity(raw: &EntityForecast, tz: Tz) -> Result<Self, WeatherError> {
        let date = DateTime::parse_from_rfc3339(&raw.datetime)
            .map_err(|e| WeatherError::Parse(format!("forecast datetime: {e}")))?
            .with_timezone(&tz)
            .fixed_offset();
        let (weather_class, condition) = match raw.condition.as_deref() {
            Some(name) => icons::map_condition_name(name),
            None => ("wi wi-na".to_string(), "Unknown".to_string()),
        };
        Ok(Self {
            date,
            high_temp: raw.temperature as i32,
            low_temp: raw.templow.unwrap_or(raw.temperature) as i32,
            condition,
            weather_class,
        })
    }
}

impl Weather {
    /// Build a snapshot from an OpenWeatherMap One Call response.
    pub fn from_one_call(raw: &OneCallResponse, tz: Tz) -> Result<Self, WeatherError> {
        let forecasts = raw.daily.iter().map(|d| Forecast::from_one_call(d, tz)).collect();
        let hourly = raw
            .hourly
            .iter()
            .map(|h| HourlyForecast::from_one_call(h, tz))
            .collect();
        Self::assemble(raw.current.temp as i32, forecasts, hourly)
    }

    /// Build a snapshot from a Home Assistant weather entity state.
    pub fn from_entity_state(raw: &EntityState, tz: Tz) -> Result<Self, WeatherError> {
        let forecasts = raw
            .attributes
            .forecast
            .iter()
            .map(|f| Forecast::from_entity(f, tz))
            .collect::<Result<Vec<_>, _>>()?;
        // Entity forecasts are daily; no hourly data on this provider.
        let weather =
            Self::assemble(raw.attributes.temperature as i32, forecasts, Vec::new())?;

        // The summary condition comes from today's forecast entry; the
        // entity's own state can lag behind it.
        let (_, reported) = icons::map_condition_name(&raw.state);
        if reported != weather.condition {
            tracing::debug!(
                "entity reports '{}' but today's forecast says '{}'",
                reported,
                weather.condition
            );
        }
        Ok(weather)
    }

    /// Sort both forecast lists ascending by date, then pop the earliest
    /// daily entry as today to seed the top-level summary fields.
    fn assemble(
        temperature: i32,
        mut forecasts: Vec<Forecast>,
        mut hourly: Vec<HourlyForecast>,
    ) -> Result<Self, WeatherError> {
        forecasts.sort();
        hourly.sort();

        if forecasts.is_empty() {
            return Err(WeatherError::MissingField("daily forecast"));
        }
        let today = forecasts.remove(0);

        Ok(Self {
            temperature,
            high_temp: today.high_temp,
            low_temp: today.low_temp,
            condition: today.condition,
            weather_class: today.weather_class,
            forecasts,
            hourly,
        })
    }
}
