//! Environment-driven settings for the dashboard generator.
//!
//! Every setting has a default and is read once at startup from
//! `INKFRAME_`-prefixed environment variables, e.g. `INKFRAME_TOKEN` or
//! `INKFRAME_RENDER_WIDTH`.

use std::path::PathBuf;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Which weather backend to normalize from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherProviderKind {
    /// OpenWeatherMap One Call 3.0 (numeric condition codes).
    #[default]
    OpenWeather,
    /// Home Assistant weather entity state (named conditions).
    HomeAssistant,
}

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of settings validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the Home Assistant instance serving calendars (and,
    /// optionally, the weather entity).
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the calendar/entity API.
    #[serde(default)]
    pub token: String,

    /// Comma-separated calendar identifiers (without the `calendar.` prefix).
    #[serde(default)]
    pub calendars: String,

    /// Weather backend selection.
    #[serde(default)]
    pub weather_provider: WeatherProviderKind,

    /// OpenWeatherMap API key (OpenWeather provider only).
    #[serde(default)]
    pub openweather_api_key: String,

    #[serde(default)]
    pub latitude: f64,

    #[serde(default)]
    pub longitude: f64,

    /// Weather entity id, e.g. `weather.home` (Home Assistant provider only).
    #[serde(default = "default_weather_entity")]
    pub weather_entity: String,

    /// Final image destination.
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    #[serde(default = "default_render_width")]
    pub render_width: u32,

    #[serde(default = "default_render_height")]
    pub render_height: u32,

    /// Counter-clockwise rotation applied to the rendered image.
    #[serde(default = "default_render_rotate")]
    pub render_rotate: u32,

    /// IANA time zone name used for all date math.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Seconds between render cycles.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Weather cache entry lifetime in seconds.
    #[serde(default = "default_weather_cache_secs")]
    pub weather_cache_secs: u64,

    /// When set, the weather cache is persisted as a blob under this
    /// directory and survives restarts.
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
}

fn default_base_url() -> String {
    "http://homeassistant.local:8123".to_string()
}

fn default_weather_entity() -> String {
    "weather.home".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("output.png")
}

fn default_render_width() -> u32 {
    820
}

fn default_render_height() -> u32 {
    1200
}

fn default_render_rotate() -> u32 {
    270
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_interval_secs() -> u64 {
    60
}

fn default_weather_cache_secs() -> u64 {
    600
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: String::new(),
            calendars: String::new(),
            weather_provider: WeatherProviderKind::default(),
            openweather_api_key: String::new(),
            latitude: 0.0,
            longitude: 0.0,
            weather_entity: default_weather_entity(),
            output_path: default_output_path(),
            render_width: default_render_width(),
            render_height: default_render_height(),
            render_rotate: default_render_rotate(),
            timezone: default_timezone(),
            interval_secs: default_interval_secs(),
            weather_cache_secs: default_weather_cache_secs(),
            cache_dir: None,
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("INKFRAME").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Load settings and fail on validation errors, logging warnings.
    pub fn load_validated() -> Result<Self, ConfigError> {
        let settings = Self::from_env()?;
        let validation = settings.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Validation(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok(settings)
    }

    /// Validate the settings, returning any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if Url::parse(&self.base_url).is_err() {
            result.add_error("base_url", "Not a valid URL");
        }

        if self.render_width == 0 {
            result.add_error("render_width", "Width must be greater than 0");
        }
        if self.render_height == 0 {
            result.add_error("render_height", "Height must be greater than 0");
        }
        if !matches!(self.render_rotate, 0 | 90 | 180 | 270) {
            result.add_error("render_rotate", "Rotation must be 0, 90, 180 or 270");
        }

        if self.timezone.parse::<Tz>().is_err() {
            result.add_error("timezone", "Unknown IANA time zone name");
        }

        if self.interval_secs == 0 {
            result.add_error("interval_secs", "Interval must be greater than 0");
        }

        if self.calendar_ids().is_empty() {
            result.add_warning("calendars", "No calendars configured");
        }
        match self.weather_provider {
            WeatherProviderKind::OpenWeather if self.openweather_api_key.is_empty() => {
                result.add_warning("openweather_api_key", "No API key configured");
            }
            WeatherProviderKind::HomeAssistant if self.token.is_empty() => {
                result.add_warning("token", "No bearer token configured");
            }
            _ => {}
        }

        result
    }

    /// Calendar identifiers parsed from the comma-separated setting.
    pub fn calendar_ids(&self) -> Vec<String> {
        self.calendars
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// The configured time zone, parsed.
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse()
            .map_err(|_| ConfigError::UnknownTimeZone(self.timezone.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        let validation = settings.validate();
        assert!(validation.is_valid(), "{}", validation.error_summary());
    }

    #[test]
    fn calendar_ids_split_and_trimmed() {
        let settings = Settings {
            calendars: "family, work ,,birthdays".to_string(),
            ..Settings::default()
        };
        assert_eq!(settings.calendar_ids(), vec!["family", "work", "birthdays"]);
    }

    #[test]
    fn empty_calendar_list_is_a_warning_not_an_error() {
        let settings = Settings::default();
        let validation = settings.validate();
        assert!(validation.is_valid());
        assert!(validation.warnings.iter().any(|w| w.field == "calendars"));
    }

    #[test]
    fn bad_rotation_rejected() {
        let settings = Settings {
            render_rotate: 45,
            ..Settings::default()
        };
        let validation = settings.validate();
        assert!(!validation.is_valid());
        assert!(validation.error_summary().contains("render_rotate"));
    }

    #[test]
    fn bad_timezone_rejected() {
        let settings = Settings {
            timezone: "Mars/Olympus_Mons".to_string(),
            ..Settings::default()
        };
        assert!(!settings.validate().is_valid());
        assert!(settings.tz().is_err());
    }

    #[test]
    fn tz_parses_known_zone() {
        let settings = Settings::default();
        assert_eq!(settings.tz().ok(), Some(chrono_tz::America::New_York));
    }
}
