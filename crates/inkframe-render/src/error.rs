//! Render-cycle error types.

use thiserror::Error;

/// Anything that can abort a render cycle. The previously published image
/// stays in place; the next scheduled cycle starts clean.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Weather error: {0}")]
    Weather(#[from] inkframe_weather::WeatherError),

    #[error("Calendar error: {0}")]
    Calendar(#[from] inkframe_calendar::CalendarError),

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
