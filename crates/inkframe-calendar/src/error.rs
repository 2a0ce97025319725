//! Calendar-specific error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    /// An event record carried neither a date-time nor an all-day date.
    /// This is the only parse problem that aborts the fetch.
    #[error("Calendar event '{event}' is missing a start or end date")]
    MissingField { event: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Calendar API returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Parse error: {0}")]
    Parse(String),
}
