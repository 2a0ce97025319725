//! Home Assistant calendar integration for the dashboard.
//!
//! Fetches events for a set of calendars over a date window and groups them
//! by day.

pub mod client;
pub mod error;
pub mod types;

pub use client::CalendarClient;
pub use error::CalendarError;
pub use types::{Event, EventsByDay};
