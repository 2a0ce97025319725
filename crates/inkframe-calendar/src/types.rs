//! Calendar event model and upstream payload types.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, FixedOffset, LocalResult, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::CalendarError;

/// Events bucketed by their (local) start date, ascending within a day.
pub type EventsByDay = BTreeMap<NaiveDate, Vec<Event>>;

/// A calendar event. Ordered by start, then end, then name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Event {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub name: String,
    pub all_day: bool,
}

/// Raw event record from the calendar endpoint.
#[derive(Debug, Deserialize)]
pub struct ApiEvent {
    pub summary: String,
    pub start: ApiEventTime,
    pub end: ApiEventTime,
}

/// Either an explicit date-time or an all-day date.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiEventTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl Event {
    /// Convert a raw record, resolving times into the configured zone.
    ///
    /// All-day events carry a date-only end time, which is where the flag
    /// comes from.
    pub fn from_api(api: &ApiEvent, tz: Tz) -> Result<Self, CalendarError> {
        let (start, _) = parse_event_time(&api.summary, &api.start, tz)?;
        let (end, all_day) = parse_event_time(&api.summary, &api.end, tz)?;
        Ok(Self {
            start,
            end,
            name: api.summary.clone(),
            all_day,
        })
    }
}

fn parse_event_time(
    name: &str,
    time: &ApiEventTime,
    tz: Tz,
) -> Result<(DateTime<FixedOffset>, bool), CalendarError> {
    if let Some(dt_str) = &time.date_time {
        let dt = DateTime::parse_from_rfc3339(dt_str)
            .map_err(|e| CalendarError::Parse(format!("event '{name}' time '{dt_str}': {e}")))?;
        return Ok((dt.with_timezone(&tz).fixed_offset(), false));
    }
    if let Some(date_str) = &time.date {
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|e| CalendarError::Parse(format!("event '{name}' date '{date_str}': {e}")))?;
        return Ok((local_midnight(date, tz), true));
    }
    Err(CalendarError::MissingField {
        event: name.to_string(),
    })
}

/// Midnight of `date` in `tz`, resolving DST edges to the earliest valid
/// instant.
pub(crate) fn local_midnight(date: NaiveDate, tz: Tz) -> DateTime<FixedOffset> {
    let naive = date.and_time(NaiveTime::MIN);
    match naive.and_local_timezone(tz) {
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
        // midnight does not exist on this day; fall forward an hour
        LocalResult::None => (naive + Duration::hours(1))
            .and_local_timezone(tz)
            .earliest()
            .map(|dt| dt.fixed_offset())
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive).fixed_offset()),
    }
}
