//! Home Assistant calendar API client.

use std::collections::BTreeSet;
use std::time::Duration;

use chrono::NaiveDate;
use chrono_tz::Tz;
use futures::future::try_join_all;
use tracing::instrument;

use crate::error::CalendarError;
use crate::types::{local_midnight, ApiEvent, Event, EventsByDay};

const REQUEST_TIMEOUT_SECS: u64 = 10;

pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    tz: Tz,
}

impl CalendarClient {
    pub fn new(base_url: &str, token: &str, tz: Tz) -> Result<Self, CalendarError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            tz,
        })
    }

    /// Fetch events for all calendars over `[start, end)` and group them by
    /// local start date.
    ///
    /// One request per calendar, all in flight at once; any failure fails
    /// the whole fetch. Identical events appearing on several calendars are
    /// deduplicated before grouping.
    #[instrument(skip(self), level = "info")]
    pub async fn fetch_events(
        &self,
        calendar_ids: &[String],
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<EventsByDay, CalendarError> {
        let start_str = local_midnight(start, self.tz).to_rfc3339();
        let end_str = local_midnight(end, self.tz).to_rfc3339();

        let results = try_join_all(
            calendar_ids
                .iter()
                .map(|id| self.fetch_calendar(id, &start_str, &end_str)),
        )
        .await?;

        // Set semantics on the full event tuple; iteration order is the
        // global chronological sort.
        let unique: BTreeSet<Event> = results.into_iter().flatten().collect();

        let mut grouped = EventsByDay::new();
        for event in unique {
            grouped.entry(event.start.date_naive()).or_default().push(event);
        }
        Ok(grouped)
    }

    async fn fetch_calendar(
        &self,
        calendar_id: &str,
        start: &str,
        end: &str,
    ) -> Result<Vec<Event>, CalendarError> {
        let url = format!(
            "{}/api/calendars/calendar.{}?start={}&end={}",
            self.base_url,
            calendar_id,
            urlencoding::encode(start),
            urlencoding::encode(end),
        );

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let api_events: Vec<ApiEvent> = self.handle_response(response).await?;
        api_events
            .iter()
            .map(|e| Event::from_api(e, self.tz))
            .collect()
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, CalendarError> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| CalendarError::Parse(format!("JSON parse error: {e}")))
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(CalendarError::Status {
                status: status.as_u16(),
                body,
            })
        }
    }
}
