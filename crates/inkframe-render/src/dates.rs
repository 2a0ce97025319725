//! Rolling multi-week date grid for the calendar panel.

use chrono::{Datelike, Duration, NaiveDate};
use inkframe_calendar::EventsByDay;
use serde::Serialize;

/// One cell of the calendar grid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DateCount {
    pub day: NaiveDate,
    pub events: usize,
    pub is_past: bool,
    pub is_today: bool,
}

/// Generate `weeks * 7` consecutive dates starting from the Monday of the
/// week containing `reference`, plus the exclusive end of the range.
pub fn calendar_dates(reference: NaiveDate, weeks: u32) -> (Vec<NaiveDate>, NaiveDate) {
    let start = reference - Duration::days(i64::from(reference.weekday().num_days_from_monday()));
    let days = i64::from(weeks) * 7;
    let dates = (0..days).map(|i| start + Duration::days(i)).collect();
    (dates, start + Duration::days(days))
}

/// Annotate each grid date with its event count and past/today flags.
pub fn dates_with_events(
    dates: &[NaiveDate],
    events: &EventsByDay,
    today: NaiveDate,
) -> Vec<DateCount> {
    dates
        .iter()
        .map(|&day| DateCount {
            day,
            events: events.get(&day).map_or(0, Vec::len),
            is_past: day < today,
            is_today: day == today,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use inkframe_calendar::Event;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn grid_spans_four_weeks_from_monday() {
        // 2024-06-05 is a Wednesday
        let (dates, end) = calendar_dates(date(2024, 6, 5), 4);

        assert_eq!(dates.len(), 28);
        assert_eq!(dates[0], date(2024, 6, 3));
        assert_eq!(dates[0].weekday(), Weekday::Mon);
        assert_eq!(end, date(2024, 7, 1));
    }

    #[test]
    fn grid_is_strictly_ascending_with_no_gaps() {
        let (dates, _) = calendar_dates(date(2024, 6, 5), 4);
        for pair in dates.windows(2) {
            assert_eq!(pair[1] - pair[0], Duration::days(1));
        }
    }

    #[test]
    fn monday_reference_starts_on_itself() {
        let monday = date(2024, 6, 3);
        let (dates, _) = calendar_dates(monday, 4);
        assert_eq!(dates[0], monday);
    }

    #[test]
    fn grid_handles_year_boundaries() {
        let (dates, end) = calendar_dates(date(2024, 12, 31), 4);
        assert_eq!(dates.len(), 28);
        assert_eq!(dates[0], date(2024, 12, 30));
        assert_eq!(end, date(2025, 1, 27));
    }

    #[test]
    fn annotation_flags_today_exactly_once() {
        let today = date(2024, 6, 5);
        let (dates, _) = calendar_dates(today, 4);
        let annotated = dates_with_events(&dates, &EventsByDay::new(), today);

        assert_eq!(annotated.iter().filter(|d| d.is_today).count(), 1);
        for cell in &annotated {
            assert_eq!(cell.is_today, cell.day == today);
            assert_eq!(cell.is_past, cell.day < today);
        }
    }

    #[test]
    fn annotation_counts_events_per_day() {
        let today = date(2024, 6, 5);
        let (dates, _) = calendar_dates(today, 4);

        let event = Event {
            start: chrono::DateTime::parse_from_rfc3339("2024-06-07T10:00:00-04:00").unwrap(),
            end: chrono::DateTime::parse_from_rfc3339("2024-06-07T11:00:00-04:00").unwrap(),
            name: "A".to_string(),
            all_day: false,
        };
        let mut events = EventsByDay::new();
        events.insert(date(2024, 6, 7), vec![event.clone(), event]);

        let annotated = dates_with_events(&dates, &events, today);
        let friday = annotated.iter().find(|d| d.day == date(2024, 6, 7)).unwrap();
        assert_eq!(friday.events, 2);
        assert!(annotated.iter().filter(|d| d.day != date(2024, 6, 7)).all(|d| d.events == 0));
    }
}
