//! Canned data served in test mode instead of the live calendar.

use chrono::{DateTime, Duration, Utc};

use crate::calendar::{Event, UserEventPermission};

const FIXTURE_EVENTS: [(&str, &str, i64, i64); 2] = [
    ("1", "Test Event", 1, 2),
    ("2", "Test Event 2", 24, 26),
];

/// Two upcoming test events, relative to `now`.
pub fn fixture_events(now: DateTime<Utc>) -> Vec<Event> {
    FIXTURE_EVENTS
        .iter()
        .map(|(id, title, start_hours, end_hours)| Event {
            id: id.to_string(),
            title: title.to_string(),
            start: now + Duration::hours(*start_hours),
            end: Some(now + Duration::hours(*end_hours)),
            is_test: true,
        })
        .collect()
}

pub fn fixture_permissions() -> Vec<UserEventPermission> {
    FIXTURE_EVENTS
        .iter()
        .map(|(_, title, _, _)| UserEventPermission::test_record(*title))
        .collect()
}
