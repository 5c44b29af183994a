use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// How event starts are shown to clients and echoed back in submissions.
pub const EVENT_DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// An upcoming rehearsal or performance, as read from the choir calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub is_test: bool,
}

impl Event {
    /// Whether this calendar entry belongs to the permission title `title`.
    ///
    /// Calendar summaries often carry a suffix ("Rehearsal - Hall B"), so a
    /// prefix match is used.
    pub fn matches_title(&self, title: &str) -> bool {
        !title.is_empty() && self.title.starts_with(title)
    }
}

/// Renders an event start the way it is shown to (and echoed back by) clients.
pub fn human_date<Tz: TimeZone>(start: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    start.with_timezone(tz).format(EVENT_DATE_FORMAT).to_string()
}
