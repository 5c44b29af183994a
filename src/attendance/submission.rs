use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::sanitize::sanitize_text;
use crate::calendar::event::EVENT_DATE_FORMAT;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("Event date {0:?} is not in dd/mm/yyyy HH:MM form")]
    InvalidEventDate(String),
}

/// An attendance answer as posted by the form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceSubmission {
    pub event_title: String,
    pub event_date: String,
    pub going: bool,
    #[serde(default)]
    pub why_not: Option<String>,
    pub went_last_time: bool,
    #[serde(default)]
    pub comments: Option<String>,
}

impl AttendanceSubmission {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.event_title.trim().is_empty() {
            return Err(ValidationError::MissingField("eventTitle"));
        }
        let event_date = self.event_date.trim();
        if event_date.is_empty() {
            return Err(ValidationError::MissingField("eventDate"));
        }
        // The date lands in the sheet verbatim, so only the listed format is accepted.
        if NaiveDateTime::parse_from_str(event_date, EVENT_DATE_FORMAT).is_err() {
            return Err(ValidationError::InvalidEventDate(event_date.to_string()));
        }
        Ok(())
    }
}

/// One persisted answer, in response sheet column order.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseRow {
    pub email: String,
    pub submitted_at: DateTime<Utc>,
    pub event_title: String,
    pub event_date: String,
    pub going: bool,
    pub why_not: String,
    pub went_last_time: bool,
    pub comments: String,
}

impl ResponseRow {
    /// Builds the row, sanitizing the free-text answers.
    pub fn new(email: &str, submitted_at: DateTime<Utc>, submission: &AttendanceSubmission) -> Self {
        Self {
            email: email.to_string(),
            submitted_at,
            event_title: submission.event_title.clone(),
            event_date: submission.event_date.trim().to_string(),
            going: submission.going,
            why_not: sanitize_text(submission.why_not.as_deref()),
            went_last_time: submission.went_last_time,
            comments: sanitize_text(submission.comments.as_deref()),
        }
    }

    pub fn cells(&self) -> Vec<String> {
        vec![
            self.email.clone(),
            self.submitted_at.timestamp_millis().to_string(),
            self.event_title.clone(),
            self.event_date.clone(),
            sheet_bool(self.going),
            self.why_not.clone(),
            sheet_bool(self.went_last_time),
            self.comments.clone(),
        ]
    }
}

fn sheet_bool(value: bool) -> String {
    let cell = if value { "TRUE" } else { "FALSE" };
    cell.to_string()
}
