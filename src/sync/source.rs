//! Where events and permissions come from.
//!
//! The strategy is picked once at startup: [`LiveSource`] reads the choir
//! calendar, [`FixtureSource`] serves canned test events so the whole flow
//! can be exercised without touching production data. Both read permissions
//! from a spreadsheet through [`PermissionSheet`].

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

use crate::calendar::fixtures::{fixture_events, fixture_permissions};
use crate::calendar::{Event, UserEventPermission, is_valid_email};
use crate::sync::google_api::{ApiError, CalendarApi, UpcomingQuery};
use crate::sync::sheets_api::{BatchGetResponse, SheetsApi, SheetsError, ValueRange};

#[derive(Debug, Error, PartialEq)]
pub enum SchemaError {
    #[error("Expected {expected} value ranges, got {found}")]
    MissingRange { expected: usize, found: usize },
    #[error("Range {0} has no values")]
    MissingValues(usize),
    #[error("Range {range} row {row} is not a single text cell")]
    MalformedRow { range: usize, row: usize },
    #[error("Title and email columns differ in length ({titles} vs {emails})")]
    MisalignedRows { titles: usize, emails: usize },
    #[error("Row {row} has an invalid email: {value}")]
    InvalidEmail { row: usize, value: String },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("No upcoming events in the calendar")]
    NoEvents,
    #[error("Permission sheet schema mismatch: {0}")]
    Schema(#[from] SchemaError),
    #[error("Calendar error: {0}")]
    Calendar(#[from] ApiError),
    #[error("Sheets error: {0}")]
    Sheets(#[from] SheetsError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScheduleSource: Send + Sync {
    /// Upcoming events; an empty calendar is an error, not an empty list.
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError>;

    async fn fetch_permissions(&self) -> Result<Vec<UserEventPermission>, FetchError>;
}

/// Fetches events and permissions concurrently.
pub async fn fetch_schedule(
    source: &dyn ScheduleSource,
) -> Result<(Vec<Event>, Vec<UserEventPermission>), FetchError> {
    tokio::try_join!(source.fetch_events(), source.fetch_permissions())
}

/// The two parallel columns (titles, emails) of the permissions sheet.
pub struct PermissionSheet {
    sheets: Arc<dyn SheetsApi>,
    spreadsheet_id: String,
    title_range: String,
    email_range: String,
}

impl PermissionSheet {
    pub fn new(
        sheets: Arc<dyn SheetsApi>,
        spreadsheet_id: String,
        title_range: String,
        email_range: String,
    ) -> Self {
        Self {
            sheets,
            spreadsheet_id,
            title_range,
            email_range,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<UserEventPermission>, FetchError> {
        let ranges = [self.title_range.clone(), self.email_range.clone()];
        let response = self.sheets.batch_get(&self.spreadsheet_id, &ranges).await?;
        let permissions = parse_permissions(response)?;

        tracing::debug!(count = permissions.len(), "Loaded permission rows");
        Ok(permissions)
    }
}

/// Validates a titles/emails batch read and zips it into permission records.
pub fn parse_permissions(response: BatchGetResponse) -> Result<Vec<UserEventPermission>, SchemaError> {
    let ranges = response.value_ranges.unwrap_or_default();
    let [titles, emails] = ranges.as_slice() else {
        return Err(SchemaError::MissingRange {
            expected: 2,
            found: ranges.len(),
        });
    };

    let titles = single_cell_rows(titles, 0)?;
    let emails = single_cell_rows(emails, 1)?;

    if titles.len() != emails.len() {
        return Err(SchemaError::MisalignedRows {
            titles: titles.len(),
            emails: emails.len(),
        });
    }

    titles
        .into_iter()
        .zip(emails)
        .enumerate()
        .map(|(row, (title, email))| {
            if !is_valid_email(email) {
                return Err(SchemaError::InvalidEmail {
                    row,
                    value: email.to_string(),
                });
            }
            Ok(UserEventPermission::new(title, email))
        })
        .collect()
}

fn single_cell_rows(range: &ValueRange, index: usize) -> Result<Vec<&str>, SchemaError> {
    let values = range.values.as_ref().ok_or(SchemaError::MissingValues(index))?;
    values
        .iter()
        .enumerate()
        .map(|(row, cells)| match cells.as_slice() {
            [serde_json::Value::String(cell)] => Ok(cell.as_str()),
            _ => Err(SchemaError::MalformedRow { range: index, row }),
        })
        .collect()
}

pub struct LiveSource {
    calendar: Arc<dyn CalendarApi>,
    calendar_id: String,
    max_results: u32,
    permissions: PermissionSheet,
}

impl LiveSource {
    pub fn new(
        calendar: Arc<dyn CalendarApi>,
        calendar_id: String,
        max_results: u32,
        permissions: PermissionSheet,
    ) -> Self {
        Self {
            calendar,
            calendar_id,
            max_results,
            permissions,
        }
    }
}

#[async_trait]
impl ScheduleSource for LiveSource {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        let events = self.calendar
            .list_upcoming(&self.calendar_id, UpcomingQuery::from_now(self.max_results))
            .await?;

        if events.is_empty() {
            tracing::error!(calendar_id = %self.calendar_id, "Calendar returned no upcoming events");
            return Err(FetchError::NoEvents);
        }
        Ok(events)
    }

    async fn fetch_permissions(&self) -> Result<Vec<UserEventPermission>, FetchError> {
        self.permissions.fetch().await
    }
}

/// Test mode: canned events, and the test sheet's permissions followed by
/// open records for the canned events.
pub struct FixtureSource {
    permissions: PermissionSheet,
}

impl FixtureSource {
    pub fn new(permissions: PermissionSheet) -> Self {
        Self { permissions }
    }
}

#[async_trait]
impl ScheduleSource for FixtureSource {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        Ok(fixture_events(Utc::now()))
    }

    async fn fetch_permissions(&self) -> Result<Vec<UserEventPermission>, FetchError> {
        let mut permissions = self.permissions.fetch().await?;
        permissions.extend(fixture_permissions());
        Ok(permissions)
    }
}
