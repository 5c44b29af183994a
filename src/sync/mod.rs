pub mod google_api;
pub mod google_auth;
pub mod row_writer;
pub mod sheets_api;
pub mod source;

pub use google_api::{CalendarApi, GoogleCalendarClient};
pub use google_auth::{ServiceAccountTokens, StaticToken, TokenProvider};
pub use row_writer::{RetryPolicy, RowWriter, TerminalWriteError};
pub use sheets_api::{GoogleSheetsClient, SheetsApi, SheetsError};
pub use source::{FetchError, FixtureSource, LiveSource, PermissionSheet, ScheduleSource};
