pub mod api;
pub mod attendance;
pub mod calendar;
pub mod sync;
pub mod storage;

pub use attendance::{AttendanceSubmission, ResponseRow, SubmissionError, SubmissionService};
pub use calendar::{AuthorizationPolicy, Event, UserEventPermission};
pub use storage::Config;
