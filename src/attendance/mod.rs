pub mod sanitize;
pub mod service;
pub mod submission;

pub use sanitize::sanitize_text;
pub use service::{EventOption, SubmissionError, SubmissionService};
pub use submission::{AttendanceSubmission, ResponseRow, ValidationError};
