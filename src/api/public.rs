//! Public API types

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use crate::attendance::SubmissionError;
use crate::sync::FetchError;

pub use crate::attendance::{AttendanceSubmission, EventOption};

/// Body of every error response. `code` lets the form tell an authorization
/// problem apart from a generic failure.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

pub enum AppError {
    Submission(SubmissionError),
    BadRequest(String),
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Submission(error) => match error {
                SubmissionError::MissingIdentity => (StatusCode::UNAUTHORIZED, "MISSING_IDENTITY"),
                SubmissionError::Unauthorized { .. } => (StatusCode::FORBIDDEN, "UNAUTHORIZED"),
                SubmissionError::Validation(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
                SubmissionError::Fetch(FetchError::NoEvents) => (StatusCode::BAD_GATEWAY, "NO_EVENTS"),
                SubmissionError::Fetch(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
                SubmissionError::Write(_) => (StatusCode::BAD_GATEWAY, "WRITE_FAILED"),
            },
        }
    }

    /// What the caller is told. Upstream and authorization detail stays in the log.
    fn public_message(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Submission(error) => match error {
                SubmissionError::MissingIdentity => "Sign in to respond".to_string(),
                SubmissionError::Unauthorized { .. } => "You may not respond to this event".to_string(),
                SubmissionError::Validation(validation) => validation.to_string(),
                SubmissionError::Fetch(FetchError::NoEvents) => "No upcoming events found".to_string(),
                SubmissionError::Fetch(_) => "Could not load events, try again later".to_string(),
                SubmissionError::Write(_) => "Your answer was not recorded, try again later".to_string(),
            },
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::BadRequest(message) => message.clone(),
            Self::Submission(error) => error.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let detail = self.detail();

        if status.is_server_error() {
            tracing::error!(code, "{}", detail);
        } else {
            tracing::warn!(code, "{}", detail);
        }

        let body = ErrorBody {
            code: code.to_string(),
            message: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<SubmissionError> for AppError {
    fn from(err: SubmissionError) -> Self {
        Self::Submission(err)
    }
}
