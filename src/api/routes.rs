//! Routes for the attendance API

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use super::public::{AppError, AttendanceSubmission, EventOption};
use super::state::{CallerIdentity, SharedState};

async fn submit_attendance_handler(
    State(state): State<SharedState>,
    CallerIdentity(email): CallerIdentity,
    payload: Result<Json<AttendanceSubmission>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    let Json(submission) = payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    state
        .service
        .submit_attendance(submission, email.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

async fn events_handler(
    State(state): State<SharedState>,
    CallerIdentity(email): CallerIdentity,
) -> Result<Json<Vec<EventOption>>, AppError> {
    let options = state.service.upcoming_events(email.as_deref()).await?;
    Ok(Json(options))
}

async fn health_handler() -> &'static str {
    "ok"
}

/// Create the API router
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/attendance", post(submit_attendance_handler))
        .route("/events", get(events_handler))
        .route("/health", get(health_handler))
}
