use axum::extract::FromRequestParts;
use axum::http::HeaderName;
use axum::http::request::Parts;
use chrono::FixedOffset;
use std::convert::Infallible;
use std::sync::Arc;
use thiserror::Error;

use crate::attendance::SubmissionService;
use crate::calendar::AuthorizationPolicy;
use crate::storage::{Config, ConfigError};
use crate::sync::google_auth::AuthError;
use crate::sync::{
    CalendarApi, FixtureSource, GoogleCalendarClient, GoogleSheetsClient, LiveSource,
    PermissionSheet, RetryPolicy, RowWriter, ScheduleSource, ServiceAccountTokens, SheetsApi,
    TokenProvider,
};

pub type SharedState = Arc<AppState>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Authentication setup failed: {0}")]
    Auth(#[from] AuthError),
    #[error("Invalid identity header: {0}")]
    InvalidHeader(String),
    #[error("Invalid display offset: {0} minutes")]
    InvalidOffset(i32),
}

/// Clients and services built once at startup and shared by every request.
/// Nothing in here is mutated while serving.
pub struct AppState {
    pub service: SubmissionService,
    pub identity_header: HeaderName,
}

impl AppState {
    pub async fn from_config(config: &Config) -> Result<Self, StartupError> {
        let tokens: Arc<dyn TokenProvider> = Arc::new(
            ServiceAccountTokens::from_key_file(
                &config.google.service_account_key,
                config.google.token_cache.clone(),
            )
            .await?,
        );
        let calendar = Arc::new(GoogleCalendarClient::new(Arc::clone(&tokens)));
        let sheets = Arc::new(GoogleSheetsClient::new(tokens));

        Self::with_clients(config, calendar, sheets)
    }

    /// Wires the services on top of already constructed API clients.
    pub fn with_clients(
        config: &Config,
        calendar: Arc<dyn CalendarApi>,
        sheets: Arc<dyn SheetsApi>,
    ) -> Result<Self, StartupError> {
        config.validate()?;

        let sheet_id = config.active_sheet_id().to_string();
        let permissions = PermissionSheet::new(
            Arc::clone(&sheets),
            sheet_id.clone(),
            config.sheets.title_range.clone(),
            config.sheets.email_range.clone(),
        );

        let source: Arc<dyn ScheduleSource> = if config.submission.test_events {
            tracing::warn!(sheet_id = %sheet_id, "Test mode: serving fixture events");
            Arc::new(FixtureSource::new(permissions))
        } else {
            Arc::new(LiveSource::new(
                calendar,
                config.google.calendar_id.clone(),
                config.submission.max_events,
                permissions,
            ))
        };

        let writer = RowWriter::new(
            sheets,
            sheet_id,
            config.sheets.response_range.clone(),
            RetryPolicy::new(
                config.submission.max_attempts,
                config.submission.retry_base_delay_ms,
            ),
        );

        let offset_minutes = config.submission.display_utc_offset_minutes;
        let display_offset = FixedOffset::east_opt(offset_minutes * 60)
            .ok_or(StartupError::InvalidOffset(offset_minutes))?;

        let service = SubmissionService::new(
            source,
            writer,
            AuthorizationPolicy::from_allow_test_records(config.submission.allow_test_records),
            display_offset,
        );

        let identity_header = HeaderName::try_from(config.server.identity_header.as_str())
            .map_err(|_| StartupError::InvalidHeader(config.server.identity_header.clone()))?;

        Ok(Self {
            service,
            identity_header,
        })
    }
}

/// The email asserted by the identity proxy, if any.
pub struct CallerIdentity(pub Option<String>);

impl FromRequestParts<SharedState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let email = parts
            .headers
            .get(&state.identity_header)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);

        Ok(Self(email))
    }
}
