use crate::sync::google_auth::{AuthError, TokenProvider};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("Sheets API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("Token error: {0}")]
    Token(#[from] AuthError),
}

impl SheetsError {
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            Self::Status { status, .. } => Some(*status),
            Self::Token(_) => None,
        }
    }

    pub fn message(&self) -> String {
        match self {
            Self::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

/// Raw `values:batchGet` payload. Shape checks happen in the caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchGetResponse {
    pub spreadsheet_id: Option<String>,
    pub value_ranges: Option<Vec<ValueRange>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueRange {
    pub range: Option<String>,
    pub values: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SheetsApi: Send + Sync {
    async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<BatchGetResponse, SheetsError>;

    /// Appends one row after the last non-empty row of `range`.
    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: &[String],
    ) -> Result<(), SheetsError>;
}

pub struct GoogleSheetsClient {
    base_url: String,
    tokens: Arc<dyn TokenProvider>,
    client: reqwest::Client,
}

impl GoogleSheetsClient {
    pub fn new(tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            base_url: "https://sheets.googleapis.com/v4".to_string(),
            tokens,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn error_from_response(response: reqwest::Response) -> SheetsError {
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return SheetsError::HttpError(e),
        };
        let message = serde_json::from_str::<ErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        SheetsError::Status { status, message }
    }
}

#[async_trait]
impl SheetsApi for GoogleSheetsClient {
    async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<BatchGetResponse, SheetsError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/spreadsheets/{}/values:batchGet",
            self.base_url,
            urlencoding::encode(spreadsheet_id)
        );
        let query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();

        tracing::debug!(spreadsheet_id, ?ranges, "Reading sheet ranges");

        let response = self.client
            .get(&url)
            .bearer_auth(&token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            let error = Self::error_from_response(response).await;
            tracing::error!("Failed to read sheet ranges: {}", error);
            return Err(error);
        }

        Ok(response.json().await?)
    }

    async fn append_row(
        &self,
        spreadsheet_id: &str,
        range: &str,
        row: &[String],
    ) -> Result<(), SheetsError> {
        let token = self.tokens.access_token().await?;
        let url = format!(
            "{}/spreadsheets/{}/values/{}:append",
            self.base_url,
            urlencoding::encode(spreadsheet_id),
            urlencoding::encode(range)
        );

        let response = self.client
            .post(&url)
            .bearer_auth(&token)
            .query(&[("valueInputOption", "USER_ENTERED")])
            .json(&serde_json::json!({ "values": [row] }))
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Append row response status: {}", status);

        if !status.is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(())
    }
}
