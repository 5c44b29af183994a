use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use yup_oauth2::authenticator::DefaultAuthenticator;

pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/calendar.readonly",
];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to read service account key: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("OAuth error: {0}")]
    OAuthError(#[from] yup_oauth2::Error),
    #[error("No access token returned")]
    NoToken,
}

/// Supplies bearer tokens to the Google API clients.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// A fixed token, for local runs against an emulator and for tests.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.0.clone())
    }
}

/// Tokens minted from a service account key. Built once at startup and
/// shared by the calendar and sheets clients.
pub struct ServiceAccountTokens {
    auth: DefaultAuthenticator,
}

impl ServiceAccountTokens {
    pub async fn from_key_file(
        key_path: &Path,
        token_cache: Option<PathBuf>,
    ) -> Result<Self, AuthError> {
        let key = yup_oauth2::read_service_account_key(key_path).await?;
        let mut builder = yup_oauth2::ServiceAccountAuthenticator::builder(key);
        if let Some(cache) = token_cache {
            builder = builder.persist_tokens_to_disk(cache);
        }
        let auth = builder.build().await?;

        tracing::info!(key = %key_path.display(), "Service account authenticator ready");
        Ok(Self { auth })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, AuthError> {
        let token = self.auth.token(&SCOPES).await?;
        token
            .token()
            .map(str::to_string)
            .ok_or(AuthError::NoToken)
    }
}
