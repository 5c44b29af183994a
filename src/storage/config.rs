use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::sync::google_api::DEFAULT_MAX_RESULTS;
use crate::sync::row_writer::{DEFAULT_BASE_DELAY_MS, DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub google: GoogleConfig,
    pub sheets: SheetsConfig,
    pub server: ServerConfig,
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoogleConfig {
    pub service_account_key: PathBuf,
    pub token_cache: Option<PathBuf>,
    pub calendar_id: String,
    pub sheet_id: String,
    pub test_sheet_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SheetsConfig {
    pub title_range: String,
    pub email_range: String,
    pub response_range: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Header carrying the email verified by the fronting identity proxy.
    pub identity_header: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionConfig {
    pub max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub max_events: u32,
    pub allow_test_records: bool,
    pub test_events: bool,
    pub display_utc_offset_minutes: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    pub directory: Option<PathBuf>,
    pub filter: Option<String>,
}

impl Config {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn load_or_create() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            Self::load(&config_path)
        } else {
            let config = Self::default();
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hellscore-attendance")
            .join("config.toml")
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;

        Ok(())
    }

    /// Spreadsheet used for both permission reads and response writes.
    pub fn active_sheet_id(&self) -> &str {
        if self.submission.test_events {
            &self.google.test_sheet_id
        } else {
            &self.google.sheet_id
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.active_sheet_id().is_empty() {
            let key = if self.submission.test_events { "test_sheet_id" } else { "sheet_id" };
            return Err(ConfigError::Invalid(format!("google.{} is not set", key)));
        }
        if !self.submission.test_events && self.google.calendar_id.is_empty() {
            return Err(ConfigError::Invalid("google.calendar_id is not set".to_string()));
        }
        if self.server.identity_header.is_empty() {
            return Err(ConfigError::Invalid("server.identity_header is not set".to_string()));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hellscore-attendance");

        Self {
            google: GoogleConfig {
                service_account_key: config_dir.join("service-account.json"),
                token_cache: Some(config_dir.join("token.json")),
                calendar_id: "6bo68oo6iujc4obpo3fvanpd24@group.calendar.google.com".to_string(),
                sheet_id: String::new(),
                test_sheet_id: String::new(),
            },
            sheets: SheetsConfig {
                title_range: "user_event_event_title".to_string(),
                email_range: "user_event_user_email".to_string(),
                response_range: "response".to_string(),
            },
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                identity_header: "x-forwarded-email".to_string(),
            },
            submission: SubmissionConfig {
                max_attempts: DEFAULT_MAX_ATTEMPTS,
                retry_base_delay_ms: DEFAULT_BASE_DELAY_MS,
                max_events: DEFAULT_MAX_RESULTS,
                allow_test_records: false,
                test_events: false,
                display_utc_offset_minutes: 0,
            },
            logging: LoggingConfig::default(),
        }
    }
}
