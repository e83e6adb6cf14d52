use std::env;
use std::fmt;
use std::path::PathBuf;

use chrono::Duration;

const DEFAULT_DATA_PATH: &str = ".lcq/store.json";
const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

/// Distinguishes runtime behavior for different stages of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the intake portal.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub telemetry: TelemetryConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let data_path = env::var("LCQ_DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH));

        let ttl_hours = match env::var("LCQ_SESSION_TTL_HOURS") {
            Ok(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|hours| *hours > 0)
                .ok_or(ConfigError::InvalidSessionTtl(raw))?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let admin_emails = env::var("LCQ_ADMIN_EMAILS")
            .map(|raw| parse_email_list(&raw))
            .unwrap_or_default();

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            storage: StorageConfig { data_path },
            session: SessionConfig {
                ttl_hours,
                admin_emails,
            },
            telemetry: TelemetryConfig { log_level },
        })
    }
}

/// Location of the JSON-backed key-value store.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_path: PathBuf,
}

/// Session lifetime and the reviewer allow-list.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl_hours: i64,
    pub admin_emails: Vec<String>,
}

impl SessionConfig {
    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

fn parse_email_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|email| email.trim().to_ascii_lowercase())
        .filter(|email| !email.is_empty())
        .collect()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidSessionTtl(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSessionTtl(value) => write!(
                f,
                "LCQ_SESSION_TTL_HOURS must be a positive whole number of hours (found '{}')",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
