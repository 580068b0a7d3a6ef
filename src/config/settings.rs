//! Application settings management
//!
//! This module defines the configuration structure and provides methods
//! for loading settings from TOML files and environment variables.

use std::path::Path;
use std::time::Duration;
use serde::{Deserialize, Serialize};

/// Environment variable prefix, e.g. `EVENTHUB__API__BASE_URL`
pub const ENV_PREFIX: &str = "EVENTHUB";

const REDACTED: &str = "***";

/// Main client configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub payments: PaymentsConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

/// Marketplace REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_seconds: u64,
    pub user_agent: String,
}

/// Session configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Bearer token to start the session with
    pub token: Option<String>,
    /// Tokens expiring within this window should be refreshed
    pub refresh_margin_seconds: u64,
}

/// Payment gateway configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentsConfig {
    pub gateway_url: String,
    pub publishable_key: String,
    pub timeout_seconds: u64,
    pub currency: String,
}

/// Retry policy for idempotent requests
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
    pub jitter: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for daily-rolling log files; stdout only when unset
    pub directory: Option<String>,
    pub json: bool,
}

impl Settings {
    /// Load settings from `config.toml` (if present) and environment variables
    pub fn new() -> Result<Self, config::ConfigError> {
        Self::load(None)
    }

    /// Load settings from an explicit file (required when given) layered under the environment
    pub fn load(path: Option<&Path>) -> Result<Self, config::ConfigError> {
        let file_source = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("config").required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Settings::default())?)
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<(), crate::utils::errors::EventHubError> {
        super::validation::validate_settings(self)
    }

    /// Render the effective configuration as TOML with credentials masked
    pub fn to_toml(&self) -> Result<String, crate::utils::errors::EventHubError> {
        toml::to_string_pretty(&self.redacted())
            .map_err(|e| crate::utils::errors::EventHubError::Config(e.to_string()))
    }

    /// Copy with the session token and gateway key replaced by a mask
    pub fn redacted(&self) -> Self {
        let mut settings = self.clone();
        if settings.session.token.is_some() {
            settings.session.token = Some(REDACTED.to_string());
        }
        if !settings.payments.publishable_key.is_empty() {
            settings.payments.publishable_key = REDACTED.to_string();
        }
        settings
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl PaymentsConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl SessionConfig {
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_seconds)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: "http://localhost:5000/api".to_string(),
                timeout_seconds: 15,
                user_agent: format!("EventHub-Client/{}", env!("CARGO_PKG_VERSION")),
            },
            session: SessionConfig {
                token: None,
                refresh_margin_seconds: 300,
            },
            payments: PaymentsConfig {
                gateway_url: "https://api.stripe.com".to_string(),
                publishable_key: String::new(),
                timeout_seconds: 30,
                currency: "usd".to_string(),
            },
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 200,
                max_delay_ms: 5_000,
                multiplier: 2.0,
                jitter: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                directory: None,
                json: false,
            },
        }
    }
}
