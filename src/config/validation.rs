//! Configuration validation module
//!
//! This module provides validation functions for client configuration
//! to ensure all required settings are properly configured.

use url::Url;
use crate::utils::errors::{EventHubError, Result};
use super::Settings;

/// Validate all configuration settings
pub fn validate_settings(settings: &Settings) -> Result<()> {
    validate_api_config(&settings.api)?;
    validate_payments_config(&settings.payments)?;
    validate_retry_config(&settings.retry)?;
    validate_logging_config(&settings.logging)?;

    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(EventHubError::Config(format!("{} is required", name)));
    }

    let url = Url::parse(value)
        .map_err(|e| EventHubError::Config(format!("{} is not a valid URL: {}", name, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EventHubError::Config(format!(
            "{} must use http or https, got {}",
            name,
            url.scheme()
        )));
    }

    Ok(())
}

/// Validate API configuration
fn validate_api_config(config: &super::ApiConfig) -> Result<()> {
    validate_http_url("API base URL", &config.base_url)?;

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "API timeout must be greater than 0".to_string()
        ));
    }

    Ok(())
}

/// Validate payment gateway configuration
fn validate_payments_config(config: &super::PaymentsConfig) -> Result<()> {
    validate_http_url("Payment gateway URL", &config.gateway_url)?;

    if config.timeout_seconds == 0 {
        return Err(EventHubError::Config(
            "Payment gateway timeout must be greater than 0".to_string()
        ));
    }

    if config.currency.len() != 3 {
        return Err(EventHubError::Config(format!(
            "Currency must be a 3-letter ISO code, got '{}'",
            config.currency
        )));
    }

    Ok(())
}

/// Validate retry configuration
fn validate_retry_config(config: &super::RetryConfig) -> Result<()> {
    if config.multiplier < 1.0 {
        return Err(EventHubError::Config(
            "Retry multiplier must be at least 1.0".to_string()
        ));
    }

    if config.initial_delay_ms > config.max_delay_ms {
        return Err(EventHubError::Config(
            "Initial retry delay cannot be greater than max retry delay".to_string()
        ));
    }

    Ok(())
}

/// Validate logging configuration
fn validate_logging_config(config: &super::LoggingConfig) -> Result<()> {
    if config.level.is_empty() {
        return Err(EventHubError::Config(
            "Log level is required".to_string()
        ));
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.level.as_str()) {
        return Err(EventHubError::Config(
            format!("Invalid log level: {}. Valid levels: {:?}", config.level, valid_levels)
        ));
    }

    Ok(())
}
