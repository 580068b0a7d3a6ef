//! Logging configuration and setup
//!
//! This module provides logging initialization and structured logging utilities
//! for engagement actions, payment steps and API failures.

use tracing::{info, warn, error, debug};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use crate::config::LoggingConfig;
use crate::utils::errors::{EventHubError, Result};

/// Initialize logging based on configuration.
///
/// The returned guard flushes the file writer on drop; keep it alive for the
/// lifetime of the process.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = tracing_subscriber::EnvFilter::try_new(&config.level)
        .map_err(|e| EventHubError::Config(format!("Invalid log filter '{}': {}", config.level, e)))?;

    let stdout_layer = if config.json {
        tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        tracing_subscriber::fmt::layer().with_writer(std::io::stderr).boxed()
    };

    let (file_layer, guard) = match &config.directory {
        Some(directory) => {
            let file_appender = tracing_appender::rolling::daily(directory, "eventhub.log");
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(non_blocking)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| EventHubError::Config(format!("Logging already initialized: {}", e)))?;

    info!("Logging initialized with level: {}", config.level);
    Ok(guard)
}

/// Log participation and review actions with structured data
pub fn log_event_action(event_id: &str, action: &str, user_id: Option<&str>, details: Option<&str>) {
    info!(
        event_id = event_id,
        action = action,
        user_id = user_id,
        details = details,
        "Event action performed"
    );
}

/// Log a step of the paid checkout protocol
pub fn log_payment_step(event_id: &str, payment_intent_id: Option<&str>, step: &str, success: bool) {
    if success {
        info!(
            event_id = event_id,
            payment_intent_id = payment_intent_id,
            step = step,
            "Payment step completed"
        );
    } else {
        warn!(
            event_id = event_id,
            payment_intent_id = payment_intent_id,
            step = step,
            "Payment step failed"
        );
    }
}

/// Log API errors with context
pub fn log_api_error(api: &str, error: &EventHubError, context: Option<&str>) {
    if error.is_retryable() {
        debug!(api = api, error = %error, context = context, "Transient API error");
    } else {
        error!(
            api = api,
            error = %error,
            severity = %error.severity(),
            context = context,
            "API error occurred"
        );
    }
}
