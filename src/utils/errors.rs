//! Error handling for EventHub
//!
//! This module defines the main error types used throughout the client
//! and the classification used to decide retries, severity and user messaging.

use thiserror::Error;

/// Main error type for EventHub operations
#[derive(Error, Debug)]
pub enum EventHubError {
    /// HTTP 401 or a missing/expired session. The session has already been expired.
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// Malformed input rejected before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// The action is not allowed for this user and event
    #[error("Action not allowed: {}", reasons.join("; "))]
    BusinessRule { reasons: Vec<String> },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Payment error: {0}")]
    Payment(#[from] PaymentError),

    /// Gateway captured the payment but the backend never confirmed participation
    #[error("Payment {payment_intent_id} was captured but participation in event {event_id} was not confirmed: {reason}")]
    Inconsistency {
        payment_intent_id: String,
        event_id: String,
        reason: String,
    },

    #[error("A {action} request for event {event_id} is already in progress")]
    InFlight { event_id: String, action: String },

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    /// The view that issued the request is gone; the response was discarded
    #[error("View was unmounted before the response arrived")]
    Unmounted,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Payment gateway specific errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    #[error("Card declined ({code}): {message}")]
    Declined { code: String, message: String },

    #[error("Invalid card: {0}")]
    InvalidCard(String),

    #[error("Payment requires additional authentication")]
    RequiresAction,

    /// Timeout or 5xx from the gateway; the charge may or may not have happened
    #[error("Payment gateway unavailable: {0}")]
    GatewayUnavailable(String),

    /// The gateway reports the intent as already paid
    #[error("Payment {0} has already succeeded")]
    AlreadySucceeded(String),

    #[error("Invalid gateway response: {0}")]
    InvalidResponse(String),
}

/// Result type alias for EventHub operations
pub type Result<T> = std::result::Result<T, EventHubError>;

/// Result type alias for payment gateway operations
pub type PaymentResult<T> = std::result::Result<T, PaymentError>;

impl EventHubError {
    /// Build a business-rule rejection from a single server message
    pub fn rejected(message: impl Into<String>) -> Self {
        EventHubError::BusinessRule {
            reasons: vec![message.into()],
        }
    }

    /// Whether an automatic retry with backoff may succeed.
    ///
    /// Only transport failures and 5xx responses qualify. Business rules,
    /// validation, authentication and payment declines are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            EventHubError::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EventHubError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, EventHubError::Authentication(_))
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EventHubError::Inconsistency { .. } => ErrorSeverity::Critical,
            EventHubError::Config(_) => ErrorSeverity::Critical,
            EventHubError::Authentication(_) => ErrorSeverity::Warning,
            EventHubError::PermissionDenied(_) => ErrorSeverity::Warning,
            EventHubError::Payment(_) => ErrorSeverity::Warning,
            EventHubError::InFlight { .. } => ErrorSeverity::Info,
            EventHubError::Validation(_) => ErrorSeverity::Info,
            EventHubError::BusinessRule { .. } => ErrorSeverity::Info,
            EventHubError::Unmounted => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }

    /// Message suitable for an inline notification
    pub fn user_message(&self) -> String {
        match self {
            EventHubError::Authentication(_) => "Your session has expired. Please log in again.".to_string(),
            EventHubError::Validation(msg) => msg.clone(),
            EventHubError::BusinessRule { reasons } => reasons.join("\n"),
            EventHubError::PermissionDenied(msg) => msg.clone(),
            EventHubError::Network(_) => "Network error. Please check your connection and try again.".to_string(),
            EventHubError::Server { message, .. } => message.clone(),
            EventHubError::NotFound(what) => format!("{} could not be found", what),
            EventHubError::Payment(e) => e.to_string(),
            EventHubError::Inconsistency { payment_intent_id, .. } => format!(
                "Your payment ({}) went through but we could not confirm your spot. Please retry confirmation or contact support.",
                payment_intent_id
            ),
            EventHubError::InFlight { .. } => "Please wait, your previous request is still being processed.".to_string(),
            other => other.to_string(),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
