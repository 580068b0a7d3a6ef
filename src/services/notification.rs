//! Notification service implementation
//!
//! This service is the single `notify(kind, message)` entry point used by the
//! page controllers. It handles message templating, delivery through a
//! pluggable sink and per-kind/per-template statistics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use crate::utils::errors::{EventHubError, Result};

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Success => write!(f, "success"),
            NotificationKind::Info => write!(f, "info"),
            NotificationKind::Warning => write!(f, "warning"),
            NotificationKind::Error => write!(f, "error"),
        }
    }
}

/// A delivered notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub template_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Message template structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub key: String,
    pub kind: NotificationKind,
    pub content: String,
}

/// Notification statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationStats {
    pub total_sent: u64,
    pub total_failed: u64,
    pub sent_by_kind: HashMap<NotificationKind, u64>,
    pub sent_by_template: HashMap<String, u64>,
}

/// Where notifications end up
pub trait NotificationSink: Send + Sync {
    fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the log
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        match notification.kind {
            NotificationKind::Success | NotificationKind::Info => {
                info!(kind = %notification.kind, "{}", notification.message)
            }
            NotificationKind::Warning => warn!(kind = %notification.kind, "{}", notification.message),
            NotificationKind::Error => error!(kind = %notification.kind, "{}", notification.message),
        }
        Ok(())
    }
}

/// Keeps every notification in memory
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    delivered: Arc<Mutex<Vec<Notification>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> Vec<Notification> {
        self.delivered.lock().map(|d| d.clone()).unwrap_or_default()
    }

    pub fn last(&self) -> Option<Notification> {
        self.delivered.lock().ok().and_then(|d| d.last().cloned())
    }

    pub fn clear(&self) {
        if let Ok(mut delivered) = self.delivered.lock() {
            delivered.clear();
        }
    }
}

impl NotificationSink for MemorySink {
    fn deliver(&self, notification: &Notification) -> Result<()> {
        self.delivered
            .lock()
            .map_err(|_| EventHubError::Config("Notification sink lock poisoned".to_string()))?
            .push(notification.clone());
        Ok(())
    }
}

/// Notification service shared by all pages
#[derive(Clone)]
pub struct NotificationService {
    sink: Arc<dyn NotificationSink>,
    templates: Arc<HashMap<String, MessageTemplate>>,
    stats: Arc<Mutex<NotificationStats>>,
}

impl NotificationService {
    /// Create a new NotificationService delivering to `sink`
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            templates: Arc::new(Self::load_default_templates()),
            stats: Arc::new(Mutex::new(NotificationStats::default())),
        }
    }

    /// Send a plain message
    pub fn notify(&self, kind: NotificationKind, message: impl Into<String>) {
        let notification = Notification {
            kind,
            message: message.into(),
            template_key: None,
            created_at: Utc::now(),
        };
        self.deliver(notification);
    }

    /// Send a templated message. Unknown keys are reported as failures.
    pub fn notify_template(&self, template_key: &str, parameters: &[(&str, &str)]) -> Result<()> {
        let template = match self.templates.get(template_key) {
            Some(template) => template,
            None => {
                self.update_stats_failure();
                return Err(EventHubError::Config(format!("Template not found: {}", template_key)));
            }
        };

        let notification = Notification {
            kind: template.kind,
            message: Self::format_message(&template.content, parameters),
            template_key: Some(template_key.to_string()),
            created_at: Utc::now(),
        };
        self.deliver(notification);
        Ok(())
    }

    /// Surface an error with its user-facing message
    pub fn notify_error(&self, error: &EventHubError) {
        self.notify(NotificationKind::Error, error.user_message());
    }

    fn deliver(&self, notification: Notification) {
        debug!(kind = %notification.kind, template_key = ?notification.template_key, "Delivering notification");
        match self.sink.deliver(&notification) {
            Ok(()) => self.update_stats_success(notification.kind, notification.template_key.as_deref()),
            Err(e) => {
                warn!(error = %e, "Failed to deliver notification");
                self.update_stats_failure();
            }
        }
    }

    /// Replace `{name}` placeholders with parameter values
    fn format_message(content: &str, parameters: &[(&str, &str)]) -> String {
        let mut formatted = content.to_string();
        for (key, value) in parameters {
            let placeholder = format!("{{{}}}", key);
            formatted = formatted.replace(&placeholder, value);
        }
        formatted
    }

    fn update_stats_success(&self, kind: NotificationKind, template_key: Option<&str>) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_sent += 1;
            *stats.sent_by_kind.entry(kind).or_insert(0) += 1;
            if let Some(key) = template_key {
                *stats.sent_by_template.entry(key.to_string()).or_insert(0) += 1;
            }
        }
    }

    fn update_stats_failure(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            stats.total_failed += 1;
        }
    }

    /// Get notification statistics
    pub fn stats(&self) -> NotificationStats {
        self.stats.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Get available template keys
    pub fn template_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.templates.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Load default message templates
    fn load_default_templates() -> HashMap<String, MessageTemplate> {
        let defaults = [
            ("event_joined", NotificationKind::Success, "You joined {event_title}!"),
            ("event_left", NotificationKind::Info, "You left {event_title}."),
            ("checkout_required", NotificationKind::Info, "{event_title} has a joining fee of {amount}. Continue to checkout to reserve your spot."),
            ("payment_completed", NotificationKind::Success, "Payment received. You are now attending {event_title}!"),
            ("payment_declined", NotificationKind::Error, "Payment failed: {reason}. You can try another card."),
            ("payment_pending", NotificationKind::Warning, "We could not reach the payment provider for {event_title}. Your card may have been charged, so confirm the payment before trying again."),
            ("payment_unconfirmed", NotificationKind::Error, "Your payment {payment_intent_id} went through, but we could not confirm your spot in {event_title}. Retry confirmation or contact support."),
            ("review_submitted", NotificationKind::Success, "Thanks for reviewing {event_title}!"),
            ("review_updated", NotificationKind::Success, "Your review of {event_title} was updated."),
            ("review_deleted", NotificationKind::Info, "Your review was deleted."),
            ("event_deleted", NotificationKind::Success, "{event_title} was deleted."),
            ("session_expired", NotificationKind::Warning, "Your session has expired. Please log in again."),
        ];

        defaults
            .into_iter()
            .map(|(key, kind, content)| {
                (
                    key.to_string(),
                    MessageTemplate {
                        key: key.to_string(),
                        kind,
                        content: content.to_string(),
                    },
                )
            })
            .collect()
    }
}
