//! Page controllers
//!
//! This module contains the UI-facing controllers that drive the engagement core:
//! - Event detail page: load, join, leave, reviews and event deletion
//! - Checkout page: payment intent, card payment and confirmation retry

pub mod checkout;
pub mod event_detail;

pub use checkout::CheckoutPage;
pub use event_detail::{EventDetailPage, EventDetailState};

use crate::services::notification::{NotificationKind, NotificationService};
use crate::utils::errors::EventHubError;

/// Surface an error to the user with a kind matching its severity
pub fn report_error(notifications: &NotificationService, error: &EventHubError) {
    match error {
        EventHubError::Unmounted => {}
        EventHubError::Authentication(_) => {
            if notifications.notify_template("session_expired", &[]).is_err() {
                notifications.notify_error(error);
            }
        }
        EventHubError::InFlight { .. } => notifications.notify(NotificationKind::Info, error.user_message()),
        EventHubError::Validation(_) | EventHubError::BusinessRule { .. } | EventHubError::PermissionDenied(_) => {
            notifications.notify(NotificationKind::Warning, error.user_message())
        }
        _ => notifications.notify_error(error),
    }
}
