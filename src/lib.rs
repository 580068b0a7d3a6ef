//! EventHub client
//!
//! The event engagement core of an events marketplace client: join
//! eligibility, free and paid participation, reviews, and the
//! resynchronization that keeps local event state honest after every change.

#![allow(non_snake_case)]

pub mod config;
pub mod engagement;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use config::Settings;
pub use utils::errors::{EventHubError, PaymentError, Result};

// Re-export main components for easy access
pub use engagement::{
    evaluate, EventStateSynchronizer, ParticipationController, PaymentOrchestrator, ReviewLifecycleManager,
};
pub use handlers::{CheckoutPage, EventDetailPage};
pub use services::ServiceFactory;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn info() -> String {
    format!("{} v{}", NAME, VERSION)
}
