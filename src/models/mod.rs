//! Data models module
//!
//! This module contains the wire and domain structures shared by the client

pub mod user;
pub mod event;
pub mod review;
pub mod payment;
pub mod eligibility;
pub mod envelope;

// Re-export commonly used models
pub use user::{User, Role};
pub use event::{Event, EventStatus, Participant};
pub use review::{Review, ReviewDraft, ReviewSummary};
pub use payment::{PaymentIntent, PaymentRecord, CardDetails, GatewayConfirmation, GatewayStatus, CreateIntentRequest, ConfirmPaymentRequest};
pub use eligibility::EligibilityResult;
pub use envelope::ApiEnvelope;
