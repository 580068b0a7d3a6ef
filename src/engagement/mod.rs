//! Event engagement lifecycle
//!
//! Eligibility, participation, paid checkout, reviews and the
//! resynchronization that follows every mutation.

pub mod eligibility;
pub mod guard;
pub mod participation;
pub mod payment;
pub mod review;
pub mod sync;

pub use eligibility::{evaluate, BlockingReason};
pub use guard::{Action, InFlightGuard, InFlightRegistry};
pub use participation::{CheckoutRequest, JoinOutcome, LeaveOutcome, ParticipationController};
pub use payment::{CheckoutOutcome, CheckoutPhase, CheckoutSession, PaymentOrchestrator};
pub use review::{ReviewAction, ReviewDeletion, ReviewLifecycleManager, ReviewSubmission};
pub use sync::{EventStateSynchronizer, EventView, RoleFlags};
