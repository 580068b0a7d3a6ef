//! Join eligibility rules
//!
//! Pure and deterministic: no network access, same inputs give the same
//! verdict. Every failing rule contributes a reason, in rule order.

use crate::models::{EligibilityResult, Event, EventStatus, Role, User};

/// Why a user may not join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockingReason {
    NotLoggedIn,
    RoleNotAllowed(Role),
    NotOpen(EventStatus),
    Full,
    AlreadyJoined,
    OwnEvent,
}

impl std::fmt::Display for BlockingReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlockingReason::NotLoggedIn => write!(f, "You must be logged in to join events"),
            BlockingReason::RoleNotAllowed(role) => {
                write!(f, "Only attendees can join events ({} accounts cannot participate)", role)
            }
            BlockingReason::NotOpen(status) => write!(f, "Event is not open for registration (status: {})", status),
            BlockingReason::Full => write!(f, "Event is full"),
            BlockingReason::AlreadyJoined => write!(f, "You have already joined this event"),
            BlockingReason::OwnEvent => write!(f, "Hosts cannot join their own event"),
        }
    }
}

/// Every rule the pair fails, in evaluation order.
///
/// Status and participant count are checked independently: an `open` event
/// at capacity is still full.
pub fn blocking_reasons(event: &Event, user: Option<&User>) -> Vec<BlockingReason> {
    let mut reasons = Vec::new();

    match user {
        None => reasons.push(BlockingReason::NotLoggedIn),
        Some(user) if user.role != Role::User => reasons.push(BlockingReason::RoleNotAllowed(user.role)),
        Some(_) => {}
    }

    if event.status != EventStatus::Open {
        reasons.push(BlockingReason::NotOpen(event.status));
    }

    if event.is_full() {
        reasons.push(BlockingReason::Full);
    }

    if let Some(user) = user {
        if event.has_participant(&user.id) {
            reasons.push(BlockingReason::AlreadyJoined);
        }
        if event.is_hosted_by(&user.id) {
            reasons.push(BlockingReason::OwnEvent);
        }
    }

    reasons
}

/// Whether `user` may join `event`, with human-readable blockers
pub fn evaluate(event: &Event, user: Option<&User>) -> EligibilityResult {
    let reasons = blocking_reasons(event, user);
    if reasons.is_empty() {
        EligibilityResult::allowed()
    } else {
        EligibilityResult::blocked(reasons.iter().map(ToString::to_string).collect())
    }
}
