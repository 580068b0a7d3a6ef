//! Join and leave
//!
//! Local state is only touched after the server accepted the change, and
//! every successful mutation ends in a full resynchronization.

use std::sync::Arc;
use tracing::{info, warn};
use crate::engagement::eligibility::evaluate;
use crate::engagement::guard::{Action, InFlightRegistry};
use crate::engagement::sync::{EventStateSynchronizer, EventView};
use crate::models::{Event, Participant, User};
use crate::services::api::ApiClient;
use crate::services::confirmation::{ConfirmationPrompt, Confirmer};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_event_action;

/// Ticket into the paid checkout flow.
///
/// Only the participation controller creates these, and only for events
/// with a joining fee.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    event_id: String,
    event_title: String,
    amount: f64,
}

impl CheckoutRequest {
    pub(crate) fn for_event(event: &Event) -> Self {
        Self {
            event_id: event.id.clone(),
            event_title: event.title.clone(),
            amount: event.joining_fee,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn event_title(&self) -> &str {
        &self.event_title
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinOutcome {
    /// Free event joined and resynchronized
    Joined(EventView),
    /// Paid event: nothing was sent, the caller must run checkout
    CheckoutRequired(CheckoutRequest),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LeaveOutcome {
    Left(EventView),
    /// The user declined the confirmation prompt
    Cancelled,
}

#[derive(Clone)]
pub struct ParticipationController {
    api: ApiClient,
    sync: EventStateSynchronizer,
    confirmer: Arc<dyn Confirmer>,
    in_flight: InFlightRegistry,
}

impl ParticipationController {
    pub fn new(
        api: ApiClient,
        sync: EventStateSynchronizer,
        confirmer: Arc<dyn Confirmer>,
        in_flight: InFlightRegistry,
    ) -> Self {
        Self {
            api,
            sync,
            confirmer,
            in_flight,
        }
    }

    /// Join `event` as `user`.
    ///
    /// Paid events never reach the join endpoint; they come back as
    /// [`JoinOutcome::CheckoutRequired`].
    pub async fn join(&self, event: &mut Event, user: &User) -> Result<JoinOutcome> {
        let _guard = self.in_flight.try_begin(&event.id, Action::Join)?;

        let eligibility = evaluate(event, Some(user));
        if !eligibility.can_join {
            return Err(EventHubError::BusinessRule {
                reasons: eligibility.reasons,
            });
        }

        if event.is_paid() {
            info!(event_id = %event.id, fee = event.joining_fee, "Paid event, routing to checkout");
            return Ok(JoinOutcome::CheckoutRequired(CheckoutRequest::for_event(event)));
        }

        self.api.join_event(&event.id).await?;

        event.add_participant(Participant::from(user));
        log_event_action(&event.id, "join", Some(&user.id), None);

        Ok(JoinOutcome::Joined(self.reconcile(event).await))
    }

    /// Leave `event` after the user confirms
    pub async fn leave(&self, event: &mut Event, user: &User) -> Result<LeaveOutcome> {
        let _guard = self.in_flight.try_begin(&event.id, Action::Leave)?;

        if !event.has_participant(&user.id) {
            return Err(EventHubError::rejected("You are not a participant of this event"));
        }

        let prompt = ConfirmationPrompt::LeaveEvent {
            title: event.title.clone(),
        };
        if !self.confirmer.confirm(&prompt).await {
            info!(event_id = %event.id, "Leave cancelled by user");
            return Ok(LeaveOutcome::Cancelled);
        }

        self.api.leave_event(&event.id).await?;

        event.remove_participant(&user.id);
        log_event_action(&event.id, "leave", Some(&user.id), None);

        Ok(LeaveOutcome::Left(self.reconcile(event).await))
    }

    pub fn is_joining(&self, event_id: &str) -> bool {
        self.in_flight.is_active(event_id, Action::Join)
    }

    pub fn is_leaving(&self, event_id: &str) -> bool {
        self.in_flight.is_active(event_id, Action::Leave)
    }

    /// Replace the optimistic copy with server truth, or keep it marked stale
    async fn reconcile(&self, event: &mut Event) -> EventView {
        match self.sync.resync(&event.id).await {
            Ok(view) => {
                *event = view.event.clone();
                view
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Resynchronization failed, keeping optimistic state");
                self.sync.local_view(event.clone())
            }
        }
    }
}
