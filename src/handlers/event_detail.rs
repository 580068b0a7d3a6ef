//! Event detail page controller
//!
//! Drives the engagement core for one event and turns outcomes into
//! notifications and navigation. Results that arrive after `unmount()` are
//! still returned to the caller but never applied to page state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};
use crate::engagement::{
    Action, CheckoutOutcome, CheckoutRequest, EventView, JoinOutcome, LeaveOutcome, ReviewAction, ReviewDeletion, ReviewSubmission,
    RoleFlags,
};
use crate::handlers::report_error;
use crate::models::{Event, Review, ReviewDraft, ReviewSummary, User};
use crate::services::confirmation::ConfirmationPrompt;
use crate::services::navigation::Route;
use crate::services::notification::NotificationKind;
use crate::services::ServiceFactory;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::format_amount;
use crate::utils::logging::log_event_action;

/// What the page currently renders
#[derive(Debug, Clone, Default)]
pub struct EventDetailState {
    pub view: Option<EventView>,
    pub reviews: ReviewSummary,
    pub my_review: Option<Review>,
    pub pending_checkout: Option<CheckoutRequest>,
}

#[derive(Clone)]
pub struct EventDetailPage {
    services: ServiceFactory,
    event_id: String,
    mounted: Arc<AtomicBool>,
    state: Arc<Mutex<EventDetailState>>,
}

impl EventDetailPage {
    pub fn new(services: ServiceFactory, event_id: String) -> Self {
        services.navigator.navigate(Route::Event { id: event_id.clone() });
        Self {
            services,
            event_id,
            mounted: Arc::new(AtomicBool::new(true)),
            state: Arc::new(Mutex::new(EventDetailState::default())),
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        debug!(event_id = %self.event_id, "Event page unmounted");
        self.mounted.store(false, Ordering::SeqCst);
    }

    pub fn state(&self) -> EventDetailState {
        self.lock_state().clone()
    }

    /// Fetch the event view, the reviews and the current user's review
    pub async fn load(&self) -> Result<EventView> {
        self.ensure_mounted()?;

        let result = self.fetch_all().await;
        match result {
            Ok((view, reviews, my_review)) => {
                self.apply(|state| {
                    state.view = Some(view.clone());
                    state.reviews = reviews;
                    state.my_review = my_review;
                });
                Ok(view)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn fetch_all(&self) -> Result<(EventView, ReviewSummary, Option<Review>)> {
        let (view, reviews) = futures::try_join!(
            self.services.synchronizer.resync(&self.event_id),
            self.services.reviews.list(&self.event_id),
        )?;
        let my_review = match self.services.session.current_user() {
            Some(user) if self.services.session.is_authenticated() => {
                self.services.reviews.check(&self.event_id, &user.id).await?
            }
            _ => None,
        };
        Ok((view, reviews, my_review))
    }

    /// Join the event, or route to checkout if it has a fee
    pub async fn join(&self) -> Result<JoinOutcome> {
        self.ensure_mounted()?;
        let user = self.require_user()?;
        let mut event = self.loaded_event()?;

        let outcome = match self.services.participation.join(&mut event, &user).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };

        match &outcome {
            JoinOutcome::Joined(view) => {
                if self.apply(|state| state.view = Some(view.clone())) {
                    self.notify_template("event_joined", &[("event_title", view.event.title.as_str())]);
                }
            }
            JoinOutcome::CheckoutRequired(request) => {
                if self.apply(|state| state.pending_checkout = Some(request.clone())) {
                    let amount = format_amount(request.amount(), &self.services.settings.payments.currency);
                    self.notify_template(
                        "checkout_required",
                        &[("event_title", request.event_title()), ("amount", amount.as_str())],
                    );
                    self.services.navigator.navigate(Route::Checkout {
                        event_id: request.event_id().to_string(),
                    });
                }
            }
        }
        Ok(outcome)
    }

    /// Take back the result of a finished checkout started from this page.
    ///
    /// Falls back to a reload when the checkout could not resynchronize.
    pub async fn checkout_completed(&self, outcome: &CheckoutOutcome) -> Result<EventView> {
        self.ensure_mounted()?;

        let view = match &outcome.view {
            Some(view) => view.clone(),
            None => self.load().await?,
        };
        self.apply(|state| {
            state.view = Some(view.clone());
            state.pending_checkout = None;
        });
        Ok(view)
    }

    /// Leave the event after confirmation
    pub async fn leave(&self) -> Result<LeaveOutcome> {
        self.ensure_mounted()?;
        let user = self.require_user()?;
        let mut event = self.loaded_event()?;
        let title = event.title.clone();

        let outcome = match self.services.participation.leave(&mut event, &user).await {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };

        if let LeaveOutcome::Left(view) = &outcome {
            if self.apply(|state| state.view = Some(view.clone())) {
                self.notify_template("event_left", &[("event_title", title.as_str())]);
            }
        }
        Ok(outcome)
    }

    /// Create or update the current user's review
    pub async fn submit_review(&self, draft: &ReviewDraft) -> Result<ReviewSubmission> {
        self.ensure_mounted()?;
        let user = self.require_user()?;
        let event = self.loaded_event()?;

        let submission = match self.services.reviews.submit(&event, &user, draft).await {
            Ok(submission) => submission,
            Err(e) => return Err(self.fail(e)),
        };

        let reviews = self.refetch_reviews().await;
        let applied = self.apply(|state| {
            state.view = Some(submission.view.clone());
            state.my_review = Some(submission.review.clone());
            if let Some(reviews) = reviews {
                state.reviews = reviews;
            }
        });
        if applied {
            let template = match submission.action {
                ReviewAction::Created => "review_submitted",
                ReviewAction::Updated => "review_updated",
            };
            self.notify_template(template, &[("event_title", event.title.as_str())]);
        }
        Ok(submission)
    }

    /// Delete the current user's review after confirmation
    pub async fn delete_review(&self) -> Result<ReviewDeletion> {
        self.ensure_mounted()?;
        let user = self.require_user()?;
        let event = self.loaded_event()?;
        let review = self
            .lock_state()
            .my_review
            .clone()
            .ok_or_else(|| EventHubError::Validation("You have not reviewed this event".to_string()));
        let review = match review {
            Ok(review) => review,
            Err(e) => return Err(self.fail(e)),
        };

        let deletion = match self.services.reviews.delete(&event, &review, &user).await {
            Ok(deletion) => deletion,
            Err(e) => return Err(self.fail(e)),
        };

        if let ReviewDeletion::Deleted { view } = &deletion {
            let reviews = self.refetch_reviews().await;
            let applied = self.apply(|state| {
                state.view = Some(view.clone());
                state.my_review = None;
                if let Some(reviews) = reviews {
                    state.reviews = reviews;
                }
            });
            if applied {
                self.notify_template("review_deleted", &[]);
            }
        }
        Ok(deletion)
    }

    /// Delete the event. Only its host or an admin may do this.
    ///
    /// Returns `false` if the user declined the confirmation.
    pub async fn delete_event(&self) -> Result<bool> {
        self.ensure_mounted()?;
        let user = self.require_user()?;
        let event = self.loaded_event()?;

        match self.delete_event_as(&event, &user).await {
            Ok(deleted) => {
                if deleted && self.apply(|state| state.view = None) {
                    self.notify_template("event_deleted", &[("event_title", event.title.as_str())]);
                    self.services.navigator.navigate(Route::Events);
                }
                Ok(deleted)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    async fn delete_event_as(&self, event: &Event, user: &User) -> Result<bool> {
        let _guard = self.services.in_flight.try_begin(&event.id, Action::DeleteEvent)?;

        if !RoleFlags::derive(event, Some(user)).can_manage() {
            return Err(EventHubError::PermissionDenied(
                "Only the event host or an admin can delete this event".to_string(),
            ));
        }

        let prompt = ConfirmationPrompt::DeleteEvent {
            title: event.title.clone(),
        };
        if !self.services.confirmer.confirm(&prompt).await {
            info!(event_id = %event.id, "Event deletion cancelled");
            return Ok(false);
        }

        self.services.api.delete_event(&event.id).await?;
        log_event_action(&event.id, "delete_event", Some(&user.id), None);
        Ok(true)
    }

    async fn refetch_reviews(&self) -> Option<ReviewSummary> {
        match self.services.reviews.list(&self.event_id).await {
            Ok(reviews) => Some(reviews),
            Err(e) => {
                warn!(event_id = %self.event_id, error = %e, "Failed to refresh reviews");
                None
            }
        }
    }

    fn require_user(&self) -> Result<User> {
        match self.services.session.current_user() {
            Some(user) if self.services.session.is_authenticated() => Ok(user),
            _ => {
                self.services.session.expire();
                Err(self.fail(EventHubError::Authentication("You must be logged in".to_string())))
            }
        }
    }

    fn loaded_event(&self) -> Result<Event> {
        let event = self.lock_state().view.as_ref().map(|view| view.event.clone());
        event.ok_or_else(|| EventHubError::Validation("Event has not been loaded".to_string()))
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(EventHubError::Unmounted)
        }
    }

    /// Apply `update` if the page is still mounted; reports whether it was applied
    fn apply(&self, update: impl FnOnce(&mut EventDetailState)) -> bool {
        if !self.is_mounted() {
            debug!(event_id = %self.event_id, "Dropping response for unmounted page");
            return false;
        }
        update(&mut self.lock_state());
        true
    }

    fn fail(&self, error: EventHubError) -> EventHubError {
        if self.is_mounted() {
            report_error(&self.services.notifications, &error);
        } else {
            debug!(event_id = %self.event_id, error = %error, "Dropping error for unmounted page");
        }
        error
    }

    fn notify_template(&self, key: &str, parameters: &[(&str, &str)]) {
        if let Err(e) = self.services.notifications.notify_template(key, parameters) {
            warn!(template = key, error = %e, "Notification template missing");
            self.services.notifications.notify(NotificationKind::Info, key.replace('_', " "));
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, EventDetailState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
