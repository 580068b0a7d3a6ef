//! Review lifecycle
//!
//! One review per (author, event). Submitting again updates the existing
//! review. Aggregates such as the average rating are always refetched.

use std::sync::Arc;
use tracing::{info, warn};
use crate::engagement::guard::{Action, InFlightRegistry};
use crate::engagement::sync::{EventStateSynchronizer, EventView};
use crate::models::{Event, Review, ReviewDraft, ReviewSummary, User};
use crate::services::api::ApiClient;
use crate::services::confirmation::{ConfirmationPrompt, Confirmer};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_event_action;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Created,
    Updated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSubmission {
    pub review: Review,
    pub action: ReviewAction,
    pub view: EventView,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReviewDeletion {
    Deleted { view: EventView },
    Cancelled,
}

#[derive(Clone)]
pub struct ReviewLifecycleManager {
    api: ApiClient,
    sync: EventStateSynchronizer,
    confirmer: Arc<dyn Confirmer>,
    in_flight: InFlightRegistry,
}

impl ReviewLifecycleManager {
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

    /// The review `user_id` wrote for `event_id`, if any
    pub async fn check(&self, event_id: &str, user_id: &str) -> Result<Option<Review>> {
        let review = self.api.check_review(event_id).await?;
        Ok(review.filter(|r| {
            let mine = r.author_id == user_id;
            if !mine {
                warn!(event_id = event_id, review_id = %r.id, "Review check returned another author's review");
            }
            mine
        }))
    }

    /// All reviews for an event with the backend-computed average
    pub async fn list(&self, event_id: &str) -> Result<ReviewSummary> {
        self.api.list_reviews(event_id).await
    }

    /// Create the user's review, or update it if one already exists
    pub async fn submit(&self, event: &Event, user: &User, draft: &ReviewDraft) -> Result<ReviewSubmission> {
        let _guard = self.in_flight.try_begin(&event.id, Action::Review)?;

        if !user.is_attendee() {
            return Err(EventHubError::rejected(format!(
                "Only attendees can review events ({} accounts cannot)",
                user.role
            )));
        }

        let draft = draft.validate()?;

        let existing = self.check(&event.id, &user.id).await?;
        if existing.is_none() && !event.has_participant(&user.id) {
            return Err(EventHubError::rejected("Only participants can review this event"));
        }

        let (review, action) = match existing {
            Some(current) => (
                self.api.update_review(&event.id, &current.id, &draft).await?,
                ReviewAction::Updated,
            ),
            None => (self.api.create_review(&event.id, &draft).await?, ReviewAction::Created),
        };

        let details = format!("{:?} rating={}", action, review.rating);
        log_event_action(&event.id, "review", Some(&user.id), Some(&details));

        let view = self.reconcile(event).await;
        Ok(ReviewSubmission { review, action, view })
    }

    /// Delete the user's own review after confirmation
    pub async fn delete(&self, event: &Event, review: &Review, user: &User) -> Result<ReviewDeletion> {
        let _guard = self.in_flight.try_begin(&event.id, Action::Review)?;

        if review.author_id != user.id {
            return Err(EventHubError::PermissionDenied("You can only delete your own review".to_string()));
        }

        if !self.confirmer.confirm(&ConfirmationPrompt::DeleteReview).await {
            info!(event_id = %event.id, review_id = %review.id, "Review deletion cancelled");
            return Ok(ReviewDeletion::Cancelled);
        }

        self.api.delete_review(&event.id, &review.id).await?;
        log_event_action(&event.id, "delete_review", Some(&user.id), Some(&review.id));

        Ok(ReviewDeletion::Deleted {
            view: self.reconcile(event).await,
        })
    }

    async fn reconcile(&self, event: &Event) -> EventView {
        match self.sync.resync(&event.id).await {
            Ok(view) => view,
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Resynchronization after review change failed");
                self.sync.local_view(event.clone())
            }
        }
    }
}
