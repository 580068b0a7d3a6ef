//! Post-mutation resynchronization
//!
//! After any join, leave or review change the client discards its optimistic
//! copy and rebuilds the view in a fixed order: event, then role flags, then
//! eligibility. Each step depends on the one before it.

use tracing::{debug, warn};
use crate::engagement::eligibility::evaluate;
use crate::models::{EligibilityResult, Event, User};
use crate::services::api::ApiClient;
use crate::services::session::Session;
use crate::utils::errors::Result;

/// The current user's relationship to an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoleFlags {
    pub is_host: bool,
    pub is_admin: bool,
    pub is_participant: bool,
}

impl RoleFlags {
    pub fn derive(event: &Event, user: Option<&User>) -> Self {
        match user {
            Some(user) => Self {
                is_host: event.is_hosted_by(&user.id),
                is_admin: user.is_admin(),
                is_participant: event.has_participant(&user.id),
            },
            None => Self::default(),
        }
    }

    /// Host of this event or an admin
    pub fn can_manage(&self) -> bool {
        self.is_host || self.is_admin
    }
}

/// Everything the event detail view renders from
#[derive(Debug, Clone, PartialEq)]
pub struct EventView {
    pub event: Event,
    pub roles: RoleFlags,
    pub eligibility: EligibilityResult,
    /// Built from local state only; a fresh fetch failed or was skipped
    pub stale: bool,
}

impl EventView {
    pub fn can_join(&self) -> bool {
        self.eligibility.can_join
    }
}

#[derive(Clone, Debug)]
pub struct EventStateSynchronizer {
    api: ApiClient,
    session: Session,
}

impl EventStateSynchronizer {
    pub fn new(api: ApiClient, session: Session) -> Self {
        Self { api, session }
    }

    /// Fetch the canonical event and rebuild the view from it
    pub async fn resync(&self, event_id: &str) -> Result<EventView> {
        let event = self.api.get_event(event_id).await?;

        let user = self.session.current_user();
        let roles = RoleFlags::derive(&event, user.as_ref());

        let local = evaluate(&event, user.as_ref());
        let mut stale = false;
        let eligibility = if user.is_some() && self.session.is_authenticated() {
            match self.api.can_join(event_id).await {
                Ok(server) => local.merge(server),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(event_id = event_id, error = %e, "Eligibility check failed, using local rules");
                    stale = true;
                    local
                }
            }
        } else {
            local
        };

        debug!(
            event_id = event_id,
            participants = event.current_participants,
            can_join = eligibility.can_join,
            "Event state resynchronized"
        );

        Ok(EventView {
            event,
            roles,
            eligibility,
            stale,
        })
    }

    /// View derived purely from a local copy
    pub fn local_view(&self, event: Event) -> EventView {
        let user = self.session.current_user();
        EventView {
            roles: RoleFlags::derive(&event, user.as_ref()),
            eligibility: evaluate(&event, user.as_ref()),
            event,
            stale: true,
        }
    }
}
