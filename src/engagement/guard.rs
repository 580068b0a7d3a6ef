//! In-flight request guards
//!
//! At most one request per (event, action) may be outstanding. The guard is
//! released when dropped, whatever the outcome of the request.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Join,
    Leave,
    Review,
    Checkout,
    Pay,
    DeleteEvent,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::Join => "join",
            Action::Leave => "leave",
            Action::Review => "review",
            Action::Checkout => "checkout",
            Action::Pay => "payment",
            Action::DeleteEvent => "delete",
        };
        write!(f, "{}", name)
    }
}

type Key = (String, Action);

/// Shared set of outstanding actions
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    active: Arc<Mutex<HashSet<Key>>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `(event_id, action)`, failing if it is already claimed
    pub fn try_begin(&self, event_id: &str, action: Action) -> Result<InFlightGuard> {
        let key = (event_id.to_string(), action);
        let inserted = match self.active.lock() {
            Ok(mut active) => active.insert(key.clone()),
            Err(poisoned) => poisoned.into_inner().insert(key.clone()),
        };

        if !inserted {
            debug!(event_id = event_id, action = %action, "Rejected duplicate submission");
            return Err(EventHubError::InFlight {
                event_id: event_id.to_string(),
                action: action.to_string(),
            });
        }

        Ok(InFlightGuard {
            registry: self.clone(),
            key: Some(key),
        })
    }

    pub fn is_active(&self, event_id: &str, action: Action) -> bool {
        self.active
            .lock()
            .map(|active| active.contains(&(event_id.to_string(), action)))
            .unwrap_or(false)
    }
}

/// Releases its claim on drop
#[derive(Debug)]
pub struct InFlightGuard {
    registry: InFlightRegistry,
    key: Option<Key>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            match self.registry.active.lock() {
                Ok(mut active) => {
                    active.remove(&key);
                }
                Err(poisoned) => {
                    poisoned.into_inner().remove(&key);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_duplicate_claim_is_rejected_until_released() {
        let registry = InFlightRegistry::new();
        let guard = registry.try_begin("evt_1", Action::Join).unwrap();

        assert_matches!(
            registry.try_begin("evt_1", Action::Join),
            Err(EventHubError::InFlight { action, .. }) if action == "join"
        );
        assert!(registry.is_active("evt_1", Action::Join));

        drop(guard);
        assert!(!registry.is_active("evt_1", Action::Join));
        assert!(registry.try_begin("evt_1", Action::Join).is_ok());
    }

    #[test]
    fn test_actions_and_events_are_independent() {
        let registry = InFlightRegistry::new();
        let _join = registry.try_begin("evt_1", Action::Join).unwrap();
        assert!(registry.try_begin("evt_1", Action::Leave).is_ok());
        assert!(registry.try_begin("evt_2", Action::Join).is_ok());
    }
}
