//! Navigation abstraction
//!
//! Business logic never redirects on its own; it asks a [`Navigator`].

use std::sync::{Arc, Mutex};
use tracing::debug;
use url::form_urlencoded;

/// Client-side destinations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Events,
    Event { id: String },
    Checkout { event_id: String },
    Login { return_to: Option<String> },
}

impl Route {
    /// Client path with identifiers and the return target percent-encoded
    pub fn path(&self) -> String {
        match self {
            Route::Events => "/events".to_string(),
            Route::Event { id } => format!("/events/{}", encode_segment(id)),
            Route::Checkout { event_id } => format!("/events/{}/checkout", encode_segment(event_id)),
            Route::Login { return_to: Some(target) } => format!("/login?returnTo={}", encode_component(target)),
            Route::Login { return_to: None } => "/login".to_string(),
        }
    }
}

fn encode_component(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

fn encode_segment(value: &str) -> String {
    // `+` only means space in a query string
    encode_component(value).replace('+', "%20")
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path())
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);

    fn current(&self) -> Option<Route>;
}

/// In-memory route stack
#[derive(Debug, Clone, Default)]
pub struct HistoryNavigator {
    history: Arc<Mutex<Vec<Route>>>,
}

impl HistoryNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(route: Route) -> Self {
        Self {
            history: Arc::new(Mutex::new(vec![route])),
        }
    }

    /// Every route visited, oldest first
    pub fn history(&self) -> Vec<Route> {
        self.history.lock().map(|h| h.clone()).unwrap_or_default()
    }
}

impl Navigator for HistoryNavigator {
    fn navigate(&self, route: Route) {
        debug!(route = %route, "Navigating");
        if let Ok(mut history) = self.history.lock() {
            history.push(route);
        }
    }

    fn current(&self) -> Option<Route> {
        self.history.lock().ok().and_then(|h| h.last().cloned())
    }
}
