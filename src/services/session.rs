//! Session and authentication context
//!
//! A single [`Session`] handle is injected into every component that talks to
//! the backend. It owns the bearer token, the signed-in user and the token
//! expiry, and it is the only place that reacts to an expired session.

use std::sync::{Arc, RwLock};
use std::time::Duration;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::Deserialize;
use tracing::{debug, info, warn};
use crate::models::User;
use crate::services::navigation::{Navigator, Route};
use crate::utils::errors::{EventHubError, Result};

#[derive(Debug, Clone)]
struct AuthState {
    token: String,
    user: Option<User>,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ExpiryClaims {
    #[serde(default)]
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying its signature.
///
/// The backend verifies tokens; the client only needs to know when to stop
/// sending one. Opaque tokens yield `None`.
fn token_expiry(token: &str) -> Option<DateTime<Utc>> {
    let mut validation = Validation::default();
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaims>(token, &DecodingKey::from_secret(&[]), &validation).ok()?;
    data.claims.exp.and_then(|exp| Utc.timestamp_opt(exp, 0).single())
}

/// Shared authentication context
#[derive(Clone)]
pub struct Session {
    state: Arc<RwLock<Option<AuthState>>>,
    navigator: Arc<dyn Navigator>,
}

impl Session {
    pub fn new(navigator: Arc<dyn Navigator>) -> Self {
        Self {
            state: Arc::new(RwLock::new(None)),
            navigator,
        }
    }

    /// Start a session with a bearer token
    pub fn sign_in(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(EventHubError::Authentication("Empty token".to_string()));
        }

        let expires_at = token_expiry(&token);
        if let Some(exp) = expires_at {
            if exp <= Utc::now() {
                return Err(EventHubError::Authentication("Token has already expired".to_string()));
            }
        }

        info!(expires_at = ?expires_at, "Session started");
        self.write(Some(AuthState {
            token,
            user: None,
            expires_at,
        }));
        Ok(())
    }

    /// Attach the signed-in user's profile
    pub fn set_user(&self, user: User) {
        if let Ok(mut guard) = self.state.write() {
            if let Some(state) = guard.as_mut() {
                state.user = Some(user);
            }
        }
    }

    pub fn current_user(&self) -> Option<User> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|s| s.user.clone()))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state
            .read()
            .ok()
            .and_then(|guard| guard.as_ref().and_then(|s| s.expires_at))
    }

    pub fn is_authenticated(&self) -> bool {
        let Ok(guard) = self.state.read() else {
            return false;
        };
        match guard.as_ref() {
            Some(state) => state.expires_at.map_or(true, |exp| exp > Utc::now()),
            None => false,
        }
    }

    /// Token to send with an authenticated request.
    ///
    /// A missing or expired token expires the session before failing.
    pub fn bearer_token(&self) -> Result<String> {
        let snapshot = self.state.read().ok().and_then(|guard| guard.clone());
        match snapshot {
            Some(state) if state.expires_at.map_or(true, |exp| exp > Utc::now()) => Ok(state.token),
            Some(_) => {
                self.expire();
                Err(EventHubError::Authentication("Session token expired".to_string()))
            }
            None => {
                self.expire();
                Err(EventHubError::Authentication("You must be logged in".to_string()))
            }
        }
    }

    /// Token if present, without expiring anything. Used by public endpoints.
    pub fn optional_token(&self) -> Option<String> {
        if !self.is_authenticated() {
            return None;
        }
        self.state.read().ok().and_then(|guard| guard.as_ref().map(|s| s.token.clone()))
    }

    /// Whether the token expires within `margin` and should be refreshed
    pub fn expires_within(&self, margin: Duration) -> bool {
        match self.expires_at() {
            Some(exp) => {
                let margin = chrono::Duration::from_std(margin).unwrap_or_else(|_| chrono::Duration::zero());
                exp - margin <= Utc::now()
            }
            None => false,
        }
    }

    /// Swap in a fresh token, keeping the signed-in user
    pub fn refresh(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        let expires_at = token_expiry(&token);
        if expires_at.is_some_and(|exp| exp <= Utc::now()) {
            warn!("Rejected refresh with an expired token");
            return Err(EventHubError::Authentication("Refresh token has already expired".to_string()));
        }

        let mut guard = self
            .state
            .write()
            .map_err(|_| EventHubError::Authentication("Session lock poisoned".to_string()))?;
        match guard.as_mut() {
            Some(state) => {
                state.token = token;
                state.expires_at = expires_at;
                debug!(expires_at = ?expires_at, "Session refreshed");
                Ok(())
            }
            None => Err(EventHubError::Authentication("No session to refresh".to_string())),
        }
    }

    /// Discard auth state and send the user to login, remembering where they were
    pub fn expire(&self) {
        self.write(None);

        let return_to = match self.navigator.current() {
            Some(Route::Login { return_to }) => return_to,
            Some(route) => Some(route.path()),
            None => None,
        };
        info!(return_to = ?return_to, "Session expired, redirecting to login");
        self.navigator.navigate(Route::Login { return_to });
    }

    /// End the session without redirecting
    pub fn sign_out(&self) {
        self.write(None);
    }

    fn write(&self, value: Option<AuthState>) {
        match self.state.write() {
            Ok(mut guard) => *guard = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.is_authenticated())
            .field("expires_at", &self.expires_at())
            .finish()
    }
}
