//! Services module
//!
//! This module contains the collaborators the engagement core is wired with:
//! the REST client, session, navigation, notifications, confirmation prompts,
//! the payment gateway and the retry policy.

pub mod api;
pub mod confirmation;
pub mod gateway;
pub mod navigation;
pub mod notification;
pub mod retry;
pub mod session;

// Re-export commonly used services
pub use api::ApiClient;
pub use confirmation::{AutoConfirm, ConfirmationPrompt, Confirmer, TerminalConfirmer};
pub use gateway::{HttpPaymentGateway, PaymentGateway};
pub use navigation::{HistoryNavigator, Navigator, Route};
pub use notification::{MemorySink, Notification, NotificationKind, NotificationService, NotificationSink, NotificationStats, TracingSink};
pub use retry::RetryPolicy;
pub use session::Session;

use std::sync::Arc;
use tracing::info;
use crate::config::settings::Settings;
use crate::engagement::{
    CheckoutRequest, EventStateSynchronizer, InFlightRegistry, ParticipationController, PaymentOrchestrator,
    ReviewLifecycleManager,
};
use crate::handlers::{CheckoutPage, EventDetailPage};
use crate::models::User;
use crate::utils::errors::Result;

/// Service factory for creating and wiring all services
#[derive(Clone)]
pub struct ServiceFactory {
    pub settings: Settings,
    pub session: Session,
    pub navigator: Arc<dyn Navigator>,
    pub api: ApiClient,
    pub notifications: NotificationService,
    pub confirmer: Arc<dyn Confirmer>,
    pub in_flight: InFlightRegistry,
    pub synchronizer: EventStateSynchronizer,
    pub participation: ParticipationController,
    pub payments: PaymentOrchestrator,
    pub reviews: ReviewLifecycleManager,
}

impl ServiceFactory {
    /// Create a new ServiceFactory using the HTTP payment gateway from `settings`
    pub fn new(
        settings: Settings,
        navigator: Arc<dyn Navigator>,
        confirmer: Arc<dyn Confirmer>,
        sink: Arc<dyn NotificationSink>,
    ) -> Result<Self> {
        let gateway = HttpPaymentGateway::shared(&settings.payments)?;
        Self::with_gateway(settings, navigator, confirmer, sink, gateway)
    }

    /// Create a new ServiceFactory with an explicit payment gateway
    pub fn with_gateway(
        settings: Settings,
        navigator: Arc<dyn Navigator>,
        confirmer: Arc<dyn Confirmer>,
        sink: Arc<dyn NotificationSink>,
        gateway: Arc<dyn PaymentGateway>,
    ) -> Result<Self> {
        let session = Session::new(navigator.clone());
        let api = ApiClient::new(&settings, session.clone())?;
        let notifications = NotificationService::new(sink);
        let in_flight = InFlightRegistry::new();

        let synchronizer = EventStateSynchronizer::new(api.clone(), session.clone());
        let participation = ParticipationController::new(
            api.clone(),
            synchronizer.clone(),
            confirmer.clone(),
            in_flight.clone(),
        );
        let payments = PaymentOrchestrator::new(api.clone(), gateway, synchronizer.clone(), in_flight.clone());
        let reviews = ReviewLifecycleManager::new(
            api.clone(),
            synchronizer.clone(),
            confirmer.clone(),
            in_flight.clone(),
        );

        Ok(Self {
            settings,
            session,
            navigator,
            api,
            notifications,
            confirmer,
            in_flight,
            synchronizer,
            participation,
            payments,
            reviews,
        })
    }

    /// Sign in with the configured token and load the user's profile.
    ///
    /// Returns `None` when no token is configured.
    pub async fn bootstrap_session(&self) -> Result<Option<User>> {
        let Some(token) = self.settings.session.token.clone() else {
            return Ok(None);
        };

        self.session.sign_in(token)?;
        let user = self.api.current_user().await?;
        self.session.set_user(user.clone());

        info!(user_id = %user.id, role = %user.role, "Signed in");
        Ok(Some(user))
    }

    /// Whether the session token should be refreshed now
    pub fn session_needs_refresh(&self) -> bool {
        self.session.expires_within(self.settings.session.refresh_margin())
    }

    pub fn event_detail_page(&self, event_id: impl Into<String>) -> EventDetailPage {
        EventDetailPage::new(self.clone(), event_id.into())
    }

    pub fn checkout_page(&self, request: CheckoutRequest) -> Result<CheckoutPage> {
        CheckoutPage::new(self.clone(), request)
    }
}
