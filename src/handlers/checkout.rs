//! Checkout page controller

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use crate::engagement::{CheckoutOutcome, CheckoutPhase, CheckoutRequest, CheckoutSession};
use crate::handlers::report_error;
use crate::models::{CardDetails, PaymentIntent};
use crate::services::navigation::Route;
use crate::services::ServiceFactory;
use crate::utils::errors::{EventHubError, PaymentError, Result};

pub struct CheckoutPage {
    services: ServiceFactory,
    checkout: CheckoutSession,
    mounted: AtomicBool,
    outcome: Mutex<Option<CheckoutOutcome>>,
}

impl CheckoutPage {
    pub fn new(services: ServiceFactory, request: CheckoutRequest) -> Result<Self> {
        let checkout = services.payments.begin_checkout(request)?;
        Ok(Self {
            services,
            checkout,
            mounted: AtomicBool::new(true),
            outcome: Mutex::new(None),
        })
    }

    pub fn request(&self) -> &CheckoutRequest {
        self.checkout.request()
    }

    pub fn phase(&self) -> CheckoutPhase {
        self.checkout.phase()
    }

    pub fn outcome(&self) -> Option<CheckoutOutcome> {
        self.outcome.lock().ok().and_then(|o| o.clone())
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::SeqCst)
    }

    pub fn unmount(&self) {
        debug!(event_id = self.checkout.event_id(), "Checkout page unmounted");
        self.mounted.store(false, Ordering::SeqCst);
    }

    /// Prepare the payment intent. Safe to call repeatedly.
    pub async fn mount(&self) -> Result<PaymentIntent> {
        self.ensure_mounted()?;
        match self.services.payments.ensure_intent(&self.checkout).await {
            Ok(intent) => Ok(intent),
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Pay with `card`
    pub async fn submit(&self, card: &CardDetails) -> Result<CheckoutOutcome> {
        self.ensure_mounted()?;
        let result = self.services.payments.pay(&self.checkout, card).await;
        self.finish(result)
    }

    /// Confirm a captured payment again, or settle one the gateway never answered for
    pub async fn retry_confirmation(&self) -> Result<CheckoutOutcome> {
        self.ensure_mounted()?;
        let result = self.services.payments.retry_confirmation(&self.checkout).await;
        self.finish(result)
    }

    fn finish(&self, result: Result<CheckoutOutcome>) -> Result<CheckoutOutcome> {
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => return Err(self.fail(e)),
        };

        if !self.is_mounted() {
            debug!(event_id = self.checkout.event_id(), "Dropping checkout result for unmounted page");
            return Ok(outcome);
        }

        if let Ok(mut slot) = self.outcome.lock() {
            *slot = Some(outcome.clone());
        }
        let title = self.checkout.request().event_title().to_string();
        if let Err(e) = self
            .services
            .notifications
            .notify_template("payment_completed", &[("event_title", title.as_str())])
        {
            warn!(error = %e, "Notification template missing");
        }
        self.services.navigator.navigate(Route::Event {
            id: self.checkout.event_id().to_string(),
        });
        Ok(outcome)
    }

    fn ensure_mounted(&self) -> Result<()> {
        if self.is_mounted() {
            Ok(())
        } else {
            Err(EventHubError::Unmounted)
        }
    }

    fn fail(&self, error: EventHubError) -> EventHubError {
        if !self.is_mounted() {
            // an unconfirmed capture is never dropped silently
            if matches!(error, EventHubError::Inconsistency { .. }) {
                warn!(error = %error, "Unconfirmed payment on unmounted checkout");
            } else {
                debug!(error = %error, "Dropping checkout error for unmounted page");
            }
            return error;
        }

        let notifications = &self.services.notifications;
        let title = self.checkout.request().event_title().to_string();
        let delivered = match &error {
            EventHubError::Payment(PaymentError::GatewayUnavailable(_)) => {
                notifications.notify_template("payment_pending", &[("event_title", title.as_str())])
            }
            EventHubError::Payment(payment) => {
                let reason = payment.to_string();
                notifications.notify_template("payment_declined", &[("reason", reason.as_str())])
            }
            EventHubError::Inconsistency { payment_intent_id, .. } => notifications.notify_template(
                "payment_unconfirmed",
                &[("payment_intent_id", payment_intent_id.as_str()), ("event_title", title.as_str())],
            ),
            _ => {
                report_error(notifications, &error);
                Ok(())
            }
        };
        if let Err(e) = delivered {
            warn!(error = %e, "Notification template missing");
            notifications.notify_error(&error);
        }
        error
    }
}
