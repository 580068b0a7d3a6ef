//! Paid checkout as a two-phase commit
//!
//! 1. create a payment intent (once per checkout session)
//! 2. confirm the card with the gateway
//! 3. confirm the intent with the backend, which alone grants participation
//!
//! Steps 2 and 3 are not atomic. A captured payment whose backend
//! confirmation failed stays in [`CheckoutPhase::PaymentCaptured`] and is
//! reported as an inconsistency until [`PaymentOrchestrator::retry_confirmation`]
//! succeeds. A gateway timeout or 5xx leaves [`CheckoutPhase::PaymentUnknown`]:
//! the same intent may be paid again or confirmed with the backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tracing::{error, info, warn};
use crate::engagement::guard::{Action, InFlightGuard, InFlightRegistry};
use crate::engagement::participation::CheckoutRequest;
use crate::engagement::sync::{EventStateSynchronizer, EventView};
use crate::models::{CardDetails, PaymentIntent, PaymentRecord};
use crate::services::api::ApiClient;
use crate::services::gateway::PaymentGateway;
use crate::utils::errors::{EventHubError, PaymentError, Result};
use crate::utils::helpers::{amounts_match, generate_idempotency_key};
use crate::utils::logging::log_payment_step;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutPhase {
    AwaitingIntent,
    IntentReady,
    IntentFailed,
    /// The gateway refused the card; another card may be tried
    PaymentDeclined,
    /// The gateway did not answer; the card may have been charged
    PaymentUnknown,
    /// Money captured, participation not yet confirmed
    PaymentCaptured,
    Completed,
}

impl CheckoutPhase {
    fn can_transition_to(self, next: CheckoutPhase) -> bool {
        use CheckoutPhase::*;
        matches!(
            (self, next),
            (AwaitingIntent, IntentReady)
                | (AwaitingIntent, IntentFailed)
                | (IntentReady, PaymentDeclined)
                | (IntentReady, PaymentUnknown)
                | (IntentReady, PaymentCaptured)
                | (PaymentDeclined, PaymentDeclined)
                | (PaymentDeclined, PaymentUnknown)
                | (PaymentDeclined, PaymentCaptured)
                | (PaymentUnknown, PaymentDeclined)
                | (PaymentUnknown, PaymentUnknown)
                | (PaymentUnknown, PaymentCaptured)
                | (PaymentUnknown, Completed)
                | (PaymentCaptured, Completed)
        )
    }

    /// A card may be submitted
    pub fn accepts_payment(self) -> bool {
        matches!(
            self,
            CheckoutPhase::IntentReady | CheckoutPhase::PaymentDeclined | CheckoutPhase::PaymentUnknown
        )
    }

    /// The backend may be asked to confirm the intent
    pub fn accepts_confirmation(self) -> bool {
        matches!(self, CheckoutPhase::PaymentCaptured | CheckoutPhase::PaymentUnknown)
    }
}

impl std::fmt::Display for CheckoutPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CheckoutPhase::AwaitingIntent => "awaiting_intent",
            CheckoutPhase::IntentReady => "intent_ready",
            CheckoutPhase::IntentFailed => "intent_failed",
            CheckoutPhase::PaymentDeclined => "payment_declined",
            CheckoutPhase::PaymentUnknown => "payment_unknown",
            CheckoutPhase::PaymentCaptured => "payment_captured",
            CheckoutPhase::Completed => "completed",
        };
        write!(f, "{}", name)
    }
}

/// One mounted checkout for one event
#[derive(Debug)]
pub struct CheckoutSession {
    request: CheckoutRequest,
    idempotency_key: String,
    intent_requested: AtomicBool,
    intent: OnceLock<PaymentIntent>,
    phase: Mutex<CheckoutPhase>,
    _claim: InFlightGuard,
}

impl CheckoutSession {
    pub fn request(&self) -> &CheckoutRequest {
        &self.request
    }

    pub fn event_id(&self) -> &str {
        self.request.event_id()
    }

    pub fn idempotency_key(&self) -> &str {
        &self.idempotency_key
    }

    pub fn intent(&self) -> Option<&PaymentIntent> {
        self.intent.get()
    }

    pub fn phase(&self) -> CheckoutPhase {
        match self.phase.lock() {
            Ok(phase) => *phase,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn advance(&self, next: CheckoutPhase) -> Result<()> {
        let mut phase = match self.phase.lock() {
            Ok(phase) => phase,
            Err(poisoned) => poisoned.into_inner(),
        };
        if !phase.can_transition_to(next) {
            return Err(EventHubError::InvalidStateTransition {
                from: phase.to_string(),
                to: next.to_string(),
            });
        }
        *phase = next;
        Ok(())
    }
}

/// Result of a completed checkout
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutOutcome {
    pub record: PaymentRecord,
    /// Resynchronized view; `None` if the refetch failed after confirmation
    pub view: Option<EventView>,
}

#[derive(Clone)]
pub struct PaymentOrchestrator {
    api: ApiClient,
    gateway: Arc<dyn PaymentGateway>,
    sync: EventStateSynchronizer,
    in_flight: InFlightRegistry,
}

impl PaymentOrchestrator {
    pub fn new(
        api: ApiClient,
        gateway: Arc<dyn PaymentGateway>,
        sync: EventStateSynchronizer,
        in_flight: InFlightRegistry,
    ) -> Self {
        Self {
            api,
            gateway,
            sync,
            in_flight,
        }
    }

    /// Open a checkout session. Only one may exist per event at a time.
    pub fn begin_checkout(&self, request: CheckoutRequest) -> Result<CheckoutSession> {
        if request.amount() <= 0.0 {
            return Err(EventHubError::Validation("Free events do not require checkout".to_string()));
        }

        let claim = self.in_flight.try_begin(request.event_id(), Action::Checkout)?;
        let session = CheckoutSession {
            request,
            idempotency_key: generate_idempotency_key(),
            intent_requested: AtomicBool::new(false),
            intent: OnceLock::new(),
            phase: Mutex::new(CheckoutPhase::AwaitingIntent),
            _claim: claim,
        };
        info!(event_id = session.event_id(), amount = session.request.amount(), "Checkout started");
        Ok(session)
    }

    /// Create the payment intent on first call; later calls reuse it.
    ///
    /// Intent creation is attempted at most once per session.
    pub async fn ensure_intent(&self, session: &CheckoutSession) -> Result<PaymentIntent> {
        if let Some(intent) = session.intent.get() {
            return Ok(intent.clone());
        }

        if session.intent_requested.swap(true, Ordering::SeqCst) {
            return Err(match session.phase() {
                CheckoutPhase::IntentFailed => EventHubError::InvalidStateTransition {
                    from: CheckoutPhase::IntentFailed.to_string(),
                    to: CheckoutPhase::IntentReady.to_string(),
                },
                _ => EventHubError::InFlight {
                    event_id: session.event_id().to_string(),
                    action: "create payment intent".to_string(),
                },
            });
        }

        let request = &session.request;
        let created = self
            .api
            .create_payment_intent(request.event_id(), request.amount(), &session.idempotency_key)
            .await
            .and_then(|intent| {
                if intent.event_id != request.event_id() || !amounts_match(intent.amount, request.amount()) {
                    return Err(PaymentError::InvalidResponse(format!(
                        "Payment intent {} does not match event {} for {:.2}",
                        intent.id,
                        request.event_id(),
                        request.amount()
                    ))
                    .into());
                }
                Ok(intent)
            });

        match created {
            Ok(intent) => {
                let intent = session.intent.get_or_init(|| intent).clone();
                session.advance(CheckoutPhase::IntentReady)?;
                log_payment_step(request.event_id(), Some(&intent.id), "create_intent", true);
                Ok(intent)
            }
            Err(e) => {
                session.advance(CheckoutPhase::IntentFailed)?;
                log_payment_step(request.event_id(), None, "create_intent", false);
                Err(e)
            }
        }
    }

    /// Confirm the card with the gateway, then the intent with the backend
    pub async fn pay(&self, session: &CheckoutSession, card: &CardDetails) -> Result<CheckoutOutcome> {
        let _guard = self.in_flight.try_begin(session.event_id(), Action::Pay)?;

        let phase = session.phase();
        if !phase.accepts_payment() {
            return Err(EventHubError::InvalidStateTransition {
                from: phase.to_string(),
                to: CheckoutPhase::PaymentCaptured.to_string(),
            });
        }
        let intent = session
            .intent()
            .cloned()
            .ok_or_else(|| EventHubError::Validation("Payment is not ready yet".to_string()))?;

        card.validate()?;

        match self.gateway.confirm_card_payment(&intent.client_secret, card).await {
            Ok(confirmation) => {
                session.advance(CheckoutPhase::PaymentCaptured)?;
                info!(payment_intent_id = %intent.id, gateway_id = %confirmation.id, "Gateway captured payment");
                log_payment_step(session.event_id(), Some(&intent.id), "gateway_confirm", true);
            }
            Err(PaymentError::AlreadySucceeded(_)) => {
                session.advance(CheckoutPhase::PaymentCaptured)?;
                warn!(payment_intent_id = %intent.id, "Gateway reports an earlier attempt already captured the payment");
                log_payment_step(session.event_id(), Some(&intent.id), "gateway_confirm", true);
            }
            Err(e @ PaymentError::GatewayUnavailable(_)) => {
                session.advance(CheckoutPhase::PaymentUnknown)?;
                warn!(
                    payment_intent_id = %intent.id,
                    error = %e,
                    "Gateway outcome unknown; pay again or confirm with the backend"
                );
                log_payment_step(session.event_id(), Some(&intent.id), "gateway_confirm", false);
                return Err(e.into());
            }
            Err(e) => {
                session.advance(CheckoutPhase::PaymentDeclined)?;
                log_payment_step(session.event_id(), Some(&intent.id), "gateway_confirm", false);
                return Err(e.into());
            }
        }

        self.confirm_with_backend(session, &intent).await
    }

    /// Repeat the backend confirmation for a captured payment, or ask the
    /// backend to settle one whose gateway outcome is unknown
    pub async fn retry_confirmation(&self, session: &CheckoutSession) -> Result<CheckoutOutcome> {
        let _guard = self.in_flight.try_begin(session.event_id(), Action::Pay)?;

        let phase = session.phase();
        if !phase.accepts_confirmation() {
            return Err(EventHubError::InvalidStateTransition {
                from: phase.to_string(),
                to: CheckoutPhase::Completed.to_string(),
            });
        }
        let intent = session
            .intent()
            .cloned()
            .ok_or_else(|| EventHubError::Validation("No payment intent to confirm".to_string()))?;

        info!(payment_intent_id = %intent.id, phase = %phase, "Retrying backend payment confirmation");
        self.confirm_with_backend(session, &intent).await
    }

    async fn confirm_with_backend(&self, session: &CheckoutSession, intent: &PaymentIntent) -> Result<CheckoutOutcome> {
        let event_id = session.event_id();

        let record = match self.api.confirm_payment(&intent.id, event_id).await {
            Ok(record) => record,
            // the backend checked the intent with the gateway and found no charge
            Err(e @ EventHubError::BusinessRule { .. }) if session.phase() == CheckoutPhase::PaymentUnknown => {
                log_payment_step(event_id, Some(&intent.id), "backend_confirm", false);
                return Err(e);
            }
            Err(e) => {
                error!(
                    payment_intent_id = %intent.id,
                    event_id = event_id,
                    error = %e,
                    "Payment captured but backend confirmation failed"
                );
                log_payment_step(event_id, Some(&intent.id), "backend_confirm", false);
                return Err(EventHubError::Inconsistency {
                    payment_intent_id: intent.id.clone(),
                    event_id: event_id.to_string(),
                    reason: e.to_string(),
                });
            }
        };

        session.advance(CheckoutPhase::Completed)?;
        log_payment_step(event_id, Some(&intent.id), "backend_confirm", true);

        let view = match self.sync.resync(event_id).await {
            Ok(view) => Some(view),
            Err(e) => {
                warn!(event_id = event_id, error = %e, "Resynchronization after checkout failed");
                None
            }
        };

        Ok(CheckoutOutcome { record, view })
    }
}
