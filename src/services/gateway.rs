//! Payment gateway client
//!
//! The gateway confirms a card payment against a payment intent's client
//! secret. Success here captures money but grants nothing; participation is
//! only registered by the backend confirmation that follows.

use std::sync::Arc;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, info, warn};
use crate::config::PaymentsConfig;
use crate::models::{CardDetails, GatewayConfirmation, GatewayStatus};
use crate::utils::errors::{EventHubError, PaymentError, PaymentResult, Result};

/// Payment gateway abstraction
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Confirm a card payment for the intent identified by `client_secret`
    async fn confirm_card_payment(&self, client_secret: &str, card: &CardDetails) -> PaymentResult<GatewayConfirmation>;
}

#[derive(Debug, Deserialize)]
struct GatewayErrorBody {
    error: GatewayErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GatewayErrorDetail {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    decline_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    payment_intent: Option<GatewayIntentState>,
}

#[derive(Debug, Deserialize)]
struct GatewayIntentState {
    #[serde(default)]
    status: Option<String>,
}

/// Intent id embedded in a `pi_..._secret_...` client secret
pub fn intent_id_from_secret(client_secret: &str) -> Option<&str> {
    client_secret
        .split_once("_secret_")
        .map(|(id, _)| id)
        .filter(|id| !id.is_empty())
}

/// Gateway client speaking the payment-intents HTTP API
#[derive(Clone, Debug)]
pub struct HttpPaymentGateway {
    client: Client,
    base_url: String,
    publishable_key: String,
}

impl HttpPaymentGateway {
    /// Create a new HttpPaymentGateway instance
    pub fn new(config: &PaymentsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("EventHub-Client/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(EventHubError::Network)?;

        Ok(Self {
            client,
            base_url: config.gateway_url.trim_end_matches('/').to_string(),
            publishable_key: config.publishable_key.clone(),
        })
    }

    pub fn shared(config: &PaymentsConfig) -> Result<Arc<dyn PaymentGateway>> {
        Ok(Arc::new(Self::new(config)?))
    }

    fn decline_from(intent_id: &str, detail: GatewayErrorDetail) -> PaymentError {
        if Self::reports_success(&detail) {
            return PaymentError::AlreadySucceeded(intent_id.to_string());
        }

        let message = detail
            .message
            .unwrap_or_else(|| "Your card was declined.".to_string());
        match detail.kind.as_deref() {
            Some("card_error") | None => PaymentError::Declined {
                code: detail
                    .decline_code
                    .or(detail.code)
                    .unwrap_or_else(|| "card_declined".to_string()),
                message,
            },
            Some(_) => PaymentError::InvalidCard(message),
        }
    }

    /// A confirm rejected because an earlier attempt already captured the payment
    fn reports_success(detail: &GatewayErrorDetail) -> bool {
        let intent_succeeded = detail
            .payment_intent
            .as_ref()
            .and_then(|intent| intent.status.as_deref())
            == Some("succeeded");
        let says_succeeded = detail
            .message
            .as_deref()
            .map_or(false, |m| m.to_ascii_lowercase().contains("already succeeded"));

        intent_succeeded || (says_succeeded && detail.kind.as_deref() != Some("card_error"))
    }
}

#[async_trait]
impl PaymentGateway for HttpPaymentGateway {
    async fn confirm_card_payment(&self, client_secret: &str, card: &CardDetails) -> PaymentResult<GatewayConfirmation> {
        let intent_id = intent_id_from_secret(client_secret)
            .ok_or_else(|| PaymentError::InvalidResponse("Malformed client secret".to_string()))?;

        let url = format!("{}/v1/payment_intents/{}/confirm", self.base_url, intent_id);
        debug!(payment_intent_id = intent_id, card = ?card, "Confirming card payment");

        let exp_month = card.exp_month.to_string();
        let exp_year = card.exp_year.to_string();
        let number = card.normalized_number();
        let form = [
            ("client_secret", client_secret),
            ("payment_method_data[type]", "card"),
            ("payment_method_data[card][number]", number.as_str()),
            ("payment_method_data[card][exp_month]", exp_month.as_str()),
            ("payment_method_data[card][exp_year]", exp_year.as_str()),
            ("payment_method_data[card][cvc]", card.cvc.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.publishable_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| PaymentError::GatewayUnavailable(e.to_string()))?;

        if status.is_server_error() {
            warn!(payment_intent_id = intent_id, status = status.as_u16(), "Payment gateway unavailable");
            return Err(PaymentError::GatewayUnavailable(format!("Gateway returned {}", status)));
        }

        if !status.is_success() {
            let error = match serde_json::from_str::<GatewayErrorBody>(&body) {
                Ok(parsed) => Self::decline_from(intent_id, parsed.error),
                Err(_) if status == StatusCode::PAYMENT_REQUIRED => PaymentError::Declined {
                    code: "card_declined".to_string(),
                    message: "Your card was declined.".to_string(),
                },
                Err(_) => PaymentError::InvalidResponse(format!("Gateway returned {}", status)),
            };
            warn!(payment_intent_id = intent_id, error = %error, "Card payment rejected");
            return Err(error);
        }

        let confirmation: GatewayConfirmation = serde_json::from_str(&body)
            .map_err(|e| PaymentError::InvalidResponse(e.to_string()))?;

        match confirmation.status {
            GatewayStatus::Succeeded => {
                info!(payment_intent_id = %confirmation.id, "Card payment captured");
                Ok(confirmation)
            }
            other => {
                warn!(payment_intent_id = %confirmation.id, status = ?other, "Card payment not completed");
                Err(PaymentError::RequiresAction)
            }
        }
    }
}
