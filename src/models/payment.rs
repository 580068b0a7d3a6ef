//! Payment models

use std::sync::OnceLock;
use chrono::{Datelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use crate::utils::errors::{EventHubError, Result};
use crate::utils::helpers::mask_card_number;

/// Server-issued handle for one checkout attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
    #[serde(alias = "paymentIntentId")]
    pub id: String,
    pub client_secret: String,
    pub amount: f64,
    pub event_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest<'a> {
    pub event_id: &'a str,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest<'a> {
    pub payment_intent_id: &'a str,
    pub event_id: &'a str,
}

/// Backend record produced by a successful payment confirmation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    #[serde(alias = "_id", default)]
    pub id: Option<String>,
    pub payment_intent_id: String,
    pub event_id: String,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Gateway-side outcome of confirming a card payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatewayStatus {
    Succeeded,
    Processing,
    RequiresAction,
    RequiresPaymentMethod,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfirmation {
    pub id: String,
    pub status: GatewayStatus,
}

/// Raw card input collected by the checkout form
#[derive(Clone, Serialize)]
pub struct CardDetails {
    pub number: String,
    pub exp_month: u32,
    pub exp_year: i32,
    pub cvc: String,
}

fn card_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{13,19}$").expect("valid card number pattern"))
}

fn cvc_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{3,4}$").expect("valid cvc pattern"))
}

impl CardDetails {
    pub fn new(number: impl Into<String>, exp_month: u32, exp_year: i32, cvc: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            exp_month,
            exp_year,
            cvc: cvc.into(),
        }
    }

    /// Card number with spaces and dashes removed
    pub fn normalized_number(&self) -> String {
        self.number.chars().filter(|c| !c.is_whitespace() && *c != '-').collect()
    }

    /// Client-side format checks; the gateway still decides acceptance
    pub fn validate(&self) -> Result<()> {
        if !card_number_pattern().is_match(&self.normalized_number()) {
            return Err(EventHubError::Validation("Card number must be 13 to 19 digits".to_string()));
        }
        if !(1..=12).contains(&self.exp_month) {
            return Err(EventHubError::Validation("Expiry month must be between 1 and 12".to_string()));
        }

        let today = Utc::now().date_naive();
        let expired = self.exp_year < today.year()
            || (self.exp_year == today.year() && self.exp_month < today.month());
        if self.exp_year < 1000 || self.exp_year > 9999 || expired {
            return Err(EventHubError::Validation("Card has expired or the expiry year is invalid".to_string()));
        }

        if !cvc_pattern().is_match(&self.cvc) {
            return Err(EventHubError::Validation("CVC must be 3 or 4 digits".to_string()));
        }

        Ok(())
    }
}

impl std::fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CardDetails")
            .field("number", &mask_card_number(&self.number))
            .field("exp_month", &self.exp_month)
            .field("exp_year", &self.exp_year)
            .field("cvc", &"***")
            .finish()
    }
}
