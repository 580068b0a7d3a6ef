//! Mock marketplace API and payment gateway for testing
//!
//! One wiremock server plays both roles: the REST backend lives under `/api`
//! and the gateway under `/v1`.

use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;
use wiremock::{
    matchers::{body_partial_json, header_exists, method, path},
    Mock, MockServer, ResponseTemplate,
};

use EventHub::models::{EligibilityResult, Event, PaymentIntent, Review, ReviewSummary, User};

/// Wrap `data` in the backend envelope
pub fn envelope<T: Serialize>(data: T) -> Value {
    json!({ "success": true, "data": data })
}

/// Envelope for a rejected request
pub fn rejection(message: &str) -> Value {
    json!({ "success": false, "message": message })
}

pub struct ApiMockServer {
    pub server: MockServer,
}

impl ApiMockServer {
    pub async fn new() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn api_url(&self) -> String {
        format!("{}/api", self.server.uri())
    }

    pub fn gateway_url(&self) -> String {
        self.server.uri()
    }

    /// Number of requests received for `method path`
    pub async fn request_count(&self, http_method: &str, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == http_method && r.url.path() == request_path)
            .count()
    }

    pub async fn mock_get_event(&self, event: &Event) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}", event.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(event)))
            .mount(&self.server)
            .await;
    }

    /// Serve `event` for the next `times` fetches only
    pub async fn mock_get_event_times(&self, event: &Event, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}", event.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(event)))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_get_event_status(&self, event_id: &str, status: u16, expected: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}", event_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(rejection("unavailable")))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_can_join(&self, event_id: &str, result: &EligibilityResult) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}/can-join", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(result)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_can_join_status(&self, event_id: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}/can-join", event_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(rejection("Unauthorized")))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_join(&self, event_id: &str, status: u16, body: Value, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/api/events/{}/join", event_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_join_delayed(&self, event_id: &str, delay: Duration, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/api/events/{}/join", event_id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true }))
                    .set_delay(delay),
            )
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_leave(&self, event_id: &str, status: u16, expected: u64) {
        let body = if status == 200 {
            json!({ "success": true })
        } else {
            rejection("Could not leave event")
        };
        Mock::given(method("POST"))
            .and(path(format!("/api/events/{}/leave", event_id)))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_reviews(&self, event_id: &str, summary: &ReviewSummary) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}/reviews", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(summary)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_review_check(&self, event_id: &str, review: Option<&Review>) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}/reviews/check", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(review)))
            .mount(&self.server)
            .await;
    }

    pub async fn mock_review_check_times(&self, event_id: &str, review: Option<&Review>, times: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/api/events/{}/reviews/check", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(review)))
            .up_to_n_times(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_create_review(&self, event_id: &str, review: &Review, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/api/events/{}/reviews", event_id)))
            .respond_with(ResponseTemplate::new(201).set_body_json(envelope(review)))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_update_review(&self, event_id: &str, review: &Review, expected: u64) {
        Mock::given(method("PUT"))
            .and(path(format!("/api/events/{}/reviews/{}", event_id, review.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(review)))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_delete_review(&self, event_id: &str, review_id: &str, expected: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/events/{}/reviews/{}", event_id, review_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_delete_event(&self, event_id: &str, expected: u64) {
        Mock::given(method("DELETE"))
            .and(path(format!("/api/events/{}", event_id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_current_user(&self, user: &User) {
        Mock::given(method("GET"))
            .and(path("/api/auth/me"))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(user)))
            .mount(&self.server)
            .await;
    }

    /// Intent creation; requires the idempotency header
    pub async fn mock_create_intent(&self, intent: &PaymentIntent, expected: u64) {
        let body = json!({
            "paymentIntentId": intent.id,
            "clientSecret": intent.client_secret,
            "amount": intent.amount,
            "eventId": intent.event_id,
        });
        Mock::given(method("POST"))
            .and(path("/api/payments/create-intent"))
            .and(header_exists("Idempotency-Key"))
            .and(body_partial_json(json!({ "eventId": intent.event_id })))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(body)))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_confirm_payment(&self, intent: &PaymentIntent, expected: u64) {
        Mock::given(method("POST"))
            .and(path("/api/payments/confirm"))
            .and(body_partial_json(json!({
                "paymentIntentId": intent.id,
                "eventId": intent.event_id,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(envelope(json!({
                "_id": "pay_1",
                "paymentIntentId": intent.id,
                "eventId": intent.event_id,
                "amount": intent.amount,
                "status": "completed",
            }))))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Backend confirmation that answers slower than the client timeout, once
    pub async fn mock_confirm_payment_hanging(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/api/payments/confirm"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "success": true }))
                    .set_delay(delay),
            )
            .up_to_n_times(1)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_gateway_success(&self, intent: &PaymentIntent, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/payment_intents/{}/confirm", intent.id)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": intent.id,
                "status": "succeeded",
            })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }

    /// Decline the next `times` card confirmations
    pub async fn mock_gateway_decline(&self, intent: &PaymentIntent, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/payment_intents/{}/confirm", intent.id)))
            .respond_with(ResponseTemplate::new(402).set_body_json(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "decline_code": "generic_decline",
                    "message": "Your card was declined."
                }
            })))
            .up_to_n_times(times)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    pub async fn mock_gateway_unused(&self, intent: &PaymentIntent) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/payment_intents/{}/confirm", intent.id)))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&self.server)
            .await;
    }

    /// Fail the next `times` card confirmations with a 503
    pub async fn mock_gateway_unavailable(&self, intent: &PaymentIntent, times: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/payment_intents/{}/confirm", intent.id)))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(times)
            .expect(times)
            .mount(&self.server)
            .await;
    }

    /// Reject a repeated confirmation of an intent that was already charged
    pub async fn mock_gateway_already_succeeded(&self, intent: &PaymentIntent, expected: u64) {
        Mock::given(method("POST"))
            .and(path(format!("/v1/payment_intents/{}/confirm", intent.id)))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "payment_intent_unexpected_state",
                    "message": "This PaymentIntent has already succeeded."
                }
            })))
            .expect(expected)
            .mount(&self.server)
            .await;
    }
}
