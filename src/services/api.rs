//! Marketplace REST API client
//!
//! Wraps every endpoint the engagement core consumes. All responses use the
//! `{ success, data?, message? }` envelope. HTTP 401 anywhere expires the
//! injected [`Session`]; idempotent requests go through the retry policy.

use reqwest::{header::HeaderValue, Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;
use crate::config::Settings;
use crate::models::{
    ApiEnvelope, ConfirmPaymentRequest, CreateIntentRequest, EligibilityResult, Event, PaymentIntent,
    PaymentRecord, Review, ReviewDraft, ReviewSummary, User,
};
use crate::services::retry::RetryPolicy;
use crate::services::session::Session;
use crate::utils::errors::{EventHubError, Result};
use crate::utils::logging::log_api_error;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// Bearer token required; a missing token expires the session
    Required,
    /// Token sent when available
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delivery {
    /// Safe to repeat: retried with backoff
    Idempotent,
    /// Sent exactly once
    Once,
}

struct ApiRequest<'a> {
    operation: &'a str,
    method: Method,
    /// Path segments below the base URL, percent-encoded when the URL is built
    path: Vec<&'a str>,
    body: Option<Value>,
    auth: Auth,
    delivery: Delivery,
    idempotency_key: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReviewsPayload {
    Summary(ReviewSummary),
    List(Vec<Review>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ReviewCheckPayload {
    Direct(Review),
    Wrapped {
        #[serde(default)]
        review: Option<Review>,
    },
}

/// REST client for the events backend
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    session: Session,
    retry: RetryPolicy,
}

impl ApiClient {
    /// Create a new ApiClient instance
    pub fn new(settings: &Settings, session: Session) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.api.timeout())
            .user_agent(settings.api.user_agent.clone())
            .build()
            .map_err(EventHubError::Network)?;

        Self::with_client(client, &settings.api.base_url, session, RetryPolicy::from(&settings.retry))
    }

    pub fn with_client(client: Client, base_url: &str, session: Session, retry: RetryPolicy) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(EventHubError::Config(format!("API base URL {} cannot carry a path", base_url)));
        }

        Ok(Self {
            client,
            base_url,
            session,
            retry,
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// `GET /events/:id`
    pub async fn get_event(&self, event_id: &str) -> Result<Event> {
        let request = ApiRequest {
            operation: "get_event",
            method: Method::GET,
            path: vec!["events", event_id],
            body: None,
            auth: Auth::Optional,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        self.call(request).await?.ok_or_else(|| missing_data("get_event"))
    }

    /// `POST /events/:id/join`
    pub async fn join_event(&self, event_id: &str) -> Result<()> {
        let request = ApiRequest {
            operation: "join_event",
            method: Method::POST,
            path: vec!["events", event_id, "join"],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Once,
            idempotency_key: None,
        };
        self.call::<Value>(request).await.map(|_| ())
    }

    /// `POST /events/:id/leave`
    pub async fn leave_event(&self, event_id: &str) -> Result<()> {
        let request = ApiRequest {
            operation: "leave_event",
            method: Method::POST,
            path: vec!["events", event_id, "leave"],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Once,
            idempotency_key: None,
        };
        self.call::<Value>(request).await.map(|_| ())
    }

    /// `GET /events/:id/can-join`
    pub async fn can_join(&self, event_id: &str) -> Result<EligibilityResult> {
        let request = ApiRequest {
            operation: "can_join",
            method: Method::GET,
            path: vec!["events", event_id, "can-join"],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        self.call(request).await?.ok_or_else(|| missing_data("can_join"))
    }

    /// `GET /events/:id/reviews`
    pub async fn list_reviews(&self, event_id: &str) -> Result<ReviewSummary> {
        let request = ApiRequest {
            operation: "list_reviews",
            method: Method::GET,
            path: vec!["events", event_id, "reviews"],
            body: None,
            auth: Auth::Optional,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        let summary = match self.call::<ReviewsPayload>(request).await? {
            Some(ReviewsPayload::Summary(summary)) => summary,
            Some(ReviewsPayload::List(reviews)) => ReviewSummary {
                total_reviews: reviews.len() as u32,
                reviews,
                average_rating: None,
            },
            None => ReviewSummary::default(),
        };
        Ok(summary)
    }

    /// `GET /events/:id/reviews/check`: the current user's review, if any
    pub async fn check_review(&self, event_id: &str) -> Result<Option<Review>> {
        let request = ApiRequest {
            operation: "check_review",
            method: Method::GET,
            path: vec!["events", event_id, "reviews", "check"],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        let review = match self.call::<ReviewCheckPayload>(request).await? {
            Some(ReviewCheckPayload::Direct(review)) => Some(review),
            Some(ReviewCheckPayload::Wrapped { review }) => review,
            None => None,
        };
        Ok(review)
    }

    /// `POST /events/:id/reviews`
    pub async fn create_review(&self, event_id: &str, draft: &ReviewDraft) -> Result<Review> {
        let request = ApiRequest {
            operation: "create_review",
            method: Method::POST,
            path: vec!["events", event_id, "reviews"],
            body: Some(serde_json::to_value(draft)?),
            auth: Auth::Required,
            delivery: Delivery::Once,
            idempotency_key: None,
        };
        self.call(request).await?.ok_or_else(|| missing_data("create_review"))
    }

    /// `PUT /events/:id/reviews/:reviewId`
    pub async fn update_review(&self, event_id: &str, review_id: &str, draft: &ReviewDraft) -> Result<Review> {
        let request = ApiRequest {
            operation: "update_review",
            method: Method::PUT,
            path: vec!["events", event_id, "reviews", review_id],
            body: Some(serde_json::to_value(draft)?),
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        self.call(request).await?.ok_or_else(|| missing_data("update_review"))
    }

    /// `DELETE /events/:id/reviews/:reviewId`
    pub async fn delete_review(&self, event_id: &str, review_id: &str) -> Result<()> {
        let request = ApiRequest {
            operation: "delete_review",
            method: Method::DELETE,
            path: vec!["events", event_id, "reviews", review_id],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        self.call::<Value>(request).await.map(|_| ())
    }

    /// `POST /payments/create-intent`, sent once under `idempotency_key`
    pub async fn create_payment_intent(&self, event_id: &str, amount: f64, idempotency_key: &str) -> Result<PaymentIntent> {
        let body = serde_json::to_value(CreateIntentRequest { event_id, amount })?;
        let request = ApiRequest {
            operation: "create_payment_intent",
            method: Method::POST,
            path: vec!["payments", "create-intent"],
            body: Some(body),
            auth: Auth::Required,
            delivery: Delivery::Once,
            idempotency_key: Some(idempotency_key),
        };
        let intent: Value = self
            .call(request)
            .await?
            .ok_or_else(|| missing_data("create_payment_intent"))?;

        // the backend omits the event id in some responses
        let mut intent = intent;
        if let Value::Object(fields) = &mut intent {
            fields
                .entry("eventId")
                .or_insert_with(|| Value::String(event_id.to_string()));
            fields.entry("amount").or_insert_with(|| serde_json::json!(amount));
        }
        Ok(serde_json::from_value(intent)?)
    }

    /// `POST /payments/confirm`. Keyed by the intent id, so repeating it is safe.
    pub async fn confirm_payment(&self, payment_intent_id: &str, event_id: &str) -> Result<PaymentRecord> {
        let body = serde_json::to_value(ConfirmPaymentRequest {
            payment_intent_id,
            event_id,
        })?;
        let request = ApiRequest {
            operation: "confirm_payment",
            method: Method::POST,
            path: vec!["payments", "confirm"],
            body: Some(body),
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        let record = self.call::<PaymentRecord>(request).await?;
        Ok(record.unwrap_or_else(|| PaymentRecord {
            id: None,
            payment_intent_id: payment_intent_id.to_string(),
            event_id: event_id.to_string(),
            amount: None,
            status: None,
        }))
    }

    /// `DELETE /events/:id`
    pub async fn delete_event(&self, event_id: &str) -> Result<()> {
        let request = ApiRequest {
            operation: "delete_event",
            method: Method::DELETE,
            path: vec!["events", event_id],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        self.call::<Value>(request).await.map(|_| ())
    }

    /// `GET /auth/me`
    pub async fn current_user(&self) -> Result<User> {
        let request = ApiRequest {
            operation: "current_user",
            method: Method::GET,
            path: vec!["auth", "me"],
            body: None,
            auth: Auth::Required,
            delivery: Delivery::Idempotent,
            idempotency_key: None,
        };
        let data: Value = self.call(request).await?.ok_or_else(|| missing_data("current_user"))?;
        // accept both `data: user` and `data: { user }`
        let user = match data {
            Value::Object(mut fields) if fields.contains_key("user") => fields.remove("user").unwrap_or(Value::Null),
            other => other,
        };
        Ok(serde_json::from_value(user)?)
    }

    /// Append `segments` to the base URL, escaping each one
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        // `.` and `..` would be dropped by the URL and retarget the request
        if let Some(bad) = segments.iter().find(|s| matches!(**s, "" | "." | "..")) {
            return Err(EventHubError::Validation(format!("Invalid identifier {:?} in request path", bad)));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| EventHubError::Config(format!("API base URL {} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn call<T: DeserializeOwned>(&self, request: ApiRequest<'_>) -> Result<Option<T>> {
        let result = match request.delivery {
            Delivery::Idempotent => self.retry.run(request.operation, || self.send_once(&request)).await,
            Delivery::Once => self.send_once(&request).await,
        };

        if let Err(e) = &result {
            let path = request.path.join("/");
            log_api_error(request.operation, e, Some(path.as_str()));
        }
        result
    }

    async fn send_once<T: DeserializeOwned>(&self, request: &ApiRequest<'_>) -> Result<Option<T>> {
        let url = self.endpoint(&request.path)?;
        debug!(operation = request.operation, method = %request.method, url = %url, "Sending API request");

        let mut builder = self.client.request(request.method.clone(), url);

        let token = match request.auth {
            Auth::Required => Some(self.session.bearer_token()?),
            Auth::Optional => self.session.optional_token(),
        };
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        if let Some(key) = request.idempotency_key {
            let value = HeaderValue::from_str(key)
                .map_err(|e| EventHubError::Validation(format!("Invalid idempotency key: {}", e)))?;
            builder = builder.header(IDEMPOTENCY_HEADER, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        self.decode(request.operation, status, &body)
    }

    fn decode<T: DeserializeOwned>(&self, operation: &str, status: StatusCode, body: &str) -> Result<Option<T>> {
        let envelope = serde_json::from_str::<ApiEnvelope<Value>>(body).ok();
        let message = envelope.as_ref().and_then(|e| e.message.clone());

        if status == StatusCode::UNAUTHORIZED {
            warn!(operation = operation, "Received 401, expiring session");
            self.session.expire();
            return Err(EventHubError::Authentication(
                message.unwrap_or_else(|| "Session expired".to_string()),
            ));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(EventHubError::NotFound(message.unwrap_or_else(|| operation.to_string())));
        }

        if status.is_client_error() {
            return Err(EventHubError::rejected(
                message.unwrap_or_else(|| format!("Request rejected ({})", status.as_u16())),
            ));
        }

        if !status.is_success() {
            return Err(EventHubError::Server {
                status: status.as_u16(),
                message: message.unwrap_or_else(|| status.to_string()),
            });
        }

        let envelope = envelope.ok_or_else(|| EventHubError::Server {
            status: status.as_u16(),
            message: format!("Malformed response for {}", operation),
        })?;

        if !envelope.success {
            return Err(EventHubError::rejected(
                envelope.message.unwrap_or_else(|| "Request was not successful".to_string()),
            ));
        }

        match envelope.data {
            None | Some(Value::Null) => Ok(None),
            Some(data) => Ok(Some(serde_json::from_value(data)?)),
        }
    }
}

fn missing_data(operation: &str) -> EventHubError {
    EventHubError::Server {
        status: 200,
        message: format!("Response for {} carried no data", operation),
    }
}
