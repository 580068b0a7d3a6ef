//! Paid checkout integration tests

mod helpers;

use assert_matches::assert_matches;
use helpers::*;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use EventHub::engagement::{CheckoutPhase, CheckoutRequest, JoinOutcome};
use EventHub::models::{EligibilityResult, User};
use EventHub::utils::errors::PaymentError;
use EventHub::EventHubError;

const FEE: f64 = 25.0;

/// Sign in an attendee and obtain a checkout request for a paid event
async fn paid_checkout_request(ctx: &TestContext) -> (User, CheckoutRequest) {
    let user = attendee("u1");
    ctx.sign_in_as(&user);

    let mut event = EventBuilder::new().fee(FEE).build();
    match ctx.services.participation.join(&mut event, &user).await.unwrap() {
        JoinOutcome::CheckoutRequired(request) => (user, request),
        other => panic!("expected CheckoutRequired, got {:?}", other),
    }
}

async fn mock_joined_event(ctx: &TestContext, user: &User) {
    let joined = EventBuilder::new().fee(FEE).with_participant(user).build();
    ctx.mock.mock_get_event(&joined).await;
    ctx.mock
        .mock_can_join(
            EVENT_ID,
            &EligibilityResult::blocked(vec!["You have already joined this event".to_string()]),
        )
        .await;
}

#[tokio::test]
async fn test_full_paid_checkout() {
    let ctx = TestContext::new().await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_success(&intent, 1).await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    assert_eq!(session.phase(), CheckoutPhase::AwaitingIntent);

    let created = payments.ensure_intent(&session).await.unwrap();
    assert_eq!(created.id, INTENT_ID);
    assert_eq!(session.phase(), CheckoutPhase::IntentReady);

    let outcome = payments.pay(&session, &valid_card()).await.unwrap();

    assert_eq!(session.phase(), CheckoutPhase::Completed);
    assert_eq!(outcome.record.payment_intent_id, INTENT_ID);
    let view = outcome.view.expect("resynchronized view");
    assert!(view.roles.is_participant);
    assert!(!view.can_join());
}

#[tokio::test]
async fn test_intent_is_created_once_per_session() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);
    ctx.mock.mock_create_intent(&intent, 1).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();

    let first = payments.ensure_intent(&session).await.unwrap();
    let second = payments.ensure_intent(&session).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/create-intent").await, 1);
}

#[tokio::test]
async fn test_failed_intent_is_not_recreated() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();

    // no intent mock mounted: the backend answers 404
    let err = payments.ensure_intent(&session).await.unwrap_err();
    assert_matches!(err, EventHubError::NotFound(_));
    assert_eq!(session.phase(), CheckoutPhase::IntentFailed);

    let err = payments.ensure_intent(&session).await.unwrap_err();
    assert_matches!(err, EventHubError::InvalidStateTransition { .. });
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/create-intent").await, 1);
}

#[tokio::test]
async fn test_second_checkout_for_same_event_is_rejected() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;

    let payments = &ctx.services.payments;
    let first = payments.begin_checkout(request.clone()).unwrap();

    assert_matches!(
        payments.begin_checkout(request.clone()),
        Err(EventHubError::InFlight { .. })
    );

    drop(first);
    assert!(payments.begin_checkout(request).is_ok());
}

#[tokio::test]
async fn test_declined_card_can_be_retried_with_another() {
    let ctx = TestContext::new().await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_decline(&intent, 1).await;
    ctx.mock.mock_gateway_success(&intent, 1).await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();

    let err = payments.pay(&session, &valid_card()).await.unwrap_err();
    assert_matches!(err, EventHubError::Payment(PaymentError::Declined { .. }));
    assert_eq!(session.phase(), CheckoutPhase::PaymentDeclined);
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/confirm").await, 0);

    payments.pay(&session, &valid_card()).await.unwrap();
    assert_eq!(session.phase(), CheckoutPhase::Completed);
}

#[tokio::test]
async fn test_backend_timeout_after_capture_is_an_inconsistency() {
    let ctx = TestContext::new_with_config(TestConfig {
        api_timeout_seconds: 1,
        max_retries: 0,
        ..TestConfig::default()
    })
    .await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_success(&intent, 1).await;
    ctx.mock.mock_confirm_payment_hanging(Duration::from_secs(3)).await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();

    let err = payments.pay(&session, &valid_card()).await.unwrap_err();

    assert_matches!(
        &err,
        EventHubError::Inconsistency { payment_intent_id, event_id, .. }
            if payment_intent_id == INTENT_ID && event_id == EVENT_ID
    );
    assert_eq!(session.phase(), CheckoutPhase::PaymentCaptured);
    assert_eq!(ctx.mock.request_count("GET", &format!("/api/events/{}", EVENT_ID)).await, 0);

    // a captured payment never goes back to the gateway
    assert_matches!(
        payments.pay(&session, &valid_card()).await,
        Err(EventHubError::InvalidStateTransition { .. })
    );

    let outcome = payments.retry_confirmation(&session).await.unwrap();
    assert_eq!(session.phase(), CheckoutPhase::Completed);
    assert_eq!(outcome.record.payment_intent_id, INTENT_ID);
    assert!(outcome.view.is_some());
}

#[tokio::test]
async fn test_invalid_card_never_reaches_gateway() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_unused(&intent).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();

    let err = payments.pay(&session, &short_card()).await.unwrap_err();

    assert_matches!(err, EventHubError::Validation(_));
    assert_eq!(session.phase(), CheckoutPhase::IntentReady);
}

#[tokio::test]
async fn test_pay_before_intent_is_rejected() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();

    assert_matches!(
        payments.pay(&session, &valid_card()).await,
        Err(EventHubError::InvalidStateTransition { .. })
    );
}

#[tokio::test]
async fn test_retry_confirmation_requires_captured_payment() {
    let ctx = TestContext::new().await;
    let (_user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);
    ctx.mock.mock_create_intent(&intent, 1).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();

    let err = payments.retry_confirmation(&session).await.unwrap_err();

    assert_matches!(err, EventHubError::InvalidStateTransition { from, .. } if from == "intent_ready");
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/confirm").await, 0);
}

#[tokio::test]
async fn test_gateway_outage_then_already_succeeded_counts_as_captured() {
    let ctx = TestContext::new().await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_unavailable(&intent, 1).await;
    ctx.mock.mock_gateway_already_succeeded(&intent, 1).await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();

    let err = payments.pay(&session, &valid_card()).await.unwrap_err();
    assert_matches!(err, EventHubError::Payment(PaymentError::GatewayUnavailable(_)));
    assert_eq!(session.phase(), CheckoutPhase::PaymentUnknown);
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/confirm").await, 0);

    let outcome = payments.pay(&session, &valid_card()).await.unwrap();

    assert_eq!(session.phase(), CheckoutPhase::Completed);
    assert_eq!(outcome.record.payment_intent_id, INTENT_ID);
    assert_eq!(ctx.mock.request_count("POST", "/api/payments/confirm").await, 1);
}

#[tokio::test]
async fn test_unknown_gateway_outcome_can_be_confirmed_with_backend() {
    let ctx = TestContext::new().await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_unavailable(&intent, 1).await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();
    payments.pay(&session, &valid_card()).await.unwrap_err();

    let outcome = payments.retry_confirmation(&session).await.unwrap();

    assert_eq!(session.phase(), CheckoutPhase::Completed);
    assert_eq!(outcome.record.payment_intent_id, INTENT_ID);
    assert!(outcome.view.expect("resynchronized view").roles.is_participant);
}

#[tokio::test]
async fn test_backend_rejection_keeps_unknown_payment_open() {
    let ctx = TestContext::new().await;
    let (user, request) = paid_checkout_request(&ctx).await;
    let intent = create_test_intent(FEE);

    ctx.mock.mock_create_intent(&intent, 1).await;
    ctx.mock.mock_gateway_unavailable(&intent, 1).await;
    ctx.mock.mock_gateway_success(&intent, 1).await;
    Mock::given(method("POST"))
        .and(path("/api/payments/confirm"))
        .respond_with(ResponseTemplate::new(400).set_body_json(rejection("Payment has not succeeded")))
        .up_to_n_times(1)
        .mount(&ctx.mock.server)
        .await;
    ctx.mock.mock_confirm_payment(&intent, 1).await;
    mock_joined_event(&ctx, &user).await;

    let payments = &ctx.services.payments;
    let session = payments.begin_checkout(request).unwrap();
    payments.ensure_intent(&session).await.unwrap();
    payments.pay(&session, &valid_card()).await.unwrap_err();

    let err = payments.retry_confirmation(&session).await.unwrap_err();
    assert_matches!(err, EventHubError::BusinessRule { .. });
    assert_eq!(session.phase(), CheckoutPhase::PaymentUnknown);

    payments.pay(&session, &valid_card()).await.unwrap();
    assert_eq!(session.phase(), CheckoutPhase::Completed);
}
