//! Checkout, confirmation and webhook integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use common::{sign_webhook, TestHarness};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, ResponseTemplate};

fn stripe_signature() -> HeaderName {
    HeaderName::from_static("stripe-signature")
}

fn completed_event(session_id: &str) -> String {
    checkout_event("checkout.session.completed", session_id)
}

fn checkout_event(event_type: &str, session_id: &str) -> String {
    json!({
        "id": format!("evt_{session_id}"),
        "object": "event",
        "type": event_type,
        "data": { "object": { "id": session_id, "object": "checkout.session" } }
    })
    .to_string()
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn checkout_creates_stripe_session() {
    let harness = TestHarness::new().await;
    let user = harness.register("buyer@example.com").await;

    Mock::given(method("POST"))
        .and(path("/v1/checkout/sessions"))
        .and(body_string_contains("metadata%5Bpackage_id%5D=pro"))
        .and(body_string_contains("metadata%5Bcredits%5D=50"))
        .and(body_string_contains("unit_amount%5D=3999"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "cs_test_new",
            "url": "https://checkout.stripe.com/c/pay/cs_test_new",
            "payment_status": "unpaid"
        })))
        .expect(1)
        .mount(&harness.stripe)
        .await;

    let response = harness
        .server
        .post("/v1/payments/checkout")
        .add_header(AUTHORIZATION, user.bearer())
        .json(&json!({ "packageId": "pro", "credits": 50, "price": 39.99 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["session_id"], "cs_test_new");
    assert_eq!(
        body["checkout_url"],
        "https://checkout.stripe.com/c/pay/cs_test_new"
    );
    assert_eq!(harness.balance(&user).await, 5);
}

#[tokio::test]
async fn checkout_rejects_tampered_package() {
    let harness = TestHarness::new().await;
    let user = harness.register("tamper@example.com").await;

    for body in [
        json!({ "package_id": "pro", "credits": 500, "amount": 39.99 }),
        json!({ "package_id": "pro", "credits": 50, "amount": 0.5 }),
        json!({ "package_id": "platinum", "credits": 50, "amount": 39.99 }),
        json!({ "package_id": "pro" }),
    ] {
        let response = harness
            .server
            .post("/v1/payments/checkout")
            .add_header(AUTHORIZATION, user.bearer())
            .json(&body)
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(response.json::<Value>()["error"]["code"], "invalid_package");
    }

    assert!(harness.stripe.received_requests().await.unwrap().is_empty());
}

// ============================================================================
// Confirmation
// ============================================================================

#[tokio::test]
async fn confirm_credits_session_once() {
    let harness = TestHarness::new().await;
    let user = harness.register("confirm@example.com").await;
    harness.mock_session("cs_paid", &user, "paid").await;

    let response = harness
        .server
        .post("/v1/payments/confirm")
        .add_header(AUTHORIZATION, user.bearer())
        .json(&json!({ "session_id": "cs_paid" }))
        .await;
    response.assert_status_ok();
    let first: Value = response.json();
    assert_eq!(first["success"], true);
    assert_eq!(first["credits_added"], 50);
    assert_eq!(first["new_balance"], 55);
    assert_eq!(first["already_processed"], false);

    let response = harness
        .server
        .post("/v1/payments/confirm")
        .add_header(AUTHORIZATION, user.bearer())
        .json(&json!({ "sessionId": "cs_paid" }))
        .await;
    response.assert_status_ok();
    let second: Value = response.json();
    assert_eq!(second["already_processed"], true);
    assert_eq!(second["new_balance"], 55);
    assert_eq!(second["transaction_id"], first["transaction_id"]);

    let response = harness
        .server
        .get("/v1/credits/transactions")
        .add_header(AUTHORIZATION, user.bearer())
        .await;
    let body: Value = response.json();
    let purchases: Vec<_> = body["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|t| t["type"] == "purchase")
        .collect();
    assert_eq!(purchases.len(), 1);
    assert_eq!(purchases[0]["external_ref"], "cs_paid");
    assert_eq!(purchases[0]["description"], "Credit purchase - Pro package");
}

#[tokio::test]
async fn unpaid_session_is_not_credited() {
    let harness = TestHarness::new().await;
    let user = harness.register("unpaid@example.com").await;
    harness.mock_session("cs_unpaid", &user, "unpaid").await;

    let response = harness
        .server
        .post("/v1/payments/confirm")
        .add_header(AUTHORIZATION, user.bearer())
        .json(&json!({ "session_id": "cs_unpaid" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["code"],
        "payment_not_completed"
    );
    assert_eq!(harness.balance(&user).await, 5);
}

#[tokio::test]
async fn cannot_confirm_another_users_session() {
    let harness = TestHarness::new().await;
    let owner = harness.register("owner@example.com").await;
    let thief = harness.register("thief@example.com").await;
    harness.mock_session("cs_owner", &owner, "paid").await;

    let response = harness
        .server
        .post("/v1/payments/confirm")
        .add_header(AUTHORIZATION, thief.bearer())
        .json(&json!({ "session_id": "cs_owner" }))
        .await;

    response.assert_status_not_found();
    assert_eq!(harness.balance(&owner).await, 5);
    assert_eq!(harness.balance(&thief).await, 5);
}

// ============================================================================
// Webhooks
// ============================================================================

#[tokio::test]
async fn webhook_credits_completed_checkout() {
    let harness = TestHarness::new().await;
    let user = harness.register("hook@example.com").await;
    harness.mock_session("cs_hook", &user, "paid").await;

    let payload = completed_event("cs_hook");
    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(stripe_signature(), sign_webhook(&payload))
        .text(payload)
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["received"], true);
    assert_eq!(harness.balance(&user).await, 55);

    // The client's own confirmation arrives after the webhook.
    let response = harness
        .server
        .post("/v1/payments/confirm")
        .add_header(AUTHORIZATION, user.bearer())
        .json(&json!({ "session_id": "cs_hook" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["already_processed"], true);
    assert_eq!(harness.balance(&user).await, 55);
}

#[tokio::test]
async fn webhook_acknowledges_unpaid_checkout_until_async_payment() {
    let harness = TestHarness::new().await;
    let user = harness.register("bank@example.com").await;
    harness.mock_session("cs_bank", &user, "unpaid").await;

    let payload = completed_event("cs_bank");
    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(stripe_signature(), sign_webhook(&payload))
        .text(payload)
        .await;

    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["received"], true);
    assert_eq!(harness.balance(&user).await, 5);

    // The bank debit clears later.
    harness.stripe.reset().await;
    harness.mock_session("cs_bank", &user, "paid").await;

    let payload = checkout_event("checkout.session.async_payment_succeeded", "cs_bank");
    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(stripe_signature(), sign_webhook(&payload))
        .text(payload)
        .await;

    response.assert_status_ok();
    assert_eq!(harness.balance(&user).await, 55);
}

#[tokio::test]
async fn webhook_requires_valid_signature() {
    let harness = TestHarness::new().await;
    let user = harness.register("forged@example.com").await;
    harness.mock_session("cs_forged", &user, "paid").await;

    let payload = completed_event("cs_forged");

    harness
        .server
        .post("/webhooks/stripe")
        .text(payload.clone())
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    harness
        .server
        .post("/webhooks/stripe")
        .add_header(
            stripe_signature(),
            HeaderValue::from_static("t=1700000000,v1=0000"),
        )
        .text(payload)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    assert_eq!(harness.balance(&user).await, 5);
}

#[tokio::test]
async fn webhook_ignores_other_events() {
    let harness = TestHarness::new().await;

    let payload = json!({
        "id": "evt_other",
        "type": "customer.created",
        "data": { "object": { "id": "cus_1" } }
    })
    .to_string();

    let response = harness
        .server
        .post("/webhooks/stripe")
        .add_header(stripe_signature(), sign_webhook(&payload))
        .text(payload)
        .await;

    response.assert_status_ok();
    assert!(harness.stripe.received_requests().await.unwrap().is_empty());
}
