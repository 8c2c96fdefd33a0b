//! Registration, login and profile integration tests.

mod common;

use axum::http::header::AUTHORIZATION;
use axum::http::StatusCode;
use common::{bearer, TestHarness, PASSWORD};
use serde_json::{json, Value};

#[tokio::test]
async fn register_grants_welcome_bonus() {
    let harness = TestHarness::new().await;

    let response = harness
        .server
        .post("/v1/auth/register")
        .json(&json!({
            "email": "  New.User@Example.com ",
            "password": PASSWORD,
            "name": "New User"
        }))
        .await;

    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_eq!(body["user"]["email"], "new.user@example.com");
    assert_eq!(body["user"]["credits"], 5);
}

#[tokio::test]
async fn register_rejects_invalid_input() {
    let harness = TestHarness::new().await;

    for body in [
        json!({ "email": "not-an-email", "password": PASSWORD, "name": "Valid" }),
        json!({ "email": "a@example.com", "password": "short", "name": "Valid" }),
        json!({ "email": "a@example.com", "password": PASSWORD, "name": "V" }),
    ] {
        let response = harness.server.post("/v1/auth/register").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["error"]["code"],
            "invalid_registration"
        );
    }
}

#[tokio::test]
async fn duplicate_email_conflicts() {
    let harness = TestHarness::new().await;
    harness.register("dup@example.com").await;

    let response = harness
        .server
        .post("/v1/auth/register")
        .json(&json!({
            "email": "DUP@example.com",
            "password": PASSWORD,
            "name": "Second"
        }))
        .await;

    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn login_and_profile() {
    let harness = TestHarness::new().await;
    let user = harness.register("login@example.com").await;

    let response = harness
        .server
        .post("/v1/auth/login")
        .json(&json!({ "email": "Login@Example.com", "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let token = response.json::<Value>()["token"]
        .as_str()
        .unwrap()
        .to_string();

    let response = harness
        .server
        .get("/v1/auth/me")
        .add_header(AUTHORIZATION, bearer(&token))
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["id"], user.id);
    assert_eq!(body["credits"], 5);
}

#[tokio::test]
async fn login_with_wrong_password_fails() {
    let harness = TestHarness::new().await;
    harness.register("wrong@example.com").await;

    for (email, password) in [
        ("wrong@example.com", "not-the-password"),
        ("nobody@example.com", PASSWORD),
    ] {
        let response = harness
            .server
            .post("/v1/auth/login")
            .json(&json!({ "email": email, "password": password }))
            .await;
        response.assert_status_unauthorized();
        assert_eq!(
            response.json::<Value>()["error"]["code"],
            "invalid_credentials"
        );
    }
}

#[tokio::test]
async fn protected_routes_require_token() {
    let harness = TestHarness::new().await;

    harness.server.get("/v1/auth/me").await.assert_status_unauthorized();
    harness
        .server
        .get("/v1/credits/balance")
        .add_header(AUTHORIZATION, bearer("garbage"))
        .await
        .assert_status_unauthorized();
}
