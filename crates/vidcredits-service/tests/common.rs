//! Common test utilities for vidcredits integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vidcredits_service::crypto::hmac_sha256_hex;
use vidcredits_service::{create_router, AppState, ServiceConfig, StorageBackend};
use vidcredits_store::MemoryStore;

/// Webhook signing secret shared with the Stripe mock.
pub const WEBHOOK_SECRET: &str = "whsec_vidcredits_test";

/// Password used for every registered test user.
pub const PASSWORD: &str = "hunter22";

/// Test harness with an in-memory ledger and mocked providers.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The ledger behind the server.
    pub store: Arc<MemoryStore>,
    /// Stands in for `api.stripe.com`.
    pub stripe: MockServer,
    /// Stands in for the generation provider.
    pub generator: MockServer,
}

/// A registered user.
pub struct TestUser {
    /// User ID.
    pub id: String,
    /// Session token.
    pub token: String,
}

impl TestUser {
    /// `Authorization` header value for this user.
    pub fn bearer(&self) -> HeaderValue {
        bearer(&self.token)
    }
}

/// Build a bearer `Authorization` value.
pub fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {token}")).unwrap()
}

impl TestHarness {
    /// Create a new test harness with a fresh ledger.
    pub async fn new() -> Self {
        Self::with_generation_timeout(5).await
    }

    /// Like [`TestHarness::new`], giving up on the generator after `seconds`.
    pub async fn with_generation_timeout(seconds: u64) -> Self {
        let stripe = MockServer::start().await;
        let generator = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());

        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            storage_backend: StorageBackend::Memory,
            jwt_secret: "test-jwt-secret".into(),
            password_pepper: "test-pepper".into(),
            stripe_api_key: Some("sk_test_vidcredits".into()),
            stripe_webhook_secret: Some(WEBHOOK_SECRET.into()),
            stripe_api_base: format!("{}/v1", stripe.uri()),
            frontend_url: "http://localhost:3000".into(),
            generation_api_url: Some(generator.uri()),
            generation_api_key: Some("gen-test-key".into()),
            generation_timeout_seconds: seconds,
            request_timeout_seconds: 30,
            password_hash_iterations: 1_000,
            ..ServiceConfig::default()
        };

        let state = AppState::new(store.clone(), config);
        let server = TestServer::new(create_router(state)).expect("Failed to create test server");

        Self {
            server,
            store,
            stripe,
            generator,
        }
    }

    /// Register a user and return its id and token.
    pub async fn register(&self, email: &str) -> TestUser {
        let response = self
            .server
            .post("/v1/auth/register")
            .json(&json!({
                "email": email,
                "password": PASSWORD,
                "name": "Test User"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        let body: Value = response.json();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    /// Current balance as reported by the API.
    pub async fn balance(&self, user: &TestUser) -> i64 {
        let response = self
            .server
            .get("/v1/credits/balance")
            .add_header(AUTHORIZATION, user.bearer())
            .await;
        response.assert_status_ok();
        response.json::<Value>()["balance"].as_i64().unwrap()
    }

    /// Serve a checkout session from the Stripe mock.
    pub async fn mock_session(&self, session_id: &str, user: &TestUser, payment_status: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/v1/checkout/sessions/{session_id}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": session_id,
                "object": "checkout.session",
                "url": null,
                "payment_status": payment_status,
                "status": "complete",
                "amount_total": 3999,
                "client_reference_id": user.id,
                "metadata": {
                    "user_id": user.id,
                    "package_id": "pro",
                    "credits": "50"
                }
            })))
            .mount(&self.stripe)
            .await;
    }

    /// Answer generation requests with `content`.
    pub async fn mock_generation(&self, content: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "chatcmpl-test",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": content }
                }]
            })))
            .mount(&self.generator)
            .await;
    }

    /// Answer generation requests with `content` after `delay`.
    pub async fn mock_slow_generation(&self, content: &str, delay: Duration) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({
                        "choices": [{ "message": { "role": "assistant", "content": content } }]
                    }))
                    .set_delay(delay),
            )
            .mount(&self.generator)
            .await;
    }

    /// Answer generation requests with a raw 200 body.
    pub async fn mock_generation_body(&self, body: &str) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&self.generator)
            .await;
    }

    /// Answer generation requests with an HTTP error.
    pub async fn mock_generation_error(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(status).set_body_string("upstream unavailable"))
            .mount(&self.generator)
            .await;
    }
}

/// Build a `Stripe-Signature` header for `payload`.
pub fn sign_webhook(payload: &str) -> HeaderValue {
    let timestamp = chrono::Utc::now().timestamp();
    let signature = hmac_sha256_hex(WEBHOOK_SECRET, &format!("{timestamp}.{payload}"));
    HeaderValue::from_str(&format!("t={timestamp},v1={signature}")).unwrap()
}
