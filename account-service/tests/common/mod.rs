//! Common test utilities for account-service integration tests.
#![allow(dead_code)]

use account_service::config::{
    AccountConfig, DatabaseConfig, Environment, PaystackConfig,
};
use account_service::services::{AccountService, InMemoryUserRepository, PaystackClient};
use account_service::{router, AppState};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use secrecy::Secret;
use service_core::config::Config as CommonConfig;
use std::sync::{Arc, Once};
use tower::ServiceExt;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_SECRET_KEY: &str = "sk_test_account_service";

static INIT: Once = Once::new();

/// Initialize tracing for tests (only once).
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter("info,account_service=debug")
            .with_test_writer()
            .try_init()
            .ok();
    });
}

pub fn test_config(paystack_base_url: &str) -> AccountConfig {
    AccountConfig {
        common: CommonConfig { port: 0 },
        environment: Environment::Dev,
        service_name: "account-service-test".to_string(),
        service_version: "test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        allowed_origins: vec!["http://localhost:3000".to_string()],
        database: DatabaseConfig {
            url: Secret::new(
                std::env::var("TEST_DATABASE_URL")
                    .unwrap_or_else(|_| "postgres://localhost/accounts_test".to_string()),
            ),
            max_connections: 2,
            min_connections: 1,
        },
        paystack: PaystackConfig {
            secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
            api_base_url: paystack_base_url.to_string(),
        },
    }
}

/// Router backed by an in-memory store and a mocked Paystack.
pub struct TestApp {
    pub router: Router,
    pub paystack: MockServer,
    pub repository: Arc<InMemoryUserRepository>,
}

impl TestApp {
    pub async fn spawn() -> Self {
        init_tracing();

        let paystack = MockServer::start().await;
        let config = test_config(&paystack.uri());
        let repository = Arc::new(InMemoryUserRepository::new());
        let service = AccountService::new(
            repository.clone(),
            Arc::new(PaystackClient::new(config.paystack.clone())),
        );

        Self {
            router: router(AppState { config, service }),
            paystack,
            repository,
        }
    }

    /// Make Paystack resolve `account_number` at `bank_code` to `account_name`.
    pub async fn mock_resolution(&self, bank_code: &str, account_number: &str, account_name: &str) {
        Mock::given(method("GET"))
            .and(path("/bank/resolve"))
            .and(query_param("bank_code", bank_code))
            .and(query_param("account_number", account_number))
            .and(header(
                "authorization",
                format!("Bearer {}", TEST_SECRET_KEY).as_str(),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": true,
                "message": "Account number resolved",
                "data": {
                    "account_number": account_number,
                    "account_name": account_name,
                    "bank_id": 9
                }
            })))
            .mount(&self.paystack)
            .await;
    }

    pub async fn request(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        let json = if body.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null)
        };

        (status, json)
    }

    pub async fn post_json(&self, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        self.request(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    /// Register a user and return its id.
    pub async fn register_user(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .post_json(
                "/users",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "password": "correct horse battery"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

        body["user_id"]
            .as_str()
            .expect("user_id in response")
            .to_string()
    }

    pub async fn add_bank_account(
        &self,
        user_id: &str,
        bank_code: &str,
        account_number: &str,
        account_name: &str,
    ) -> (StatusCode, serde_json::Value) {
        self.post_json(
            &format!("/users/{}/bank-accounts", user_id),
            serde_json::json!({
                "bank_code": bank_code,
                "account_number": account_number,
                "account_name": account_name
            }),
        )
        .await
    }
}
