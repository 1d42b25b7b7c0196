mod common;

use account_service::config::PaystackConfig;
use account_service::services::{AccountResolver, PaystackClient, RequestContext, ResolveError};
use common::TEST_SECRET_KEY;
use secrecy::Secret;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> PaystackClient {
    PaystackClient::new(PaystackConfig {
        secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
        api_base_url: server.uri(),
    })
}

#[tokio::test]
async fn resolves_account_name_with_bearer_auth_and_request_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .and(query_param("account_number", "0001234567"))
        .and(query_param("bank_code", "058"))
        .and(header(
            "authorization",
            format!("Bearer {}", TEST_SECRET_KEY).as_str(),
        ))
        .and(header("x-request-id", "req-resolve-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "message": "Account number resolved",
            "data": {
                "account_number": "0001234567",
                "account_name": "DANIEL OLUOJOMU",
                "bank_id": 9
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let resolved = client(&server)
        .resolve(&RequestContext::new("req-resolve-1"), "058", "0001234567")
        .await
        .expect("resolution succeeds");

    assert_eq!(resolved.account_name, "DANIEL OLUOJOMU");
    assert_eq!(resolved.account_number.as_deref(), Some("0001234567"));
    assert_eq!(resolved.bank_id, Some(9));
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "status": false,
            "message": "Invalid key"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve(&RequestContext::generate(), "058", "0001234567")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Status(401)));
}

#[tokio::test]
async fn other_2xx_status_is_an_error_even_with_a_valid_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
            "status": true,
            "message": "Account number resolved",
            "data": { "account_number": "0001234567", "account_name": "DANIEL OLUOJOMU" }
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve(&RequestContext::generate(), "058", "0001234567")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Status(201)));
}

#[tokio::test]
async fn malformed_body_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve(&RequestContext::generate(), "058", "0001234567")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Decode(_)));
}

#[tokio::test]
async fn missing_data_object_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": false,
            "message": "Could not resolve account name"
        })))
        .mount(&server)
        .await;

    let err = client(&server)
        .resolve(&RequestContext::generate(), "058", "0001234567")
        .await
        .unwrap_err();

    match err {
        ResolveError::MissingData(message) => {
            assert_eq!(message, "Could not resolve account name")
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[tokio::test]
async fn each_call_hits_the_provider() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/bank/resolve"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": true,
            "message": "Account number resolved",
            "data": { "account_number": "0001234567", "account_name": "ADA OBI" }
        })))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server);
    let ctx = RequestContext::generate();
    client.resolve(&ctx, "058", "0001234567").await.unwrap();
    client.resolve(&ctx, "058", "0001234567").await.unwrap();
}

#[tokio::test]
async fn unreachable_provider_is_a_transport_error() {
    let client = PaystackClient::new(PaystackConfig {
        secret_key: Secret::new(TEST_SECRET_KEY.to_string()),
        api_base_url: "http://127.0.0.1:1".to_string(),
    });

    let err = client
        .resolve(&RequestContext::generate(), "058", "0001234567")
        .await
        .unwrap_err();

    assert!(matches!(err, ResolveError::Transport(_)));
}
