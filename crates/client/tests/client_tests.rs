//! Integration tests for the request dispatcher.

use std::sync::Arc;
use std::time::Duration;

use campus_client::{CampusClient, ClientError, SessionState, UserProfile, UserRole};
use reqwest::Method;
use serde_json::json;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn profile(id: i64) -> UserProfile {
    UserProfile {
        id,
        username: format!("user{id}"),
        email: format!("user{id}@example.com"),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        role: UserRole::Student,
        profile_image: None,
        student_id: None,
        department: None,
    }
}

fn profile_json(id: i64) -> serde_json::Value {
    json!({
        "id": id,
        "username": format!("user{id}"),
        "email": format!("user{id}@example.com"),
        "first_name": "Ada",
        "last_name": "Lovelace",
        "role": "student"
    })
}

#[tokio::test]
async fn builder_requires_base_url() {
    let result = CampusClient::builder().build();
    assert!(matches!(result, Err(ClientError::Configuration(_))));
}

#[tokio::test]
async fn builder_strips_trailing_slash() {
    let client = CampusClient::builder()
        .base_url("http://localhost:8000/")
        .build()
        .unwrap();
    assert_eq!(client.base_url(), "http://localhost:8000");
}

#[tokio::test]
async fn bearer_token_attached_when_session_has_one() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/users/profile/"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_json(1)))
        .mount(&server)
        .await;

    let state = Arc::new(SessionState::new());
    state.set_authenticated("tok-1", None, profile(1));

    let client = CampusClient::builder()
        .base_url(server.uri())
        .session_state(state)
        .build()
        .unwrap();

    let fetched: UserProfile = client
        .execute(client.request(Method::GET, "/users/profile/"))
        .await
        .unwrap();
    assert_eq!(fetched.id, 1);
}

#[tokio::test]
async fn public_requests_never_carry_credentials() {
    let server = MockServer::start().await;
    // Trips only when an authorization header sneaks onto the request.
    Mock::given(method("POST"))
        .and(path("/users/login/"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/users/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&server)
        .await;

    let state = Arc::new(SessionState::new());
    state.set_authenticated("tok-1", None, profile(1));

    let client = CampusClient::builder()
        .base_url(server.uri())
        .session_state(state)
        .build()
        .unwrap();

    let result: serde_json::Value = client
        .execute(client.request_public(Method::POST, "/users/login/"))
        .await
        .unwrap();
    assert_eq!(result["ok"], true);
    server.verify().await;
}

#[tokio::test]
async fn error_body_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/courses/9/"))
        .respond_with(
            ResponseTemplate::new(404)
                .set_body_json(json!({"detail": "Course not found or access denied"})),
        )
        .mount(&server)
        .await;

    let client = CampusClient::builder()
        .base_url(server.uri())
        .build()
        .unwrap();

    let result: Result<serde_json::Value, _> = client
        .execute(client.request(Method::GET, "/courses/9/"))
        .await;
    match result {
        Err(ClientError::Http { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Course not found or access denied");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn timeout_is_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = CampusClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(50))
        .build()
        .unwrap();

    let result: Result<serde_json::Value, _> =
        client.execute(client.request(Method::GET, "/slow/")).await;
    // A timeout is a transport failure, not a 401; it must never look
    // refreshable.
    assert!(matches!(result, Err(ClientError::Network(_))));
}
