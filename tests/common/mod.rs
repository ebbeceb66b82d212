//! Shared setup for the integration tests.
//!
//! Every test gets its own in-memory store, so tests never see each other's users or
//! tasks and no database is needed. bcrypt runs at its minimum cost to keep the
//! suite fast.
#![allow(dead_code)]

use actix_http::Request;
use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::middleware::Logger;
use actix_web::{test, web, App};
use chrono::Duration;
use serde_json::{json, Value};

use taskboard::auth::{AuthResponse, PasswordHasher, TokenService};
use taskboard::routes;
use taskboard::state::AppState;
use taskboard::store::Store;

pub const TEST_SECRET: &[u8] = b"integration-test-secret";

pub fn test_tokens() -> TokenService {
    TokenService::new(TEST_SECRET, Duration::days(30))
}

pub fn test_state() -> AppState {
    AppState::new(Store::memory(), test_tokens(), PasswordHasher::new(4))
}

/// Builds the full application around `state`, wired the same way as `main`.
pub async fn init_app(
    state: AppState,
) -> impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error> {
    test::init_service(
        App::new()
            .app_data(web::Data::new(state))
            .wrap(Logger::default())
            .configure(routes::config)
            .default_service(web::to(routes::not_found)),
    )
    .await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}

/// Sends `req` and returns the status with the body parsed as JSON
/// (`Value::Null` for an empty body).
pub async fn send(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    if body.is_empty() {
        return (status, Value::Null);
    }
    let json = serde_json::from_slice(&body).unwrap_or_else(|e| {
        panic!(
            "Response is not JSON ({}): {:?}",
            e,
            String::from_utf8_lossy(&body)
        )
    });
    (status, json)
}

/// Registers a user and returns the auth response. Panics if registration fails.
pub async fn register_user(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    name: &str,
    email: &str,
    password: &str,
) -> AuthResponse {
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": name, "email": email, "password": password }));
    let (status, body) = send(app, req).await;
    assert_eq!(
        status,
        StatusCode::CREATED,
        "Registration failed. Body: {}",
        body
    );
    serde_json::from_value(body).expect("Failed to parse registration response")
}

/// Creates a task as the holder of `token` and returns the created task as JSON.
pub async fn create_task(
    app: &impl Service<Request, Response = ServiceResponse<impl MessageBody>, Error = actix_web::Error>,
    token: &str,
    payload: Value,
) -> Value {
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(token))
        .set_json(payload);
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "Task creation failed. Body: {}", body);
    body
}
