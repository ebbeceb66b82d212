mod common;

use actix_web::http::StatusCode;
use actix_web::{rt, test, web, App, HttpServer};
use chrono::{Duration, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::TcpListener;
use uuid::Uuid;

use common::{bearer, init_app, register_user, send, test_state, test_tokens};
use taskboard::auth::TokenService;
use taskboard::routes;

#[actix_rt::test]
async fn test_register_login_and_me_flow() {
    let app = init_app(test_state()).await;

    let registered = register_user(&app, "Ada", "  Ada@Example.com ", "secret1").await;
    assert_eq!(registered.user.name, "Ada");
    assert_eq!(registered.user.email, "ada@example.com");
    assert!(!registered.token.is_empty());

    // Login is case-insensitive on the email.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ADA@example.com", "password": "secret1" }));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK, "Login failed. Body: {}", body);
    assert_eq!(body["_id"], registered.user.id.to_string());
    assert_eq!(body["role"], "user");
    assert!(body["token"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());

    let token = body["token"].as_str().unwrap().to_string();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token));
    let (status, me) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["_id"], registered.user.id.to_string());
    assert_eq!(me["email"], "ada@example.com");
    assert!(me.get("token").is_none());
}

#[actix_rt::test]
async fn test_register_duplicate_email_is_rejected() {
    let app = init_app(test_state()).await;
    register_user(&app, "Ada", "ada@example.com", "secret1").await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({ "name": "Other", "email": "ADA@example.com", "password": "secret2" }));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");
}

#[actix_rt::test]
async fn test_register_validation_errors() {
    let app = init_app(test_state()).await;

    let cases = [
        json!({ "name": "", "email": "a@example.com", "password": "secret1" }),
        json!({ "name": "a".repeat(51), "email": "a@example.com", "password": "secret1" }),
        json!({ "name": "Ada", "email": "not-an-email", "password": "secret1" }),
        json!({ "name": "Ada", "email": "a@example.com", "password": "12345" }),
        json!({ "email": "a@example.com", "password": "secret1" }),
    ];

    for payload in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload);
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload: {}", payload);
        assert_eq!(body["message"], "Validation failed");
        assert!(body["errors"].as_array().map_or(false, |e| !e.is_empty()));
    }
}

#[actix_rt::test]
async fn test_register_with_malformed_body_is_a_bad_request() {
    let app = init_app(test_state()).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .insert_header(("content-type", "application/json"))
        .set_payload("{not json");
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].is_string());
}

#[actix_rt::test]
async fn test_login_failures_are_indistinguishable() {
    let app = init_app(test_state()).await;
    register_user(&app, "Ada", "ada@example.com", "secret1").await;

    let wrong_password = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "wrong-password" }));
    let (status_wrong, body_wrong) = send(&app, wrong_password).await;

    let unknown_user = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "nobody@example.com", "password": "secret1" }));
    let (status_unknown, body_unknown) = send(&app, unknown_user).await;

    assert_eq!(status_wrong, StatusCode::UNAUTHORIZED);
    assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
    assert_eq!(body_wrong, body_unknown);
    assert_eq!(body_wrong["message"], "Invalid email or password");
}

#[actix_rt::test]
async fn test_login_validation_errors() {
    let app = init_app(test_state()).await;

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": "ada@example.com", "password": "" }));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "password");
}

#[actix_rt::test]
async fn test_me_rejects_missing_invalid_and_expired_tokens() {
    let app = init_app(test_state()).await;
    let registered = register_user(&app, "Ada", "ada@example.com", "secret1").await;

    let (status, body) = send(&app, test::TestRequest::get().uri("/api/auth/me")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, no token");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer("not.a.token"));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token failed");

    let foreign = TokenService::new(b"some-other-secret", Duration::days(30))
        .issue(registered.user.id)
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&foreign));
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let expired = test_tokens()
        .issue_at(registered.user.id, Utc::now() - Duration::days(31))
        .unwrap();
    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&expired));
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Not authorized, token expired");
}

#[actix_rt::test]
async fn test_me_for_unknown_user_is_not_found() {
    let app = init_app(test_state()).await;
    let token = test_tokens().issue(Uuid::new_v4()).unwrap();

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token));
    let (status, body) = send(&app, req).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[actix_rt::test]
async fn test_protected_route_over_http_without_token() {
    // Find an available port
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    let state = test_state();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .configure(routes::config)
            .default_service(web::to(routes::not_found))
    })
    .listen(listener)
    .expect("Failed to listen")
    .run();
    let handle = server.handle();
    rt::spawn(server);

    let client = reqwest::Client::new();
    let base = format!("http://127.0.0.1:{}", port);

    let resp = client
        .post(format!("{}/api/tasks", base))
        .json(&json!({ "title": "Unauthorized Task" }))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Not authorized, no token");

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");

    handle.stop(false).await;
}
