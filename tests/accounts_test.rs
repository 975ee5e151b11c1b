mod common;

use axum::http::{Method, StatusCode};
use community_hub::db::DatabaseClient;
use community_hub::models::user::RegisterRequest;
use community_hub::{AdminBootstrap, AppConfig, AppState};
use common::{spawn_app, PASSWORD};
use serde_json::json;

#[tokio::test]
async fn test_register_and_login() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    assert!(!alice.token.is_empty());

    let response = app
        .post("/api/v1/accounts/login", None, json!({ "username": "alice", "password": PASSWORD }))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["user"]["username"], "alice");
    assert_eq!(body["user"]["followers_count"], 0);
    assert!(body["token"].is_string());
}

#[tokio::test]
async fn test_register_rejects_bad_input() {
    let app = spawn_app().await;
    app.register("alice").await;

    let duplicate = app
        .post(
            "/api/v1/accounts/register",
            None,
            json!({
                "username": "alice",
                "email": "other@example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD
            }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.json()["error"], "A user with that username already exists.");

    let mismatch = app
        .post(
            "/api/v1/accounts/register",
            None,
            json!({
                "username": "bob",
                "email": "bob@example.com",
                "password": PASSWORD,
                "password_confirm": "something-else"
            }),
        )
        .await;
    assert_eq!(mismatch.status, StatusCode::BAD_REQUEST);
    assert_eq!(mismatch.json()["error"], "Password fields didn't match.");

    let bad_email = app
        .post(
            "/api/v1/accounts/register",
            None,
            json!({
                "username": "carol",
                "email": "not-an-email",
                "password": PASSWORD,
                "password_confirm": PASSWORD
            }),
        )
        .await;
    assert_eq!(bad_email.status, StatusCode::BAD_REQUEST);

    let missing_fields = app.post("/api/v1/accounts/register", None, json!({ "username": "dave" })).await;
    assert_eq!(missing_fields.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_failures() {
    let app = spawn_app().await;
    app.register("alice").await;

    let wrong = app
        .post("/api/v1/accounts/login", None, json!({ "username": "alice", "password": "wrong-password" }))
        .await;
    assert_eq!(wrong.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong.json()["error"], "Invalid credentials");

    let missing = app.post("/api/v1/accounts/login", None, json!({ "username": "alice" })).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing.json()["error"], "Must include username and password.");
}

#[tokio::test]
async fn test_profile_requires_auth_and_updates() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let anonymous = app.get("/api/v1/accounts/profile", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let invalid = app.get("/api/v1/accounts/profile", Some("not-a-token")).await;
    assert_eq!(invalid.status, StatusCode::UNAUTHORIZED);

    let profile = app.get("/api/v1/accounts/profile", Some(&alice.token)).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.json()["email"], "alice@example.com");

    let updated = app
        .request(
            Method::PATCH,
            "/api/v1/accounts/profile",
            Some(&alice.token),
            Some(json!({ "bio": "Reading and writing", "username": "mallory" })),
        )
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    let body = updated.json();
    assert_eq!(body["bio"], "Reading and writing");
    assert_eq!(body["username"], "alice");
}

#[tokio::test]
async fn test_public_profile_hides_email() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let response = app.get(&format!("/api/v1/accounts/users/{}", alice.id), None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["username"], "alice");
    assert!(body.get("email").is_none());

    let missing = app.get(&format!("/api/v1/accounts/users/{}", uuid::Uuid::new_v4()), None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_follow_and_unfollow() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    let follow_url = format!("/api/v1/accounts/follow/{}", bob.id);
    let response = app.post(&follow_url, Some(&alice.token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json()["message"], "You are now following bob.");

    let again = app.post(&follow_url, Some(&alice.token), json!({})).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.json()["error"], "You are already following bob.");

    let own = app.post(&format!("/api/v1/accounts/follow/{}", alice.id), Some(&alice.token), json!({})).await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);
    assert_eq!(own.json()["error"], "You cannot follow yourself.");

    let unknown = app
        .post(&format!("/api/v1/accounts/follow/{}", uuid::Uuid::new_v4()), Some(&alice.token), json!({}))
        .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let followers = app.get(&format!("/api/v1/accounts/followers/{}", bob.id), None).await;
    assert_eq!(followers.json(), json!([{ "id": alice.id, "username": "alice" }]));

    let following = app.get("/api/v1/accounts/following", Some(&alice.token)).await;
    assert_eq!(following.json()[0]["username"], "bob");

    let profile = app.get("/api/v1/accounts/profile", Some(&bob.token)).await;
    assert_eq!(profile.json()["followers_count"], 1);

    let unfollow_url = format!("/api/v1/accounts/unfollow/{}", bob.id);
    let response = app.post(&unfollow_url, Some(&alice.token), json!({})).await;
    assert_eq!(response.status, StatusCode::OK);

    let not_following = app.post(&unfollow_url, Some(&alice.token), json!({})).await;
    assert_eq!(not_following.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_following.json()["error"], "You are not following bob.");

    let anonymous = app.get("/api/v1/accounts/followers", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_health_reports_backend() {
    let app = spawn_app().await;
    let response = app.get("/api/v1/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["services"]["backend"], "memory");
}

#[tokio::test]
async fn test_concurrent_registrations_share_one_email() {
    let app = spawn_app().await;
    let body = |username: &str| {
        json!({
            "username": username,
            "email": "shared@example.com",
            "password": PASSWORD,
            "password_confirm": PASSWORD
        })
    };

    let (first, second) = tokio::join!(
        app.post("/api/v1/accounts/register", None, body("alice")),
        app.post("/api/v1/accounts/register", None, body("bob")),
    );
    let mut statuses = vec![first.status, second.status];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let shouting = app
        .post(
            "/api/v1/accounts/register",
            None,
            json!({
                "username": "carol",
                "email": "SHARED@example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD
            }),
        )
        .await;
    assert_eq!(shouting.status, StatusCode::BAD_REQUEST);
    assert_eq!(shouting.json()["error"], "A user with that email already exists.");
}

#[tokio::test]
async fn test_staff_bootstrap_rejects_taken_email() {
    let mut config = AppConfig::for_tests();
    config.admin = Some(AdminBootstrap {
        username: "site_admin".to_string(),
        email: "alice@example.com".to_string(),
        password: PASSWORD.to_string(),
    });
    let state = AppState::with_database(config, DatabaseClient::in_memory()).unwrap();
    let request: RegisterRequest = serde_json::from_value(json!({
        "username": "alice",
        "email": "Alice@Example.com",
        "password": PASSWORD,
        "password_confirm": PASSWORD
    }))
    .unwrap();
    state.user_service.register(request, &state.auth_service).await.unwrap();

    let err = state.bootstrap().await.unwrap_err();
    assert_eq!(err.to_string(), "Validation error: A user with that email already exists.");
}

#[tokio::test]
async fn test_blank_username_is_rejected() {
    let app = spawn_app().await;
    let response = app
        .post(
            "/api/v1/accounts/register",
            None,
            json!({
                "username": "   ",
                "email": "blank@example.com",
                "password": PASSWORD,
                "password_confirm": PASSWORD
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_profile_put_accepts_partial_body() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let response = app
        .request(
            Method::PUT,
            "/api/v1/accounts/profile",
            Some(&alice.token),
            Some(json!({ "first_name": "Alice" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
    let body = response.json();
    assert_eq!(body["first_name"], "Alice");
    assert_eq!(body["email"], "alice@example.com");
}
