#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use community_hub::db::DatabaseClient;
use community_hub::{build_app, AdminBootstrap, AppConfig, AppState};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "Sup3r-Secret!";
pub const ADMIN_USERNAME: &str = "site_admin";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

pub struct TestUser {
    pub id: Uuid,
    pub username: String,
    pub token: String,
}

/// App backed by the in-process store with groups seeded and a staff account.
pub async fn spawn_app() -> TestApp {
    let mut config = AppConfig::for_tests();
    config.admin = Some(AdminBootstrap {
        username: ADMIN_USERNAME.to_string(),
        email: "admin@example.com".to_string(),
        password: PASSWORD.to_string(),
    });
    spawn_app_with(config, DatabaseClient::in_memory()).await
}

pub async fn spawn_app_with(config: AppConfig, db: DatabaseClient) -> TestApp {
    let state = AppState::with_database(config, db).unwrap();
    state.bootstrap().await.unwrap();
    TestApp { router: build_app(state.clone()), state }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap_or(Value::Null)
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(header::LOCATION).and_then(|v| v.to_str().ok())
    }

    /// `name=value` part of the first Set-Cookie header.
    pub fn cookie(&self) -> Option<String> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        TestResponse { status, headers, text: String::from_utf8_lossy(&bytes).to_string() }
    }

    pub async fn request(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    /// Browser-style request carrying an optional session cookie and form body.
    pub async fn page(&self, method: Method, uri: &str, cookie: Option<&str>, form: Option<&str>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, username: &str) -> TestUser {
        let response = self
            .post(
                "/api/v1/accounts/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": PASSWORD,
                    "password_confirm": PASSWORD
                }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
        let body = response.json();
        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            username: username.to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn login(&self, username: &str) -> String {
        let response = self
            .post("/api/v1/accounts/login", None, json!({ "username": username, "password": PASSWORD }))
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.text);
        response.json()["token"].as_str().unwrap().to_string()
    }
}
