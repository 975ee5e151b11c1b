mod common;

use async_trait::async_trait;
use axum::http::StatusCode;
use community_hub::db::repository::PostRepository;
use community_hub::db::DatabaseClient;
use community_hub::models::post::PostQuery;
use community_hub::models::Post;
use community_hub::{AppConfig, AppError, Result};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

// Post store that fails every call, standing in for a lost database connection
pub struct FailingPostRepository;

fn failure<T>() -> Result<T> {
    Err(AppError::DatabaseError("connection refused: primary store unavailable".to_string()))
}

#[async_trait]
impl PostRepository for FailingPostRepository {
    async fn create_post(&self, _post: &Post) -> Result<Post> {
        failure()
    }

    async fn get_post_by_id(&self, _id: Uuid) -> Result<Option<Post>> {
        failure()
    }

    async fn list_posts(&self, _query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        failure()
    }

    async fn update_post(&self, _post: &Post) -> Result<Post> {
        failure()
    }

    async fn delete_post(&self, _id: Uuid) -> Result<()> {
        failure()
    }
}

async fn failing_app() -> common::TestApp {
    let mut db = DatabaseClient::in_memory();
    db.post_repo = Arc::new(FailingPostRepository);
    common::spawn_app_with(AppConfig::for_tests(), db).await
}

#[tokio::test]
async fn test_store_failures_surface_as_generic_500() {
    let app = failing_app().await;

    let response = app.get("/api/v1/posts", None).await;
    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    let body = response.json();
    assert_eq!(body["error"], "Internal server error");
    assert!(!response.text.contains("connection refused"));
}

#[tokio::test]
async fn test_other_features_keep_working() {
    let app = failing_app().await;
    let alice = app.register("alice").await;

    let create = app
        .post("/api/v1/posts", Some(&alice.token), json!({ "title": "Lost", "content": "Never stored" }))
        .await;
    assert_eq!(create.status, StatusCode::INTERNAL_SERVER_ERROR);

    let profile = app.get("/api/v1/accounts/profile", Some(&alice.token)).await;
    assert_eq!(profile.status, StatusCode::OK);

    let catalog = app.get("/api/v1/books", None).await;
    assert_eq!(catalog.status, StatusCode::OK);
}
