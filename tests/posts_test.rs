mod common;

use axum::http::{Method, StatusCode};
use common::spawn_app;
use serde_json::{json, Value};

async fn create_post(app: &common::TestApp, token: &str, title: &str, content: &str) -> Value {
    let response = app
        .post("/api/v1/posts", Some(token), json!({ "title": title, "content": content }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED, "{}", response.text);
    response.json()
}

#[tokio::test]
async fn test_create_requires_auth_and_valid_fields() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let anonymous = app.post("/api/v1/posts", None, json!({ "title": "Hi", "content": "There" })).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);

    let empty_title = app
        .post("/api/v1/posts", Some(&alice.token), json!({ "title": "", "content": "Body" }))
        .await;
    assert_eq!(empty_title.status, StatusCode::BAD_REQUEST);

    let post = create_post(&app, &alice.token, "First post", "Hello world").await;
    assert_eq!(post["author"]["username"], "alice");
    assert_eq!(post["comments_count"], 0);
    assert_eq!(post["likes_count"], 0);
    assert_eq!(post["comments"], json!([]));
}

#[tokio::test]
async fn test_list_paginates_and_filters() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;

    for i in 1..=4 {
        create_post(&app, &alice.token, &format!("Alice post {}", i), "Gardening notes").await;
    }
    create_post(&app, &bob.token, "Bob on Rust", "Ownership and borrowing").await;

    let first = app.get("/api/v1/posts?page_size=2", None).await;
    assert_eq!(first.status, StatusCode::OK);
    let body = first.json();
    assert_eq!(body["count"], 5);
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["results"][0]["title"], "Bob on Rust");
    assert_eq!(body["previous"], Value::Null);
    assert_eq!(body["next"], "/api/v1/posts?page_size=2&page=2");

    let last = app.get("/api/v1/posts?page_size=2&page=3", None).await.json();
    assert_eq!(last["results"].as_array().unwrap().len(), 1);
    assert_eq!(last["next"], Value::Null);
    assert_eq!(last["previous"], "/api/v1/posts?page_size=2&page=2");

    let beyond = app.get("/api/v1/posts?page_size=2&page=4", None).await;
    assert_eq!(beyond.status, StatusCode::NOT_FOUND);
    assert_eq!(beyond.json()["error"], "Invalid page.");

    let by_author = app.get(&format!("/api/v1/posts?author={}", bob.id), None).await.json();
    assert_eq!(by_author["count"], 1);

    let search = app.get("/api/v1/posts?search=BORROW", None).await.json();
    assert_eq!(search["count"], 1);
    assert_eq!(search["results"][0]["title"], "Bob on Rust");

    let oldest_first = app.get("/api/v1/posts?ordering=created_at", None).await.json();
    assert_eq!(oldest_first["results"][0]["title"], "Alice post 1");
}

#[tokio::test]
async fn test_only_author_may_modify() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let post = create_post(&app, &alice.token, "Original", "Some content").await;
    let url = format!("/api/v1/posts/{}", post["id"].as_str().unwrap());

    let forbidden = app
        .request(Method::PATCH, &url, Some(&bob.token), Some(json!({ "title": "Hijacked" })))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);
    assert_eq!(forbidden.json()["error"], "You do not have permission to perform this action.");

    let patched = app
        .request(Method::PATCH, &url, Some(&alice.token), Some(json!({ "title": "Edited" })))
        .await;
    assert_eq!(patched.status, StatusCode::OK);
    assert_eq!(patched.json()["title"], "Edited");
    assert_eq!(patched.json()["content"], "Some content");

    let incomplete_put = app
        .request(Method::PUT, &url, Some(&alice.token), Some(json!({ "title": "Only title" })))
        .await;
    assert_eq!(incomplete_put.status, StatusCode::BAD_REQUEST);

    let delete_forbidden = app.request(Method::DELETE, &url, Some(&bob.token), None).await;
    assert_eq!(delete_forbidden.status, StatusCode::FORBIDDEN);

    let deleted = app.request(Method::DELETE, &url, Some(&alice.token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);

    let gone = app.get(&url, None).await;
    assert_eq!(gone.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_likes_and_notifications() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let post = create_post(&app, &alice.token, "Likeable", "Please like this").await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let liked = app.post(&format!("/api/v1/posts/{}/like", post_id), Some(&bob.token), json!({})).await;
    assert_eq!(liked.status, StatusCode::CREATED);
    assert_eq!(liked.json()["likes_count"], 1);

    let twice = app.post(&format!("/api/v1/posts/{}/like", post_id), Some(&bob.token), json!({})).await;
    assert_eq!(twice.status, StatusCode::BAD_REQUEST);
    assert_eq!(twice.json()["error"], "You have already liked this post.");

    let own = app.post(&format!("/api/v1/posts/{}/like", post_id), Some(&alice.token), json!({})).await;
    assert_eq!(own.status, StatusCode::CREATED);

    let detail = app.get(&format!("/api/v1/posts/{}", post_id), Some(&bob.token)).await.json();
    assert_eq!(detail["likes_count"], 2);
    assert_eq!(detail["is_liked_by_user"], true);
    let anonymous = app.get(&format!("/api/v1/posts/{}", post_id), None).await.json();
    assert_eq!(anonymous["is_liked_by_user"], false);

    // Alice's own like does not notify her.
    let notifications = app.get("/api/v1/notifications", Some(&alice.token)).await;
    assert_eq!(notifications.status, StatusCode::OK);
    let body = notifications.json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"]["unread_count"], 1);
    let entry = &body["results"]["notifications"][0];
    assert_eq!(entry["verb"], "like");
    assert_eq!(entry["target_type"], "post");
    assert_eq!(entry["target_id"], post_id.as_str());
    assert_eq!(entry["actor"]["username"], "bob");
    assert_eq!(entry["read"], false);

    let unliked = app.post(&format!("/api/v1/posts/{}/unlike", post_id), Some(&bob.token), json!({})).await;
    assert_eq!(unliked.status, StatusCode::OK);
    assert_eq!(unliked.json()["likes_count"], 1);

    let not_liked = app.post(&format!("/api/v1/posts/{}/unlike", post_id), Some(&bob.token), json!({})).await;
    assert_eq!(not_liked.status, StatusCode::BAD_REQUEST);
    assert_eq!(not_liked.json()["error"], "You have not liked this post.");
}

#[tokio::test]
async fn test_mark_notifications_read() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;

    app.post(&format!("/api/v1/accounts/follow/{}", alice.id), Some(&bob.token), json!({})).await;
    app.post(&format!("/api/v1/accounts/follow/{}", alice.id), Some(&carol.token), json!({})).await;

    let body = app.get("/api/v1/notifications", Some(&alice.token)).await.json();
    assert_eq!(body["results"]["unread_count"], 2);
    assert_eq!(body["results"]["notifications"][0]["verb"], "follow");
    let first_id = body["results"]["notifications"][0]["id"].as_str().unwrap().to_string();

    let other_user = app
        .request(Method::PATCH, &format!("/api/v1/notifications/{}/read", first_id), Some(&bob.token), None)
        .await;
    assert_eq!(other_user.status, StatusCode::NOT_FOUND);

    let marked = app
        .request(Method::PATCH, &format!("/api/v1/notifications/{}/read", first_id), Some(&alice.token), None)
        .await;
    assert_eq!(marked.status, StatusCode::OK);
    assert_eq!(marked.json()["notification_id"], first_id.as_str());

    let all = app.request(Method::PATCH, "/api/v1/notifications/read-all", Some(&alice.token), None).await;
    assert_eq!(all.status, StatusCode::OK);
    assert_eq!(all.json()["updated_count"], 1);

    let body = app.get("/api/v1/notifications", Some(&alice.token)).await.json();
    assert_eq!(body["results"]["unread_count"], 0);

    let anonymous = app.get("/api/v1/notifications", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_comments_flow() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let post = create_post(&app, &alice.token, "Discuss", "Thoughts welcome").await;
    let post_id = post["id"].as_str().unwrap().to_string();

    let missing_post = app.post("/api/v1/comments", Some(&bob.token), json!({ "content": "Hello" })).await;
    assert_eq!(missing_post.status, StatusCode::BAD_REQUEST);
    assert_eq!(missing_post.json()["error"], "post field is required");

    let unknown_post = app
        .post(
            "/api/v1/comments",
            Some(&bob.token),
            json!({ "post": uuid::Uuid::new_v4(), "content": "Hello" }),
        )
        .await;
    assert_eq!(unknown_post.status, StatusCode::BAD_REQUEST);

    let created = app
        .post("/api/v1/comments", Some(&bob.token), json!({ "post": post_id, "content": "Nice post" }))
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    let comment_id = created.json()["id"].as_str().unwrap().to_string();

    let for_post = app.get(&format!("/api/v1/posts/{}/comments", post_id), None).await.json();
    assert_eq!(for_post["count"], 1);
    assert_eq!(for_post["results"][0]["content"], "Nice post");

    let filtered = app.get(&format!("/api/v1/comments?post={}", post_id), None).await.json();
    assert_eq!(filtered["count"], 1);

    let detail = app.get(&format!("/api/v1/posts/{}", post_id), None).await.json();
    assert_eq!(detail["comments_count"], 1);

    let notifications = app.get("/api/v1/notifications", Some(&alice.token)).await.json();
    assert_eq!(notifications["results"]["notifications"][0]["verb"], "comment");

    let url = format!("/api/v1/comments/{}", comment_id);
    let forbidden = app
        .request(Method::PATCH, &url, Some(&alice.token), Some(json!({ "content": "Edited by alice" })))
        .await;
    assert_eq!(forbidden.status, StatusCode::FORBIDDEN);

    let edited = app
        .request(Method::PUT, &url, Some(&bob.token), Some(json!({ "content": "Edited" })))
        .await;
    assert_eq!(edited.status, StatusCode::OK);
    assert_eq!(edited.json()["content"], "Edited");

    let deleted = app.request(Method::DELETE, &url, Some(&bob.token), None).await;
    assert_eq!(deleted.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&url, None).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_feed_shows_followed_authors() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;

    create_post(&app, &bob.token, "From bob", "Followed content").await;
    create_post(&app, &carol.token, "From carol", "Unfollowed content").await;

    let empty = app.get("/api/v1/feed", Some(&alice.token)).await.json();
    assert_eq!(empty["count"], 0);

    app.post(&format!("/api/v1/accounts/follow/{}", bob.id), Some(&alice.token), json!({})).await;
    let feed = app.get("/api/v1/feed", Some(&alice.token)).await.json();
    assert_eq!(feed["count"], 1);
    assert_eq!(feed["results"][0]["title"], "From bob");

    assert_eq!(app.get("/api/v1/feed", None).await.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_whitespace_only_fields_are_rejected() {
    let app = spawn_app().await;
    let alice = app.register("alice").await;

    let blank = app
        .post("/api/v1/posts", Some(&alice.token), json!({ "title": "   ", "content": "  " }))
        .await;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST, "{}", blank.text);
    let fields = &blank.json()["fields"];
    assert!(fields.get("title").is_some());
    assert!(fields.get("content").is_some());

    let post = create_post(&app, &alice.token, "  Padded title  ", "  Body text \n").await;
    assert_eq!(post["title"], "Padded title");
    assert_eq!(post["content"], "Body text");
    let id = post["id"].as_str().unwrap();

    let blank_patch = app
        .request(
            Method::PATCH,
            &format!("/api/v1/posts/{}", id),
            Some(&alice.token),
            Some(json!({ "content": " \t " })),
        )
        .await;
    assert_eq!(blank_patch.status, StatusCode::BAD_REQUEST);

    let blank_comment = app
        .post("/api/v1/comments", Some(&alice.token), json!({ "post": id, "content": "   " }))
        .await;
    assert_eq!(blank_comment.status, StatusCode::BAD_REQUEST);

    let unchanged = app.get(&format!("/api/v1/posts/{}", id), None).await.json();
    assert_eq!(unchanged["content"], "Body text");
    assert_eq!(unchanged["comments_count"], 0);
}

#[tokio::test]
async fn test_malformed_query_string_returns_json_error() {
    let app = spawn_app().await;

    let response = app.get("/api/v1/posts?page=abc", None).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let body = response.json();
    assert_eq!(body["status"], 400);
    assert!(body["error"].is_string());

    let comments = app.get("/api/v1/comments?page_size=lots", None).await;
    assert_eq!(comments.status, StatusCode::BAD_REQUEST);
    assert_eq!(comments.json()["status"], 400);
}
