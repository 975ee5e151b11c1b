mod common;

use axum::http::{Method, StatusCode};
use common::{spawn_app, TestApp, TestUser, ADMIN_USERNAME};
use serde_json::{json, Value};

fn shelf_book(isbn: &str) -> Value {
    json!({
        "title": "The Left Hand of Darkness",
        "author": "Ursula K. Le Guin",
        "isbn": isbn,
        "publication_date": "1969-03-01"
    })
}

async fn join_group(app: &TestApp, admin_token: &str, group: &str, user: &TestUser) {
    let response = app
        .post(
            &format!("/api/v1/bookshelf/groups/{}/members", group),
            Some(admin_token),
            json!({ "user_id": user.id }),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK, "{}", response.text);
}

#[tokio::test]
async fn test_groups_seeded_with_permissions() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME).await;

    let groups = app.get("/api/v1/bookshelf/groups", Some(&admin)).await;
    assert_eq!(groups.status, StatusCode::OK);
    let body = groups.json();
    let editors = body
        .as_array()
        .unwrap()
        .iter()
        .find(|g| g["name"] == "Editors")
        .unwrap();
    assert_eq!(editors["permissions"], json!(["can_view", "can_create", "can_edit"]));

    let permissions = app.get("/api/v1/bookshelf/permissions", Some(&admin)).await.json();
    assert_eq!(
        permissions["permissions"],
        json!(["can_view", "can_create", "can_edit", "can_delete"])
    );
}

#[tokio::test]
async fn test_permission_matrix() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME).await;
    let viewer = app.register("viewer").await;
    let editor = app.register("editor").await;
    let outsider = app.register("outsider").await;
    join_group(&app, &admin, "Viewers", &viewer).await;
    join_group(&app, &admin, "Editors", &editor).await;

    assert_eq!(app.get("/api/v1/bookshelf/books", None).await.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        app.get("/api/v1/bookshelf/books", Some(&outsider.token)).await.status,
        StatusCode::FORBIDDEN
    );

    let viewer_create = app
        .post("/api/v1/bookshelf/books", Some(&viewer.token), shelf_book("9780441478125"))
        .await;
    assert_eq!(viewer_create.status, StatusCode::FORBIDDEN);

    let created = app
        .post("/api/v1/bookshelf/books", Some(&editor.token), shelf_book("9780441478125"))
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.text);
    let book = created.json();
    assert_eq!(book["owner_id"], json!(editor.id));
    let url = format!("/api/v1/bookshelf/books/{}", book["id"].as_str().unwrap());

    let listed = app.get("/api/v1/bookshelf/books?q=le%20guin", Some(&viewer.token)).await;
    assert_eq!(listed.status, StatusCode::OK);
    assert_eq!(listed.json().as_array().unwrap().len(), 1);
    assert_eq!(app.get(&url, Some(&viewer.token)).await.status, StatusCode::OK);

    let mut edited = shelf_book("9780441478125");
    edited["title"] = json!("The Left Hand of Darkness (Ace)");
    let viewer_edit = app.request(Method::PUT, &url, Some(&viewer.token), Some(edited.clone())).await;
    assert_eq!(viewer_edit.status, StatusCode::FORBIDDEN);
    let editor_edit = app.request(Method::PUT, &url, Some(&editor.token), Some(edited)).await;
    assert_eq!(editor_edit.status, StatusCode::OK);
    assert_eq!(editor_edit.json()["title"], "The Left Hand of Darkness (Ace)");

    let editor_delete = app.request(Method::DELETE, &url, Some(&editor.token), None).await;
    assert_eq!(editor_delete.status, StatusCode::FORBIDDEN);

    join_group(&app, &admin, "Admins", &editor).await;
    let admin_delete = app.request(Method::DELETE, &url, Some(&editor.token), None).await;
    assert_eq!(admin_delete.status, StatusCode::NO_CONTENT);
    assert_eq!(app.get(&url, Some(&viewer.token)).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_isbn_rules() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME).await;

    let short = app.post("/api/v1/bookshelf/books", Some(&admin), shelf_book("12345")).await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);

    let letters = app.post("/api/v1/bookshelf/books", Some(&admin), shelf_book("97804414781X5")).await;
    assert_eq!(letters.status, StatusCode::BAD_REQUEST);

    let first = app.post("/api/v1/bookshelf/books", Some(&admin), shelf_book("9780441478125")).await;
    assert_eq!(first.status, StatusCode::CREATED);
    let again = app.post("/api/v1/bookshelf/books", Some(&admin), shelf_book("9780441478125")).await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);
    assert_eq!(again.json()["error"], "A book with this ISBN already exists.");
}

#[tokio::test]
async fn test_group_admin_is_staff_only() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME).await;
    let member = app.register("member").await;

    let denied = app.get("/api/v1/bookshelf/groups", Some(&member.token)).await;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);
    assert_eq!(denied.json()["error"], "Only staff users may manage groups.");

    let unknown_group = app
        .post(
            "/api/v1/bookshelf/groups/Wizards/members",
            Some(&admin),
            json!({ "user_id": member.id }),
        )
        .await;
    assert_eq!(unknown_group.status, StatusCode::NOT_FOUND);

    join_group(&app, &admin, "Viewers", &member).await;
    assert_eq!(
        app.get("/api/v1/bookshelf/permissions", Some(&member.token)).await.json()["permissions"],
        json!(["can_view"])
    );

    let removed = app
        .request(
            Method::DELETE,
            &format!("/api/v1/bookshelf/groups/Viewers/members/{}", member.id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.json()["user"]["groups"], json!([]));
    assert_eq!(
        app.get("/api/v1/bookshelf/books", Some(&member.token)).await.status,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_blank_title_and_author_are_rejected() {
    let app = spawn_app().await;
    let admin = app.login(ADMIN_USERNAME).await;

    let mut blank = shelf_book("9780441478125");
    blank["title"] = json!("   ");
    blank["author"] = json!(" ");
    let response = app.post("/api/v1/bookshelf/books", Some(&admin), blank).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    let fields = &response.json()["fields"];
    assert!(fields.get("title").is_some());
    assert!(fields.get("author").is_some());
}
