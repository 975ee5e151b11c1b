use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::bookshelf::{ShelfBookRequest, ShelfSearch};
use crate::models::{Group, ShelfBook, User};
use crate::routes::{ApiJson, ApiQuery};
use crate::{AppState, Result};

#[derive(Debug, Deserialize)]
pub struct MemberRequest {
    pub user_id: Uuid,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/:id", get(get_book).put(update_book).delete(delete_book))
        .route("/permissions", get(my_permissions))
        .route("/groups", get(list_groups))
        .route("/groups/:name/members", post(add_member))
        .route("/groups/:name/members/:user_id", delete(remove_member))
}

fn membership(user: &User) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "groups": user.groups
    })
}

pub async fn list_books(
    State(app_state): State<AppState>,
    claims: Claims,
    ApiQuery(search): ApiQuery<ShelfSearch>,
) -> Result<ResponseJson<Vec<ShelfBook>>> {
    let books = app_state
        .bookshelf_service
        .list_books(claims.user_id(), search.q.as_deref())
        .await?;
    Ok(ResponseJson(books))
}

pub async fn get_book(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(book_id): Path<Uuid>,
) -> Result<ResponseJson<ShelfBook>> {
    Ok(ResponseJson(app_state.bookshelf_service.get_book(claims.user_id(), book_id).await?))
}

pub async fn create_book(
    State(app_state): State<AppState>,
    claims: Claims,
    ApiJson(request): ApiJson<ShelfBookRequest>,
) -> Result<(StatusCode, ResponseJson<ShelfBook>)> {
    let book = app_state.bookshelf_service.create_book(claims.user_id(), request).await?;
    Ok((StatusCode::CREATED, ResponseJson(book)))
}

pub async fn update_book(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(book_id): Path<Uuid>,
    ApiJson(request): ApiJson<ShelfBookRequest>,
) -> Result<ResponseJson<ShelfBook>> {
    let book = app_state
        .bookshelf_service
        .update_book(claims.user_id(), book_id, request)
        .await?;
    Ok(ResponseJson(book))
}

pub async fn delete_book(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode> {
    app_state.bookshelf_service.delete_book(claims.user_id(), book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn my_permissions(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<Value>> {
    let permissions = app_state.bookshelf_service.my_permissions(claims.user_id()).await?;
    Ok(ResponseJson(json!({ "permissions": permissions })))
}

pub async fn list_groups(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<Vec<Group>>> {
    Ok(ResponseJson(app_state.bookshelf_service.list_groups(claims.user_id()).await?))
}

pub async fn add_member(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(group): Path<String>,
    ApiJson(request): ApiJson<MemberRequest>,
) -> Result<ResponseJson<Value>> {
    let user = app_state
        .bookshelf_service
        .add_member(claims.user_id(), &group, request.user_id)
        .await?;
    Ok(ResponseJson(json!({
        "message": format!("{} added to {}", user.username, group),
        "user": membership(&user)
    })))
}

pub async fn remove_member(
    State(app_state): State<AppState>,
    claims: Claims,
    Path((group, member_id)): Path<(String, Uuid)>,
) -> Result<ResponseJson<Value>> {
    let user = app_state
        .bookshelf_service
        .remove_member(claims.user_id(), &group, member_id)
        .await?;
    Ok(ResponseJson(json!({
        "message": format!("{} removed from {}", user.username, group),
        "user": membership(&user)
    })))
}
