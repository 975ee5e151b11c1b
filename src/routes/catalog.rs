use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{delete, get, post, put},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::catalog::{
    AddLibraryBookRequest, AssignLibrarianRequest, AuthorFilter, AuthorResponse, BookFilter, BookRequest,
    CreateAuthorRequest, CreateLibraryRequest, LibraryResponse, PatchBookRequest,
};
use crate::models::{Book, Librarian};
use crate::routes::{ApiJson, ApiQuery};
use crate::{AppError, AppState, Result};

#[derive(Debug, Deserialize)]
pub struct AuthorNameParams {
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LibraryNameParams {
    pub library: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/create", post(create_book))
        .route(
            "/books/:id",
            get(get_book).put(update_book).patch(patch_book).delete(delete_book),
        )
        .route("/books/:id/update", put(update_book).patch(patch_book))
        .route("/books/:id/delete", delete(delete_book))
        .route("/authors", get(list_authors).post(create_author))
        .route("/authors/create", post(create_author))
        .route("/authors/:id", get(get_author))
        .route("/libraries", get(list_libraries).post(create_library))
        .route("/libraries/:id", get(get_library))
        .route("/libraries/:id/books", post(add_library_book))
        .route("/libraries/:id/librarian", put(assign_librarian))
        .route("/relationships/author-books", get(books_by_author))
        .route("/relationships/library-books", get(books_in_library))
        .route("/relationships/library-librarian", get(library_librarian))
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::ValidationError(format!("Query parameter '{}' is required", name)))
}

pub async fn list_books(
    State(app_state): State<AppState>,
    ApiQuery(filter): ApiQuery<BookFilter>,
) -> Result<ResponseJson<Vec<Book>>> {
    Ok(ResponseJson(app_state.catalog_service.list_books(&filter).await?))
}

pub async fn get_book(State(app_state): State<AppState>, Path(book_id): Path<Uuid>) -> Result<ResponseJson<Book>> {
    Ok(ResponseJson(app_state.catalog_service.get_book(book_id).await?))
}

pub async fn create_book(
    State(app_state): State<AppState>,
    _claims: Claims,
    ApiJson(request): ApiJson<BookRequest>,
) -> Result<(StatusCode, ResponseJson<Book>)> {
    let book = app_state.catalog_service.create_book(request).await?;
    Ok((StatusCode::CREATED, ResponseJson(book)))
}

pub async fn update_book(
    State(app_state): State<AppState>,
    _claims: Claims,
    Path(book_id): Path<Uuid>,
    ApiJson(request): ApiJson<BookRequest>,
) -> Result<ResponseJson<Book>> {
    Ok(ResponseJson(app_state.catalog_service.update_book(book_id, request).await?))
}

pub async fn patch_book(
    State(app_state): State<AppState>,
    _claims: Claims,
    Path(book_id): Path<Uuid>,
    ApiJson(request): ApiJson<PatchBookRequest>,
) -> Result<ResponseJson<Book>> {
    Ok(ResponseJson(app_state.catalog_service.patch_book(book_id, request).await?))
}

pub async fn delete_book(
    State(app_state): State<AppState>,
    _claims: Claims,
    Path(book_id): Path<Uuid>,
) -> Result<StatusCode> {
    app_state.catalog_service.delete_book(book_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_authors(
    State(app_state): State<AppState>,
    ApiQuery(filter): ApiQuery<AuthorFilter>,
) -> Result<ResponseJson<Vec<AuthorResponse>>> {
    Ok(ResponseJson(app_state.catalog_service.list_authors(&filter).await?))
}

pub async fn get_author(
    State(app_state): State<AppState>,
    Path(author_id): Path<Uuid>,
) -> Result<ResponseJson<AuthorResponse>> {
    Ok(ResponseJson(app_state.catalog_service.get_author(author_id).await?))
}

pub async fn create_author(
    State(app_state): State<AppState>,
    _claims: Claims,
    ApiJson(request): ApiJson<CreateAuthorRequest>,
) -> Result<(StatusCode, ResponseJson<AuthorResponse>)> {
    let author = app_state.catalog_service.create_author(request).await?;
    Ok((StatusCode::CREATED, ResponseJson(author)))
}

pub async fn list_libraries(State(app_state): State<AppState>) -> Result<ResponseJson<Vec<LibraryResponse>>> {
    Ok(ResponseJson(app_state.catalog_service.list_libraries().await?))
}

pub async fn get_library(
    State(app_state): State<AppState>,
    Path(library_id): Path<Uuid>,
) -> Result<ResponseJson<LibraryResponse>> {
    Ok(ResponseJson(app_state.catalog_service.get_library(library_id).await?))
}

pub async fn create_library(
    State(app_state): State<AppState>,
    _claims: Claims,
    ApiJson(request): ApiJson<CreateLibraryRequest>,
) -> Result<(StatusCode, ResponseJson<LibraryResponse>)> {
    let library = app_state.catalog_service.create_library(request).await?;
    Ok((StatusCode::CREATED, ResponseJson(library)))
}

pub async fn add_library_book(
    State(app_state): State<AppState>,
    _claims: Claims,
    Path(library_id): Path<Uuid>,
    ApiJson(request): ApiJson<AddLibraryBookRequest>,
) -> Result<ResponseJson<LibraryResponse>> {
    let library = app_state
        .catalog_service
        .add_book_to_library(library_id, request.book)
        .await?;
    Ok(ResponseJson(library))
}

pub async fn assign_librarian(
    State(app_state): State<AppState>,
    _claims: Claims,
    Path(library_id): Path<Uuid>,
    ApiJson(request): ApiJson<AssignLibrarianRequest>,
) -> Result<ResponseJson<Librarian>> {
    Ok(ResponseJson(app_state.catalog_service.assign_librarian(library_id, request).await?))
}

pub async fn books_by_author(
    State(app_state): State<AppState>,
    ApiQuery(params): ApiQuery<AuthorNameParams>,
) -> Result<ResponseJson<Vec<Book>>> {
    let author = required(params.author, "author")?;
    Ok(ResponseJson(app_state.catalog_service.books_by_author(&author).await?))
}

pub async fn books_in_library(
    State(app_state): State<AppState>,
    ApiQuery(params): ApiQuery<LibraryNameParams>,
) -> Result<ResponseJson<Vec<Book>>> {
    let library = required(params.library, "library")?;
    Ok(ResponseJson(app_state.catalog_service.books_in_library(&library).await?))
}

pub async fn library_librarian(
    State(app_state): State<AppState>,
    ApiQuery(params): ApiQuery<LibraryNameParams>,
) -> Result<ResponseJson<Librarian>> {
    let library = required(params.library, "library")?;
    Ok(ResponseJson(app_state.catalog_service.librarian_for_library(&library).await?))
}
