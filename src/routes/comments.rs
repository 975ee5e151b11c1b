use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::get,
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::comment::{CommentQuery, CommentResponse, CreateCommentRequest, UpdateCommentRequest};
use crate::models::post::PostOrdering;
use crate::models::{Page, PageParams, Pagination};
use crate::routes::posts::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::routes::{ApiJson, ApiQuery};
use crate::{AppState, Result};

#[derive(Debug, Default, Deserialize)]
pub struct CommentListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub post: Option<Uuid>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/comments", get(list_comments).post(create_comment))
        .route(
            "/comments/:id",
            get(get_comment).put(update_comment).patch(update_comment).delete(delete_comment),
        )
}

pub async fn list_comments(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(params): ApiQuery<CommentListParams>,
) -> Result<ResponseJson<Page<Vec<CommentResponse>>>> {
    let page_params = PageParams { page: params.page, page_size: params.page_size };
    let pagination = Pagination::from_params(&page_params, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let query = CommentQuery {
        post_id: params.post,
        author_id: params.author,
        search: params.search.filter(|s| !s.trim().is_empty()),
        ordering: PostOrdering::parse(params.ordering.as_deref(), PostOrdering::CreatedAsc),
        ..Default::default()
    };
    let (comments, count) = app_state.comment_service.list_comments(&query, pagination).await?;
    Ok(ResponseJson(Page::new(comments, count, pagination, &uri)))
}

pub async fn create_comment(
    State(app_state): State<AppState>,
    claims: Claims,
    ApiJson(request): ApiJson<CreateCommentRequest>,
) -> Result<(StatusCode, ResponseJson<CommentResponse>)> {
    let comment = app_state.comment_service.create_comment(request, claims.user_id()).await?;
    Ok((StatusCode::CREATED, ResponseJson(comment)))
}

pub async fn get_comment(
    State(app_state): State<AppState>,
    Path(comment_id): Path<Uuid>,
) -> Result<ResponseJson<CommentResponse>> {
    Ok(ResponseJson(app_state.comment_service.get_comment(comment_id).await?))
}

pub async fn update_comment(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(comment_id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateCommentRequest>,
) -> Result<ResponseJson<CommentResponse>> {
    let comment = app_state
        .comment_service
        .update_comment(comment_id, request, claims.user_id())
        .await?;
    Ok(ResponseJson(comment))
}

pub async fn delete_comment(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(comment_id): Path<Uuid>,
) -> Result<StatusCode> {
    app_state.comment_service.delete_comment(comment_id, claims.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
