use axum::{
    extract::{OriginalUri, Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::{middleware::MaybeClaims, Claims};
use crate::models::comment::CommentResponse;
use crate::models::post::{CreatePostRequest, PostListItem, PostOrdering, PostQuery, PostResponse, UpdatePostRequest};
use crate::models::{Page, PageParams, Pagination};
use crate::routes::{ApiJson, ApiQuery};
use crate::{AppState, Result};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct PostListParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl PostListParams {
    fn pagination(&self) -> Result<Pagination> {
        let params = PageParams { page: self.page, page_size: self.page_size };
        Pagination::from_params(&params, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)
    }

    fn query(&self) -> PostQuery {
        PostQuery {
            author_id: self.author,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            ordering: PostOrdering::parse(self.ordering.as_deref(), PostOrdering::CreatedDesc),
            ..Default::default()
        }
    }
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/:id",
            get(get_post).put(replace_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/:id/comments", get(post_comments))
        .route("/posts/:id/like", post(like_post))
        .route("/posts/:id/unlike", post(unlike_post))
        .route("/feed", get(feed))
}

pub async fn list_posts(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    ApiQuery(params): ApiQuery<PostListParams>,
) -> Result<ResponseJson<Page<Vec<PostListItem>>>> {
    let pagination = params.pagination()?;
    let (posts, count) = app_state.post_service.list_posts(&params.query(), pagination).await?;
    Ok(ResponseJson(Page::new(posts, count, pagination, &uri)))
}

pub async fn create_post(
    State(app_state): State<AppState>,
    claims: Claims,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<PostResponse>)> {
    let post = app_state.post_service.create_post(request, claims.user_id()).await?;
    Ok((StatusCode::CREATED, ResponseJson(post)))
}

pub async fn get_post(
    State(app_state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<PostResponse>> {
    let viewer = claims.map(|c| c.user_id());
    Ok(ResponseJson(app_state.post_service.get_post(post_id, viewer).await?))
}

pub async fn update_post(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdatePostRequest>,
) -> Result<ResponseJson<PostResponse>> {
    let post = app_state.post_service.update_post(post_id, request, claims.user_id()).await?;
    Ok(ResponseJson(post))
}

/// PUT needs every field; PATCH accepts any subset.
pub async fn replace_post(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<Uuid>,
    ApiJson(request): ApiJson<CreatePostRequest>,
) -> Result<ResponseJson<PostResponse>> {
    let post = app_state.post_service.update_post(post_id, request.into(), claims.user_id()).await?;
    Ok(ResponseJson(post))
}

pub async fn delete_post(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<Uuid>,
) -> Result<StatusCode> {
    app_state.post_service.delete_post(post_id, claims.user_id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn post_comments(
    State(app_state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Path(post_id): Path<Uuid>,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<ResponseJson<Page<Vec<CommentResponse>>>> {
    let pagination = Pagination::from_params(&params, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let (comments, count) = app_state.comment_service.comments_for_post(post_id, pagination).await?;
    Ok(ResponseJson(Page::new(comments, count, pagination, &uri)))
}

pub async fn like_post(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<Uuid>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let likes_count = app_state.post_service.like_post(post_id, claims.user_id()).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "message": "Post liked successfully",
            "likes_count": likes_count
        })),
    ))
}

pub async fn unlike_post(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(post_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let likes_count = app_state.post_service.unlike_post(post_id, claims.user_id()).await?;
    Ok(ResponseJson(json!({
        "message": "Post unliked successfully",
        "likes_count": likes_count
    })))
}

pub async fn feed(
    State(app_state): State<AppState>,
    claims: Claims,
    OriginalUri(uri): OriginalUri,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<ResponseJson<Page<Vec<PostListItem>>>> {
    let pagination = Pagination::from_params(&params, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let (posts, count) = app_state.post_service.feed(claims.user_id(), pagination).await?;
    Ok(ResponseJson(Page::new(posts, count, pagination, &uri)))
}
