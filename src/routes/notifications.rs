use axum::{
    extract::{OriginalUri, Path, State},
    response::Json as ResponseJson,
    routing::{get, patch},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::notification::NotificationFeed;
use crate::models::{Page, PageParams, Pagination};
use crate::routes::ApiQuery;
use crate::{AppState, Result};

const DEFAULT_PAGE_SIZE: u32 = 20;
const MAX_PAGE_SIZE: u32 = 100;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/read-all", patch(mark_all_read))
        .route("/notifications/:id/read", patch(mark_read))
}

pub async fn list_notifications(
    State(app_state): State<AppState>,
    claims: Claims,
    OriginalUri(uri): OriginalUri,
    ApiQuery(params): ApiQuery<PageParams>,
) -> Result<ResponseJson<Page<NotificationFeed>>> {
    let pagination = Pagination::from_params(&params, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?;
    let (feed, count) = app_state.notification_service.list(claims.user_id(), pagination).await?;
    Ok(ResponseJson(Page::new(feed, count, pagination, &uri)))
}

pub async fn mark_read(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(notification_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    app_state.notification_service.mark_read(notification_id, claims.user_id()).await?;
    Ok(ResponseJson(json!({
        "message": "Notification marked as read",
        "notification_id": notification_id
    })))
}

pub async fn mark_all_read(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<Value>> {
    let updated_count = app_state.notification_service.mark_all_read(claims.user_id()).await?;
    Ok(ResponseJson(json!({
        "message": format!("{} notifications marked as read", updated_count),
        "updated_count": updated_count
    })))
}
