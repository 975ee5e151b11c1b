use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
    Router,
};
use chrono::Utc;
use serde_json::json;

use crate::routes::{accounts, bookshelf, catalog, comments, notifications, posts};
use crate::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(api_health))
        .nest("/accounts", accounts::routes())
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(notifications::routes())
        .merge(catalog::routes())
        .nest("/bookshelf", bookshelf::routes())
}

async fn api_health(State(app_state): State<AppState>) -> impl IntoResponse {
    let (status, database) = match app_state.db.health_check().await {
        Ok(()) => (StatusCode::OK, "healthy"),
        Err(e) => {
            tracing::error!("❌ HEALTH: Database check failed: {}", e);
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
        }
    };

    (
        status,
        ResponseJson(json!({
            "status": if status == StatusCode::OK { "healthy" } else { "unhealthy" },
            "timestamp": Utc::now(),
            "version": env!("CARGO_PKG_VERSION"),
            "services": {
                "database": database,
                "backend": app_state.db.backend()
            }
        })),
    )
}
