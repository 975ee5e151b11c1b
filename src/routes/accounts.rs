use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json as ResponseJson,
    routing::{get, post},
    Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::auth::Claims;
use crate::models::user::{LoginRequest, RegisterRequest, UpdateProfileRequest, UserResponse, UserSummary};
use crate::routes::ApiJson;
use crate::{AppState, Result};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile).patch(update_profile))
        .route("/users/:user_id", get(get_user))
        .route("/follow/:user_id", post(follow_user))
        .route("/unfollow/:user_id", post(unfollow_user))
        .route("/followers", get(my_followers))
        .route("/followers/:user_id", get(user_followers))
        .route("/following", get(my_following))
        .route("/following/:user_id", get(user_following))
}

pub async fn register(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, ResponseJson<Value>)> {
    let (user, token) = app_state.user_service.register(request, &app_state.auth_service).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(json!({
            "user": user,
            "token": token,
            "message": "User registered successfully"
        })),
    ))
}

pub async fn login(
    State(app_state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<ResponseJson<Value>> {
    let (user, token) = app_state.user_service.login(request, &app_state.auth_service).await?;
    Ok(ResponseJson(json!({
        "user": user,
        "token": token,
        "message": "Login successful"
    })))
}

pub async fn get_profile(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<UserResponse>> {
    Ok(ResponseJson(app_state.user_service.get_profile(claims.user_id()).await?))
}

/// PUT and PATCH both accept any subset: every writable profile field may be blank.
/// Read-only fields are ignored.
pub async fn update_profile(
    State(app_state): State<AppState>,
    claims: Claims,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<ResponseJson<UserResponse>> {
    Ok(ResponseJson(app_state.user_service.update_profile(claims.user_id(), request).await?))
}

pub async fn get_user(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<UserResponse>> {
    Ok(ResponseJson(app_state.user_service.get_public_profile(user_id).await?))
}

pub async fn follow_user(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let target = app_state.user_service.follow(claims.user_id(), user_id).await?;
    Ok(ResponseJson(json!({
        "message": format!("You are now following {}.", target.username)
    })))
}

pub async fn unfollow_user(
    State(app_state): State<AppState>,
    claims: Claims,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<Value>> {
    let target = app_state.user_service.unfollow(claims.user_id(), user_id).await?;
    Ok(ResponseJson(json!({
        "message": format!("You have unfollowed {}.", target.username)
    })))
}

pub async fn my_followers(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<Vec<UserSummary>>> {
    Ok(ResponseJson(app_state.user_service.followers(claims.user_id()).await?))
}

pub async fn user_followers(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<Vec<UserSummary>>> {
    Ok(ResponseJson(app_state.user_service.followers(user_id).await?))
}

pub async fn my_following(State(app_state): State<AppState>, claims: Claims) -> Result<ResponseJson<Vec<UserSummary>>> {
    Ok(ResponseJson(app_state.user_service.following(claims.user_id()).await?))
}

pub async fn user_following(
    State(app_state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<ResponseJson<Vec<UserSummary>>> {
    Ok(ResponseJson(app_state.user_service.following(user_id).await?))
}
