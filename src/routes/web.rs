// Server-rendered blog pages. Sessions ride on the `auth_token` cookie.
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tera::{Context, Tera};
use uuid::Uuid;

use crate::auth::{
    middleware::{MaybeClaims, AUTH_COOKIE},
    Claims,
};
use crate::models::blog::{CommentForm, PostForm};
use crate::models::user::{RegisterRequest, UpdateProfileRequest};
use crate::{AppError, AppState, Result};

const LOGIN_PATH: &str = "/blog/login";

/// Loads the blog templates compiled into the binary.
pub fn load_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("blog/base.html", include_str!("../../templates/blog/base.html")),
        ("blog/post_list.html", include_str!("../../templates/blog/post_list.html")),
        ("blog/post_detail.html", include_str!("../../templates/blog/post_detail.html")),
        ("blog/post_form.html", include_str!("../../templates/blog/post_form.html")),
        ("blog/comment_form.html", include_str!("../../templates/blog/comment_form.html")),
        ("blog/confirm_delete.html", include_str!("../../templates/blog/confirm_delete.html")),
        ("blog/login.html", include_str!("../../templates/blog/login.html")),
        ("blog/register.html", include_str!("../../templates/blog/register.html")),
        ("blog/profile.html", include_str!("../../templates/blog/profile.html")),
    ])
    .map_err(|e| AppError::InternalError(format!("Failed to load templates: {}", e)))?;
    Ok(tera)
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/blog") }))
        .route("/blog", get(post_list))
        .route("/blog/tags/:tag", get(tag_posts))
        .route("/blog/search", get(search_posts))
        .route("/blog/posts/new", get(new_post_form).post(create_post))
        .route("/blog/posts/:id", get(post_detail))
        .route("/blog/posts/:id/edit", get(edit_post_form).post(update_post))
        .route("/blog/posts/:id/delete", get(confirm_delete_post).post(delete_post))
        .route("/blog/posts/:id/comments", post(add_comment))
        .route("/blog/comments/:id/edit", get(edit_comment_form).post(update_comment))
        .route("/blog/comments/:id/delete", get(confirm_delete_comment).post(delete_comment))
        .route("/blog/login", get(login_form).post(login))
        .route("/blog/logout", get(logout).post(logout))
        .route("/blog/register", get(register_form).post(register))
        .route("/blog/profile", get(profile).post(update_profile))
}

/// Failure of an HTML page: a redirect to login or a rendered error page.
#[derive(Debug)]
pub enum WebError {
    LoginRequired,
    App(AppError),
}

impl From<AppError> for WebError {
    fn from(err: AppError) -> Self {
        WebError::App(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            WebError::LoginRequired => Redirect::to(LOGIN_PATH).into_response(),
            WebError::App(err) => {
                let status = err.status_code();
                let message = match &err {
                    AppError::DatabaseError(msg) | AppError::InternalError(msg) => {
                        tracing::error!("❌ BLOG: Page failed: {}", msg);
                        "Something went wrong.".to_string()
                    }
                    other => user_message(other),
                };
                let body = format!(
                    "<!DOCTYPE html><html><head><title>{status}</title></head><body><h1>{status}</h1><p>{message}</p><p><a href=\"/blog\">Back to the blog</a></p></body></html>",
                    status = status,
                    message = tera::escape_html(&message),
                );
                (status, Html(body)).into_response()
            }
        }
    }
}

type PageResult = std::result::Result<Response, WebError>;

fn user_message(err: &AppError) -> String {
    match err {
        AppError::ValidationError(msg)
        | AppError::AuthError(msg)
        | AppError::Forbidden(msg)
        | AppError::NotFound(msg) => msg.clone(),
        AppError::InvalidFields(errors) => errors.to_string(),
        AppError::DatabaseError(_) | AppError::InternalError(_) => "Something went wrong.".to_string(),
    }
}

/// Client-side errors are shown on the form; anything else becomes an error page.
fn form_errors(err: AppError) -> std::result::Result<Vec<String>, WebError> {
    match err {
        AppError::ValidationError(_) | AppError::InvalidFields(_) => Ok(vec![user_message(&err)]),
        other => Err(WebError::App(other)),
    }
}

fn require_login(claims: Option<Claims>) -> std::result::Result<Claims, WebError> {
    claims.ok_or(WebError::LoginRequired)
}

fn base_context(claims: &Option<Claims>) -> Context {
    let mut context = Context::new();
    let current_user = claims
        .as_ref()
        .map(|c| json!({ "id": c.user_id(), "username": c.username }))
        .unwrap_or(Value::Null);
    context.insert("current_user", &current_user);
    context.insert("query", "");
    context
}

fn render(state: &AppState, template: &str, context: &Context, status: StatusCode) -> PageResult {
    let html = state
        .templates
        .render(template, context)
        .map_err(|e| AppError::InternalError(format!("Template {} failed: {}", template, e)))?;
    Ok((status, Html(html)).into_response())
}

fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!("{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}", AUTH_COOKIE, token, max_age_secs)
}

fn login_response(state: &AppState, token: &str) -> Response {
    let cookie = session_cookie(token, state.config.token_ttl_hours * 3600);
    ([(header::SET_COOKIE, cookie)], Redirect::to("/blog")).into_response()
}

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub q: Option<String>,
}

impl ListParams {
    /// Anything that is not a page number falls back to the first page.
    fn page_number(&self) -> Option<u32> {
        self.page.as_deref().and_then(|p| p.trim().parse().ok())
    }
}

async fn render_list(
    state: &AppState,
    claims: &Option<Claims>,
    heading: String,
    page: Option<u32>,
    tag: Option<&str>,
    query: Option<&str>,
) -> PageResult {
    let posts = state.blog_service.list_posts(page, tag, query).await?;
    let tags = state.blog_service.list_tags().await?;
    let mut context = base_context(claims);
    context.insert("heading", &heading);
    context.insert("page", &posts);
    context.insert("tags", &tags);
    context.insert("query", query.unwrap_or(""));
    render(state, "blog/post_list.html", &context, StatusCode::OK)
}

pub async fn post_list(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Query(params): Query<ListParams>,
) -> PageResult {
    render_list(&state, &claims, "Latest posts".to_string(), params.page_number(), None, None).await
}

pub async fn tag_posts(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(tag): Path<String>,
    Query(params): Query<ListParams>,
) -> PageResult {
    let heading = format!("Posts tagged \"{}\"", tag);
    render_list(&state, &claims, heading, params.page_number(), Some(&tag), None).await
}

pub async fn search_posts(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Query(params): Query<ListParams>,
) -> PageResult {
    let query = params.q.as_deref().unwrap_or_default();
    let query = query.trim();
    let heading = if query.is_empty() {
        "Search".to_string()
    } else {
        format!("Search results for \"{}\"", query)
    };
    render_list(&state, &claims, heading, params.page_number(), None, Some(query)).await
}

async fn render_detail(
    state: &AppState,
    claims: &Option<Claims>,
    post_id: Uuid,
    comment_form: &CommentForm,
    comment_errors: &[String],
    status: StatusCode,
) -> PageResult {
    let post = state.blog_service.get_post(post_id).await?;
    let comments = state.blog_service.comments_for(post_id).await?;
    let mut context = base_context(claims);
    context.insert("post", &post);
    context.insert("comments", &comments);
    context.insert("comment_form", comment_form);
    context.insert("comment_errors", comment_errors);
    render(state, "blog/post_detail.html", &context, status)
}

pub async fn post_detail(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
) -> PageResult {
    render_detail(&state, &claims, post_id, &CommentForm::default(), &[], StatusCode::OK).await
}

fn render_post_form(
    state: &AppState,
    claims: &Option<Claims>,
    post_id: Option<Uuid>,
    form: &PostForm,
    errors: &[String],
    status: StatusCode,
) -> PageResult {
    let mut context = base_context(claims);
    context.insert("post_id", &post_id);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "blog/post_form.html", &context, status)
}

pub async fn new_post_form(State(state): State<AppState>, MaybeClaims(claims): MaybeClaims) -> PageResult {
    require_login(claims.clone())?;
    render_post_form(&state, &claims, None, &PostForm::default(), &[], StatusCode::OK)
}

pub async fn create_post(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Form(form): Form<PostForm>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let errors = form.errors();
    if !errors.is_empty() {
        return render_post_form(&state, &claims, None, &form, &errors, StatusCode::BAD_REQUEST);
    }
    let post = state.blog_service.create_post(user.user_id(), &form).await?;
    Ok(Redirect::to(&format!("/blog/posts/{}", post.id)).into_response())
}

pub async fn edit_post_form(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let post = state.blog_service.editable_post(post_id, user.user_id()).await?;
    let form = PostForm { title: post.title, content: post.content, tags: post.tags.join(", ") };
    render_post_form(&state, &claims, Some(post_id), &form, &[], StatusCode::OK)
}

pub async fn update_post(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
    Form(form): Form<PostForm>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    state.blog_service.editable_post(post_id, user.user_id()).await?;
    let errors = form.errors();
    if !errors.is_empty() {
        return render_post_form(&state, &claims, Some(post_id), &form, &errors, StatusCode::BAD_REQUEST);
    }
    state.blog_service.update_post(post_id, user.user_id(), &form).await?;
    Ok(Redirect::to(&format!("/blog/posts/{}", post_id)).into_response())
}

struct DeletePrompt<'a> {
    kind: &'a str,
    summary: String,
    cancel_url: String,
}

fn render_delete_prompt(state: &AppState, claims: &Option<Claims>, prompt: DeletePrompt<'_>) -> PageResult {
    let mut context = base_context(claims);
    context.insert("kind", prompt.kind);
    context.insert("summary", &prompt.summary);
    context.insert("cancel_url", &prompt.cancel_url);
    render(state, "blog/confirm_delete.html", &context, StatusCode::OK)
}

pub async fn confirm_delete_post(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let post = state.blog_service.editable_post(post_id, user.user_id()).await?;
    let prompt = DeletePrompt { kind: "post", summary: post.title, cancel_url: format!("/blog/posts/{}", post_id) };
    render_delete_prompt(&state, &claims, prompt)
}

pub async fn delete_post(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims)?;
    state.blog_service.delete_post(post_id, user.user_id()).await?;
    Ok(Redirect::to("/blog").into_response())
}

pub async fn add_comment(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(post_id): Path<Uuid>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    match state.blog_service.add_comment(post_id, user.user_id(), &form).await {
        Ok(comment) => Ok(Redirect::to(&format!("/blog/posts/{}#comment-{}", post_id, comment.id)).into_response()),
        Err(err) => {
            let errors = form_errors(err)?;
            render_detail(&state, &claims, post_id, &form, &errors, StatusCode::BAD_REQUEST).await
        }
    }
}

fn render_comment_form(
    state: &AppState,
    claims: &Option<Claims>,
    comment_id: Uuid,
    post_id: Uuid,
    form: &CommentForm,
    errors: &[String],
    status: StatusCode,
) -> PageResult {
    let mut context = base_context(claims);
    context.insert("comment_id", &comment_id);
    context.insert("post_id", &post_id);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "blog/comment_form.html", &context, status)
}

pub async fn edit_comment_form(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(comment_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let comment = state.blog_service.editable_comment(comment_id, user.user_id()).await?;
    let form = CommentForm { content: comment.content };
    render_comment_form(&state, &claims, comment_id, comment.post_id, &form, &[], StatusCode::OK)
}

pub async fn update_comment(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(comment_id): Path<Uuid>,
    Form(form): Form<CommentForm>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let comment = state.blog_service.editable_comment(comment_id, user.user_id()).await?;
    match state.blog_service.update_comment(comment_id, user.user_id(), &form).await {
        Ok(updated) => {
            Ok(Redirect::to(&format!("/blog/posts/{}#comment-{}", updated.post_id, updated.id)).into_response())
        }
        Err(err) => {
            let errors = form_errors(err)?;
            render_comment_form(&state, &claims, comment_id, comment.post_id, &form, &errors, StatusCode::BAD_REQUEST)
        }
    }
}

pub async fn confirm_delete_comment(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(comment_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let comment = state.blog_service.editable_comment(comment_id, user.user_id()).await?;
    let prompt = DeletePrompt {
        kind: "comment",
        summary: comment.content,
        cancel_url: format!("/blog/posts/{}#comment-{}", comment.post_id, comment_id),
    };
    render_delete_prompt(&state, &claims, prompt)
}

pub async fn delete_comment(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Path(comment_id): Path<Uuid>,
) -> PageResult {
    let user = require_login(claims)?;
    let post_id = state.blog_service.delete_comment(comment_id, user.user_id()).await?;
    Ok(Redirect::to(&format!("/blog/posts/{}", post_id)).into_response())
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn render_login(state: &AppState, username: &str, errors: &[String], status: StatusCode) -> PageResult {
    let mut context = base_context(&None);
    context.insert("username", username);
    context.insert("errors", errors);
    render(state, "blog/login.html", &context, status)
}

pub async fn login_form(State(state): State<AppState>) -> PageResult {
    render_login(&state, "", &[], StatusCode::OK)
}

pub async fn login(State(state): State<AppState>, Form(form): Form<LoginForm>) -> PageResult {
    match state
        .user_service
        .authenticate(form.username.trim(), &form.password, &state.auth_service)
        .await
    {
        Ok(user) => {
            let token = state.auth_service.generate_token(user.id, &user.username)?;
            tracing::info!("🔓 BLOG: {} logged in", user.username);
            Ok(login_response(&state, &token))
        }
        Err(err) => {
            let errors = form_errors(err)?;
            render_login(&state, &form.username, &errors, StatusCode::BAD_REQUEST)
        }
    }
}

pub async fn logout() -> Response {
    ([(header::SET_COOKIE, session_cookie("", 0))], Redirect::to("/blog")).into_response()
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default, skip_serializing)]
    pub password_confirm: String,
}

fn render_register(state: &AppState, form: &RegisterForm, errors: &[String], status: StatusCode) -> PageResult {
    let mut context = base_context(&None);
    context.insert("form", form);
    context.insert("errors", errors);
    render(state, "blog/register.html", &context, status)
}

pub async fn register_form(State(state): State<AppState>) -> PageResult {
    render_register(&state, &RegisterForm::default(), &[], StatusCode::OK)
}

pub async fn register(State(state): State<AppState>, Form(form): Form<RegisterForm>) -> PageResult {
    let request = RegisterRequest {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        password: form.password.clone(),
        password_confirm: form.password_confirm.clone(),
        first_name: None,
        last_name: None,
        bio: None,
        profile_picture: None,
    };
    match state.user_service.register(request, &state.auth_service).await {
        Ok((_, token)) => Ok(login_response(&state, &token)),
        Err(err) => {
            let errors = form_errors(err)?;
            render_register(&state, &form, &errors, StatusCode::BAD_REQUEST)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
}

async fn render_profile(
    state: &AppState,
    claims: &Option<Claims>,
    user_id: Uuid,
    saved: bool,
    errors: &[String],
    status: StatusCode,
) -> PageResult {
    let profile = state.user_service.get_profile(user_id).await?;
    let mut context = base_context(claims);
    context.insert("profile", &profile);
    context.insert("saved", &saved);
    context.insert("errors", errors);
    render(state, "blog/profile.html", &context, status)
}

pub async fn profile(State(state): State<AppState>, MaybeClaims(claims): MaybeClaims) -> PageResult {
    let user = require_login(claims.clone())?;
    render_profile(&state, &claims, user.user_id(), false, &[], StatusCode::OK).await
}

pub async fn update_profile(
    State(state): State<AppState>,
    MaybeClaims(claims): MaybeClaims,
    Form(form): Form<ProfileForm>,
) -> PageResult {
    let user = require_login(claims.clone())?;
    let request = UpdateProfileRequest {
        email: Some(form.email.trim().to_string()).filter(|e| !e.is_empty()),
        first_name: Some(form.first_name.trim().to_string()),
        last_name: Some(form.last_name.trim().to_string()),
        bio: Some(form.bio.trim().to_string()),
        profile_picture: None,
    };
    match state.user_service.update_profile(user.user_id(), request).await {
        Ok(_) => render_profile(&state, &claims, user.user_id(), true, &[], StatusCode::OK).await,
        Err(err) => {
            let errors = form_errors(err)?;
            render_profile(&state, &claims, user.user_id(), false, &errors, StatusCode::BAD_REQUEST).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates_parse() {
        let tera = load_templates().unwrap();
        let names: Vec<&str> = tera.get_template_names().collect();
        assert!(names.contains(&"blog/post_list.html"));
        assert!(names.contains(&"blog/confirm_delete.html"));
    }

    #[test]
    fn test_session_cookie_format() {
        assert_eq!(session_cookie("abc", 60), "auth_token=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=60");
        assert!(session_cookie("", 0).ends_with("Max-Age=0"));
    }

    #[test]
    fn test_form_errors_only_for_client_errors() {
        let shown = form_errors(AppError::ValidationError("Title is required.".to_string())).unwrap();
        assert_eq!(shown, vec!["Title is required.".to_string()]);
        assert!(form_errors(AppError::Forbidden("no".to_string())).is_err());
    }
}
