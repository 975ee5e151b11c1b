use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::post::PostOrdering;
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCommentRequest {
    /// Required; checked by the service so the error names the field.
    pub post: Option<Uuid>,
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub content: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommentQuery {
    pub post_id: Option<Uuid>,
    pub author_id: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentResponse {
    pub id: Uuid,
    pub post: Uuid,
    pub content: String,
    pub author: UserSummary,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: Comment, author: UserSummary) -> Self {
        Self {
            id: comment.id,
            post: comment.post_id,
            content: comment.content,
            author_id: author.id,
            author,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}
