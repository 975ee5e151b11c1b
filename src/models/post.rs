use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::comment::CommentResponse;
use crate::models::user::UserSummary;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub title: String,
    #[validate(length(min = 1))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub content: String,
}

/// Partial update (PATCH); PUT goes through `CreatePostRequest`.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePostRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub content: Option<String>,
}

impl From<CreatePostRequest> for UpdatePostRequest {
    fn from(request: CreatePostRequest) -> Self {
        Self { title: Some(request.title), content: Some(request.content) }
    }
}

/// List filters: `author`, `search`, `ordering`.
#[derive(Debug, Clone, Default)]
pub struct PostQuery {
    pub author_id: Option<Uuid>,
    pub author_ids: Option<Vec<Uuid>>,
    pub search: Option<String>,
    pub ordering: PostOrdering,
    pub limit: u32,
    pub offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostOrdering {
    CreatedAsc,
    CreatedDesc,
    UpdatedAsc,
    UpdatedDesc,
}

impl Default for PostOrdering {
    fn default() -> Self {
        PostOrdering::CreatedDesc
    }
}

impl PostOrdering {
    /// Accepts `created_at`, `updated_at`, optionally prefixed with `-`.
    pub fn parse(raw: Option<&str>, default: PostOrdering) -> Self {
        match raw.map(str::trim) {
            Some("created_at") => PostOrdering::CreatedAsc,
            Some("-created_at") => PostOrdering::CreatedDesc,
            Some("updated_at") => PostOrdering::UpdatedAsc,
            Some("-updated_at") => PostOrdering::UpdatedDesc,
            _ => default,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            PostOrdering::CreatedAsc => "created_at ASC",
            PostOrdering::CreatedDesc => "created_at DESC",
            PostOrdering::UpdatedAsc => "updated_at ASC",
            PostOrdering::UpdatedDesc => "updated_at DESC",
        }
    }
}

/// Row shape for list endpoints (no nested comments).
#[derive(Debug, Serialize)]
pub struct PostListItem {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: UserSummary,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments_count: u64,
    pub likes_count: u64,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author: UserSummary,
    pub author_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comments: Vec<CommentResponse>,
    pub comments_count: u64,
    pub likes_count: u64,
    pub is_liked_by_user: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_parse() {
        assert_eq!(PostOrdering::parse(Some("updated_at"), PostOrdering::CreatedDesc), PostOrdering::UpdatedAsc);
        assert_eq!(PostOrdering::parse(Some("-updated_at"), PostOrdering::CreatedDesc), PostOrdering::UpdatedDesc);
        assert_eq!(PostOrdering::parse(Some("title"), PostOrdering::CreatedDesc), PostOrdering::CreatedDesc);
        assert_eq!(PostOrdering::parse(None, PostOrdering::CreatedAsc), PostOrdering::CreatedAsc);
    }
}
