use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::repository::{CommentRepository, PostRepository, UserRepository};
use crate::models::comment::{CommentQuery, CommentResponse, CreateCommentRequest, UpdateCommentRequest};
use crate::models::user::UserSummary;
use crate::models::{Comment, NotificationVerb, Pagination, TargetType};
use crate::services::NotificationService;
use crate::{AppError, Result};

pub struct CommentService {
    comment_repo: Arc<dyn CommentRepository>,
    post_repo: Arc<dyn PostRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        comment_repo: Arc<dyn CommentRepository>,
        post_repo: Arc<dyn PostRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self { comment_repo, post_repo, user_repo, notifications }
    }

    async fn require_comment(&self, comment_id: Uuid) -> Result<Comment> {
        self.comment_repo
            .get_comment_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    async fn with_authors(&self, comments: Vec<Comment>) -> Result<Vec<CommentResponse>> {
        let mut ids: Vec<Uuid> = comments.iter().map(|c| c.author_id).collect();
        ids.sort();
        ids.dedup();
        let authors = self.user_repo.get_users_by_ids(&ids).await?;
        Ok(comments
            .into_iter()
            .map(|comment| {
                let author = authors
                    .iter()
                    .find(|u| u.id == comment.author_id)
                    .map(UserSummary::from)
                    .unwrap_or_else(|| UserSummary { id: comment.author_id, username: String::new() });
                CommentResponse::new(comment, author)
            })
            .collect())
    }

    pub async fn list_comments(&self, query: &CommentQuery, pagination: Pagination) -> Result<(Vec<CommentResponse>, u64)> {
        let query = CommentQuery { limit: pagination.limit(), offset: pagination.offset(), ..query.clone() };
        let (comments, total) = self.comment_repo.list_comments(&query).await?;
        pagination.check_in_range(total)?;
        Ok((self.with_authors(comments).await?, total))
    }

    /// Comments on one post, oldest first. 404 when the post does not exist.
    pub async fn comments_for_post(&self, post_id: Uuid, pagination: Pagination) -> Result<(Vec<CommentResponse>, u64)> {
        if self.post_repo.get_post_by_id(post_id).await?.is_none() {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        let query = CommentQuery { post_id: Some(post_id), ..Default::default() };
        self.list_comments(&query, pagination).await
    }

    pub async fn get_comment(&self, comment_id: Uuid) -> Result<CommentResponse> {
        let comment = self.require_comment(comment_id).await?;
        let mut responses = self.with_authors(vec![comment]).await?;
        responses.pop().ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    pub async fn create_comment(&self, request: CreateCommentRequest, author_id: Uuid) -> Result<CommentResponse> {
        let post_id = request
            .post
            .ok_or_else(|| AppError::ValidationError("post field is required".to_string()))?;
        request.validate()?;
        let post = self
            .post_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::ValidationError(format!("Invalid post \"{}\" - object does not exist.", post_id)))?;

        let now = Utc::now();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id,
            author_id,
            content: request.content,
            created_at: now,
            updated_at: now,
        };
        let created = self.comment_repo.create_comment(&comment).await?;
        self.notifications
            .notify(post.author_id, author_id, NotificationVerb::Comment, TargetType::Comment, created.id)
            .await?;
        tracing::info!("💬 COMMENTS: {} commented on post {}", author_id, post_id);
        self.get_comment(created.id).await
    }

    pub async fn update_comment(&self, comment_id: Uuid, request: UpdateCommentRequest, user_id: Uuid) -> Result<CommentResponse> {
        request.validate()?;
        let mut comment = self.require_comment(comment_id).await?;
        if comment.author_id != user_id {
            tracing::warn!("🚫 COMMENTS: {} tried to edit comment {}", user_id, comment_id);
            return Err(AppError::Forbidden("You do not have permission to perform this action.".to_string()));
        }
        comment.content = request.content;
        comment.updated_at = Utc::now();
        self.comment_repo.update_comment(&comment).await?;
        self.get_comment(comment_id).await
    }

    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<()> {
        let comment = self.require_comment(comment_id).await?;
        if comment.author_id != user_id {
            tracing::warn!("🚫 COMMENTS: {} tried to delete comment {}", user_id, comment_id);
            return Err(AppError::Forbidden("You do not have permission to perform this action.".to_string()));
        }
        self.comment_repo.delete_comment(comment_id).await?;
        tracing::info!("🗑️ COMMENTS: Deleted comment {}", comment_id);
        Ok(())
    }
}
