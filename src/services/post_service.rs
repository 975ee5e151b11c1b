use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::repository::{CommentRepository, FollowRepository, LikeRepository, PostRepository, UserRepository};
use crate::models::comment::{CommentQuery, CommentResponse};
use crate::models::post::{CreatePostRequest, PostListItem, PostOrdering, PostQuery, PostResponse, UpdatePostRequest};
use crate::models::user::UserSummary;
use crate::models::{NotificationVerb, Pagination, Post, TargetType};
use crate::services::NotificationService;
use crate::{AppError, Result};

pub struct PostService {
    post_repo: Arc<dyn PostRepository>,
    comment_repo: Arc<dyn CommentRepository>,
    like_repo: Arc<dyn LikeRepository>,
    follow_repo: Arc<dyn FollowRepository>,
    user_repo: Arc<dyn UserRepository>,
    notifications: Arc<NotificationService>,
}

impl PostService {
    pub fn new(
        post_repo: Arc<dyn PostRepository>,
        comment_repo: Arc<dyn CommentRepository>,
        like_repo: Arc<dyn LikeRepository>,
        follow_repo: Arc<dyn FollowRepository>,
        user_repo: Arc<dyn UserRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self { post_repo, comment_repo, like_repo, follow_repo, user_repo, notifications }
    }

    async fn require_post(&self, post_id: Uuid) -> Result<Post> {
        self.post_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn author_summaries(&self, author_ids: impl Iterator<Item = Uuid>) -> Result<HashMap<Uuid, UserSummary>> {
        let mut ids: Vec<Uuid> = author_ids.collect();
        ids.sort();
        ids.dedup();
        Ok(self
            .user_repo
            .get_users_by_ids(&ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect())
    }

    fn summary_for(authors: &HashMap<Uuid, UserSummary>, id: Uuid) -> UserSummary {
        authors
            .get(&id)
            .cloned()
            .unwrap_or_else(|| UserSummary { id, username: String::new() })
    }

    async fn to_list_items(&self, posts: Vec<Post>) -> Result<Vec<PostListItem>> {
        let authors = self.author_summaries(posts.iter().map(|p| p.author_id)).await?;
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let comments_count = self.comment_repo.count_comments_for_post(post.id).await?;
            let likes_count = self.like_repo.count_likes(post.id).await?;
            items.push(PostListItem {
                author: Self::summary_for(&authors, post.author_id),
                id: post.id,
                title: post.title,
                content: post.content,
                created_at: post.created_at,
                updated_at: post.updated_at,
                comments_count,
                likes_count,
            });
        }
        Ok(items)
    }

    /// Filtered page of posts plus the total match count.
    pub async fn list_posts(&self, query: &PostQuery, pagination: Pagination) -> Result<(Vec<PostListItem>, u64)> {
        let query = PostQuery { limit: pagination.limit(), offset: pagination.offset(), ..query.clone() };
        let (posts, total) = self.post_repo.list_posts(&query).await?;
        pagination.check_in_range(total)?;
        tracing::debug!("📋 POSTS: Listing {} of {} posts", posts.len(), total);
        Ok((self.to_list_items(posts).await?, total))
    }

    /// Posts by the users `user_id` follows, newest first.
    pub async fn feed(&self, user_id: Uuid, pagination: Pagination) -> Result<(Vec<PostListItem>, u64)> {
        let following = self.follow_repo.get_following_ids(user_id).await?;
        if following.is_empty() {
            pagination.check_in_range(0)?;
            return Ok((Vec::new(), 0));
        }
        let query = PostQuery { author_ids: Some(following), ordering: PostOrdering::CreatedDesc, ..Default::default() };
        self.list_posts(&query, pagination).await
    }

    pub async fn get_post(&self, post_id: Uuid, viewer: Option<Uuid>) -> Result<PostResponse> {
        let post = self.require_post(post_id).await?;
        self.to_response(post, viewer).await
    }

    async fn to_response(&self, post: Post, viewer: Option<Uuid>) -> Result<PostResponse> {
        let comment_query = CommentQuery {
            post_id: Some(post.id),
            ordering: PostOrdering::CreatedAsc,
            limit: u32::MAX,
            ..Default::default()
        };
        let (comments, comments_count) = self.comment_repo.list_comments(&comment_query).await?;
        let authors = self
            .author_summaries(std::iter::once(post.author_id).chain(comments.iter().map(|c| c.author_id)))
            .await?;
        let comments = comments
            .into_iter()
            .map(|c| {
                let author = Self::summary_for(&authors, c.author_id);
                CommentResponse::new(c, author)
            })
            .collect();
        let likes_count = self.like_repo.count_likes(post.id).await?;
        let is_liked_by_user = match viewer {
            Some(user_id) => self.like_repo.has_liked(user_id, post.id).await?,
            None => false,
        };

        Ok(PostResponse {
            author: Self::summary_for(&authors, post.author_id),
            author_id: post.author_id,
            id: post.id,
            title: post.title,
            content: post.content,
            created_at: post.created_at,
            updated_at: post.updated_at,
            comments,
            comments_count,
            likes_count,
            is_liked_by_user,
        })
    }

    pub async fn create_post(&self, request: CreatePostRequest, author_id: Uuid) -> Result<PostResponse> {
        request.validate()?;
        let now = Utc::now();
        let post = Post {
            id: Uuid::new_v4(),
            title: request.title,
            content: request.content,
            author_id,
            created_at: now,
            updated_at: now,
        };
        let created = self.post_repo.create_post(&post).await?;
        tracing::info!("📝 POSTS: Created post {} by {}", created.id, author_id);
        self.to_response(created, Some(author_id)).await
    }

    pub async fn update_post(&self, post_id: Uuid, request: UpdatePostRequest, user_id: Uuid) -> Result<PostResponse> {
        request.validate()?;
        let mut post = self.require_post(post_id).await?;
        if post.author_id != user_id {
            tracing::warn!("🚫 POSTS: {} tried to edit post {} owned by {}", user_id, post_id, post.author_id);
            return Err(AppError::Forbidden("You do not have permission to perform this action.".to_string()));
        }
        if let Some(title) = request.title {
            post.title = title;
        }
        if let Some(content) = request.content {
            post.content = content;
        }
        post.updated_at = Utc::now();
        let updated = self.post_repo.update_post(&post).await?;
        tracing::info!("✏️ POSTS: Updated post {}", post_id);
        self.to_response(updated, Some(user_id)).await
    }

    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        let post = self.require_post(post_id).await?;
        if post.author_id != user_id {
            tracing::warn!("🚫 POSTS: {} tried to delete post {} owned by {}", user_id, post_id, post.author_id);
            return Err(AppError::Forbidden("You do not have permission to perform this action.".to_string()));
        }
        self.post_repo.delete_post(post_id).await?;
        tracing::info!("🗑️ POSTS: Deleted post {}", post_id);
        Ok(())
    }

    /// Returns the new like count.
    pub async fn like_post(&self, post_id: Uuid, user_id: Uuid) -> Result<u64> {
        let post = self.require_post(post_id).await?;
        if !self.like_repo.add_like(user_id, post_id).await? {
            return Err(AppError::ValidationError("You have already liked this post.".to_string()));
        }
        self.notifications
            .notify(post.author_id, user_id, NotificationVerb::Like, TargetType::Post, post.id)
            .await?;
        tracing::info!("❤️ POSTS: {} liked post {}", user_id, post_id);
        self.like_repo.count_likes(post_id).await
    }

    /// Returns the new like count.
    pub async fn unlike_post(&self, post_id: Uuid, user_id: Uuid) -> Result<u64> {
        self.require_post(post_id).await?;
        if !self.like_repo.remove_like(user_id, post_id).await? {
            return Err(AppError::ValidationError("You have not liked this post.".to_string()));
        }
        tracing::info!("💔 POSTS: {} unliked post {}", user_id, post_id);
        self.like_repo.count_likes(post_id).await
    }
}
