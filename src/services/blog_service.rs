use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::db::repository::{BlogRepository, UserRepository};
use crate::models::blog::{CommentForm, PostForm};
use crate::models::{BlogComment, BlogPost};
use crate::{AppError, Result};

pub const POSTS_PER_PAGE: u32 = 5;

#[derive(Debug, Clone, Serialize)]
pub struct BlogPostView {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub author: String,
    pub tags: Vec<String>,
    pub published_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogCommentView {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub edited: bool,
}

/// One page of the post list. Out-of-range page numbers are clamped.
#[derive(Debug, Serialize)]
pub struct BlogPage {
    pub posts: Vec<BlogPostView>,
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub has_previous: bool,
    pub has_next: bool,
}

pub struct BlogService {
    blog_repo: Arc<dyn BlogRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl BlogService {
    pub fn new(blog_repo: Arc<dyn BlogRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { blog_repo, user_repo }
    }

    async fn username(&self, user_id: Uuid) -> Result<String> {
        Ok(self
            .user_repo
            .get_user_by_id(user_id)
            .await?
            .map(|u| u.username)
            .unwrap_or_else(|| "unknown".to_string()))
    }

    async fn post_view(&self, post: BlogPost) -> Result<BlogPostView> {
        Ok(BlogPostView {
            author: self.username(post.author_id).await?,
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            tags: post.tags,
            published_date: post.published_date,
        })
    }

    async fn comment_view(&self, comment: BlogComment) -> Result<BlogCommentView> {
        Ok(BlogCommentView {
            author: self.username(comment.author_id).await?,
            edited: comment.updated_at > comment.created_at,
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.author_id,
            content: comment.content,
            created_at: comment.created_at,
        })
    }

    async fn require_post(&self, post_id: Uuid) -> Result<BlogPost> {
        self.blog_repo
            .get_post_by_id(post_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn require_comment(&self, comment_id: Uuid) -> Result<BlogComment> {
        self.blog_repo
            .get_comment_by_id(comment_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    pub async fn list_posts(&self, page: Option<u32>, tag: Option<&str>, search: Option<&str>) -> Result<BlogPage> {
        let tag = tag.map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty());
        let search = search.map(str::trim).filter(|q| !q.is_empty());

        let (_, total) = self.blog_repo.list_posts(tag.as_deref(), search, 0, 0).await?;
        let num_pages = if total == 0 { 1 } else { total.div_ceil(POSTS_PER_PAGE as u64) as u32 };
        let number = page.unwrap_or(1).clamp(1, num_pages);

        let (posts, _) = self
            .blog_repo
            .list_posts(tag.as_deref(), search, POSTS_PER_PAGE, (number - 1) * POSTS_PER_PAGE)
            .await?;
        let mut views = Vec::with_capacity(posts.len());
        for post in posts {
            views.push(self.post_view(post).await?);
        }

        Ok(BlogPage {
            posts: views,
            number,
            num_pages,
            total,
            has_previous: number > 1,
            has_next: number < num_pages,
        })
    }

    pub async fn list_tags(&self) -> Result<Vec<String>> {
        self.blog_repo.list_tags().await
    }

    pub async fn get_post(&self, post_id: Uuid) -> Result<BlogPostView> {
        let post = self.require_post(post_id).await?;
        self.post_view(post).await
    }

    pub async fn comments_for(&self, post_id: Uuid) -> Result<Vec<BlogCommentView>> {
        let comments = self.blog_repo.list_comments(post_id).await?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            views.push(self.comment_view(comment).await?);
        }
        Ok(views)
    }

    fn check_form(form: &PostForm) -> Result<()> {
        let errors = form.errors();
        if !errors.is_empty() {
            return Err(AppError::ValidationError(errors.join(" ")));
        }
        Ok(())
    }

    fn ensure_owner(owner_id: Uuid, user_id: Uuid, what: &str) -> Result<()> {
        if owner_id != user_id {
            tracing::warn!("🚫 BLOG: {} tried to modify a {} owned by {}", user_id, what, owner_id);
            return Err(AppError::Forbidden(format!("You can only modify your own {}s.", what)));
        }
        Ok(())
    }

    pub async fn create_post(&self, author_id: Uuid, form: &PostForm) -> Result<BlogPost> {
        Self::check_form(form)?;
        let post = BlogPost {
            id: Uuid::new_v4(),
            title: form.title.trim().to_string(),
            content: form.content.trim().to_string(),
            author_id,
            tags: form.tag_list(),
            published_date: Utc::now(),
        };
        let created = self.blog_repo.create_post(&post).await?;
        tracing::info!("📰 BLOG: {} published '{}'", author_id, created.title);
        Ok(created)
    }

    /// Loads a post for editing; only its author may.
    pub async fn editable_post(&self, post_id: Uuid, user_id: Uuid) -> Result<BlogPost> {
        let post = self.require_post(post_id).await?;
        Self::ensure_owner(post.author_id, user_id, "post")?;
        Ok(post)
    }

    pub async fn update_post(&self, post_id: Uuid, user_id: Uuid, form: &PostForm) -> Result<BlogPost> {
        let mut post = self.editable_post(post_id, user_id).await?;
        Self::check_form(form)?;
        post.title = form.title.trim().to_string();
        post.content = form.content.trim().to_string();
        post.tags = form.tag_list();
        let updated = self.blog_repo.update_post(&post).await?;
        tracing::info!("📰 BLOG: Updated post {}", post_id);
        Ok(updated)
    }

    pub async fn delete_post(&self, post_id: Uuid, user_id: Uuid) -> Result<()> {
        self.editable_post(post_id, user_id).await?;
        self.blog_repo.delete_post(post_id).await?;
        tracing::info!("📰 BLOG: Deleted post {}", post_id);
        Ok(())
    }

    pub async fn add_comment(&self, post_id: Uuid, author_id: Uuid, form: &CommentForm) -> Result<BlogComment> {
        let content = form.validate()?;
        self.require_post(post_id).await?;
        let now = Utc::now();
        let comment = BlogComment { id: Uuid::new_v4(), post_id, author_id, content, created_at: now, updated_at: now };
        let created = self.blog_repo.create_comment(&comment).await?;
        tracing::info!("💬 BLOG: {} commented on {}", author_id, post_id);
        Ok(created)
    }

    pub async fn editable_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<BlogComment> {
        let comment = self.require_comment(comment_id).await?;
        Self::ensure_owner(comment.author_id, user_id, "comment")?;
        Ok(comment)
    }

    pub async fn update_comment(&self, comment_id: Uuid, user_id: Uuid, form: &CommentForm) -> Result<BlogComment> {
        let mut comment = self.editable_comment(comment_id, user_id).await?;
        comment.content = form.validate()?;
        comment.updated_at = Utc::now();
        self.blog_repo.update_comment(&comment).await
    }

    /// Returns the id of the post the comment belonged to.
    pub async fn delete_comment(&self, comment_id: Uuid, user_id: Uuid) -> Result<Uuid> {
        let comment = self.editable_comment(comment_id, user_id).await?;
        self.blog_repo.delete_comment(comment_id).await?;
        Ok(comment.post_id)
    }
}
