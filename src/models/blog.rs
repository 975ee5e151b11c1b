use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub tags: Vec<String>,
    pub published_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BlogComment {
    pub id: Uuid,
    pub post_id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submitted post form. `tags` is a comma separated list.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PostForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CommentForm {
    #[serde(default)]
    pub content: String,
}

pub const MIN_TITLE_LENGTH: usize = 5;
pub const MAX_TITLE_LENGTH: usize = 200;
pub const MIN_CONTENT_LENGTH: usize = 20;
pub const MAX_COMMENT_LENGTH: usize = 2000;

impl PostForm {
    /// Returns every field error so the form can show them all at once.
    pub fn errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let title = self.title.trim();
        if title.is_empty() {
            errors.push("Title is required.".to_string());
        } else if title.chars().count() < MIN_TITLE_LENGTH {
            errors.push(format!("Title must be at least {} characters long.", MIN_TITLE_LENGTH));
        } else if title.chars().count() > MAX_TITLE_LENGTH {
            errors.push(format!("Title must be at most {} characters long.", MAX_TITLE_LENGTH));
        }
        let content = self.content.trim();
        if content.is_empty() {
            errors.push("Content is required.".to_string());
        } else if content.chars().count() < MIN_CONTENT_LENGTH {
            errors.push(format!("Content must be at least {} characters long.", MIN_CONTENT_LENGTH));
        }
        errors
    }

    pub fn tag_list(&self) -> Vec<String> {
        parse_tags(&self.tags)
    }
}

impl CommentForm {
    pub fn validate(&self) -> Result<String> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::ValidationError("Comment cannot be empty.".to_string()));
        }
        if content.chars().count() > MAX_COMMENT_LENGTH {
            return Err(AppError::ValidationError(format!(
                "Comment must be at most {} characters long.",
                MAX_COMMENT_LENGTH
            )));
        }
        Ok(content.to_string())
    }
}

/// Lowercased, trimmed, de-duplicated tags in first-seen order.
pub fn parse_tags(raw: &str) -> Vec<String> {
    let mut tags: Vec<String> = Vec::new();
    for tag in raw.split(',').map(|t| t.trim().to_lowercase()).filter(|t| !t.is_empty()) {
        if !tags.contains(&tag) {
            tags.push(tag);
        }
    }
    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags(" Rust, web ,rust,, Axum "), vec!["rust", "web", "axum"]);
        assert!(parse_tags("").is_empty());
    }

    #[test]
    fn test_post_form_errors() {
        let form = PostForm { title: "Hey".into(), content: "too short".into(), tags: String::new() };
        let errors = form.errors();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].contains("Title must be at least 5"));

        let ok = PostForm {
            title: "A proper title".into(),
            content: "Content long enough to pass validation.".into(),
            tags: "rust".into(),
        };
        assert!(ok.errors().is_empty());
    }

    #[test]
    fn test_comment_form_trims() {
        let form = CommentForm { content: "  nice post  ".into() };
        assert_eq!(form.validate().unwrap(), "nice post");
        assert!(CommentForm { content: "   ".into() }.validate().is_err());
    }
}
