pub mod user;
pub mod post;
pub mod comment;
pub mod like;
pub mod notification;
pub mod catalog;
pub mod bookshelf;
pub mod blog;
pub mod pagination;

// Re-export models for convenience
pub use user::User;
pub use post::Post;
pub use comment::Comment;
pub use like::{Follow, Like};
pub use notification::{Notification, NotificationVerb, TargetType};
pub use catalog::{Author, Book, Librarian, Library};
pub use bookshelf::{Group, Permission, ShelfBook};
pub use blog::{BlogComment, BlogPost};
pub use pagination::{Page, PageParams, Pagination};

use serde::{Deserialize, Deserializer};

/// Strips surrounding whitespace while decoding, so length checks see the stored value.
pub fn trimmed<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|s| s.trim().to_string())
}

/// `trimmed` for optional fields; pair with `#[serde(default)]`.
pub fn trimmed_opt<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|s| s.map(|s| s.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::post::{CreatePostRequest, UpdatePostRequest};
    use serde_json::json;
    use validator::Validate;

    #[test]
    fn test_blank_strings_fail_validation() {
        let request: CreatePostRequest = serde_json::from_value(json!({"title": "   ", "content": "  "})).unwrap();
        assert_eq!(request.title, "");
        let errors = request.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("title"));
        assert!(errors.field_errors().contains_key("content"));

        let patch: UpdatePostRequest = serde_json::from_value(json!({"content": " \n "})).unwrap();
        assert!(patch.validate().is_err());
        let absent: UpdatePostRequest = serde_json::from_value(json!({})).unwrap();
        assert!(absent.title.is_none());
        assert!(absent.validate().is_ok());
    }
}
