// Repository trait abstractions for database operations
use async_trait::async_trait;
use uuid::Uuid;

use crate::models::catalog::{AuthorFilter, BookFilter};
use crate::models::comment::CommentQuery;
use crate::models::post::PostQuery;
use crate::models::{
    Author, BlogComment, BlogPost, Book, Comment, Group, Librarian, Library, Notification, Post, ShelfBook, User,
};
use crate::Result;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &User) -> Result<User>;
    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>>;
    async fn update_user(&self, user: &User) -> Result<User>;
}

#[async_trait]
pub trait FollowRepository: Send + Sync {
    /// Returns false when the edge already existed.
    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool>;
    /// Returns false when there was no edge to remove.
    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool>;
    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool>;
    async fn get_follower_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
    async fn get_following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create_post(&self, post: &Post) -> Result<Post>;
    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>>;
    /// Filtered page plus the total number of matching rows.
    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)>;
    async fn update_post(&self, post: &Post) -> Result<Post>;
    /// Cascades to the post's comments and likes.
    async fn delete_post(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment>;
    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>>;
    async fn list_comments(&self, query: &CommentQuery) -> Result<(Vec<Comment>, u64)>;
    async fn count_comments_for_post(&self, post_id: Uuid) -> Result<u64>;
    async fn update_comment(&self, comment: &Comment) -> Result<Comment>;
    async fn delete_comment(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait LikeRepository: Send + Sync {
    /// Returns false when the user had already liked the post.
    async fn add_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
    async fn remove_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool>;
    async fn count_likes(&self, post_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification>;
    /// Newest first.
    async fn list_for_recipient(&self, recipient_id: Uuid, limit: u32, offset: u32) -> Result<(Vec<Notification>, u64)>;
    async fn count_unread(&self, recipient_id: Uuid) -> Result<u64>;
    /// Returns false when no notification with that id belongs to the recipient.
    async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool>;
    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn create_author(&self, author: &Author) -> Result<Author>;
    async fn get_author_by_id(&self, id: Uuid) -> Result<Option<Author>>;
    async fn get_author_by_name(&self, name: &str) -> Result<Option<Author>>;
    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<Author>>;
    async fn create_book(&self, book: &Book) -> Result<Book>;
    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<Book>>;
    async fn get_books_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Book>>;
    async fn find_duplicate_book(&self, title: &str, author_id: Uuid, publication_year: i32) -> Result<Option<Book>>;
    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>>;
    /// Ordered by title.
    async fn list_books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>>;
    async fn update_book(&self, book: &Book) -> Result<Book>;
    async fn delete_book(&self, id: Uuid) -> Result<()>;
    async fn create_library(&self, library: &Library) -> Result<Library>;
    async fn get_library_by_id(&self, id: Uuid) -> Result<Option<Library>>;
    async fn get_library_by_name(&self, name: &str) -> Result<Option<Library>>;
    async fn list_libraries(&self) -> Result<Vec<Library>>;
    async fn add_book_to_library(&self, library_id: Uuid, book_id: Uuid) -> Result<()>;
    /// Replaces any librarian already assigned to the library.
    async fn set_librarian(&self, librarian: &Librarian) -> Result<Librarian>;
    async fn get_librarian_for_library(&self, library_id: Uuid) -> Result<Option<Librarian>>;
}

#[async_trait]
pub trait ShelfRepository: Send + Sync {
    async fn upsert_group(&self, group: &Group) -> Result<Group>;
    async fn get_group(&self, name: &str) -> Result<Option<Group>>;
    async fn list_groups(&self) -> Result<Vec<Group>>;
    async fn add_user_to_group(&self, user_id: Uuid, group: &str) -> Result<()>;
    async fn remove_user_from_group(&self, user_id: Uuid, group: &str) -> Result<()>;
    async fn create_book(&self, book: &ShelfBook) -> Result<ShelfBook>;
    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<ShelfBook>>;
    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<ShelfBook>>;
    /// Newest first; `search` matches title or author.
    async fn list_books(&self, search: Option<&str>) -> Result<Vec<ShelfBook>>;
    async fn update_book(&self, book: &ShelfBook) -> Result<ShelfBook>;
    async fn delete_book(&self, id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait BlogRepository: Send + Sync {
    async fn create_post(&self, post: &BlogPost) -> Result<BlogPost>;
    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<BlogPost>>;
    /// Newest first. `tag` is an exact match; `search` covers title, content and tags.
    async fn list_posts(&self, tag: Option<&str>, search: Option<&str>, limit: u32, offset: u32) -> Result<(Vec<BlogPost>, u64)>;
    async fn list_tags(&self) -> Result<Vec<String>>;
    async fn update_post(&self, post: &BlogPost) -> Result<BlogPost>;
    async fn delete_post(&self, id: Uuid) -> Result<()>;
    async fn create_comment(&self, comment: &BlogComment) -> Result<BlogComment>;
    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<BlogComment>>;
    /// Oldest first.
    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<BlogComment>>;
    async fn update_comment(&self, comment: &BlogComment) -> Result<BlogComment>;
    async fn delete_comment(&self, id: Uuid) -> Result<()>;
}

/// Case-insensitive substring match shared by the in-process filters.
pub fn icontains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
