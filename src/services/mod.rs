pub mod user_service;
pub mod post_service;
pub mod comment_service;
pub mod notification_service;
pub mod catalog_service;
pub mod bookshelf_service;
pub mod blog_service;

// Re-export services for convenience
pub use user_service::UserService;
pub use post_service::PostService;
pub use comment_service::CommentService;
pub use notification_service::NotificationService;
pub use catalog_service::CatalogService;
pub use bookshelf_service::BookshelfService;
pub use blog_service::BlogService;
