pub mod memory;
pub mod postgres;
pub mod repository;
pub mod retry;

// Database connection and state management
use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::memory::MemoryStore;
use crate::db::postgres::PostgresDatabase;
use crate::db::repository::*;
use crate::Result;

#[derive(Clone)]
pub struct DatabaseClient {
    pub user_repo: Arc<dyn UserRepository>,
    pub follow_repo: Arc<dyn FollowRepository>,
    pub post_repo: Arc<dyn PostRepository>,
    pub comment_repo: Arc<dyn CommentRepository>,
    pub like_repo: Arc<dyn LikeRepository>,
    pub notification_repo: Arc<dyn NotificationRepository>,
    pub catalog_repo: Arc<dyn CatalogRepository>,
    pub shelf_repo: Arc<dyn ShelfRepository>,
    pub blog_repo: Arc<dyn BlogRepository>,
    postgres: Option<Arc<PostgresDatabase>>,
}

impl DatabaseClient {
    /// Connects to Postgres and applies migrations when `DATABASE_URL` is set,
    /// otherwise falls back to the in-process store.
    pub async fn new(config: &AppConfig) -> Result<Self> {
        match &config.database_url {
            Some(url) => {
                let database = PostgresDatabase::new(url).await?;
                database.run_migrations().await?;
                Ok(Self::postgres(database))
            }
            None => {
                tracing::warn!("⚠️ DATABASE: DATABASE_URL not set, using in-memory store (data is lost on restart)");
                Ok(Self::in_memory())
            }
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            user_repo: store.clone(),
            follow_repo: store.clone(),
            post_repo: store.clone(),
            comment_repo: store.clone(),
            like_repo: store.clone(),
            notification_repo: store.clone(),
            catalog_repo: store.clone(),
            shelf_repo: store.clone(),
            blog_repo: store,
            postgres: None,
        }
    }

    fn postgres(database: PostgresDatabase) -> Self {
        Self {
            user_repo: Arc::new(database.user_repo()),
            follow_repo: Arc::new(database.follow_repo()),
            post_repo: Arc::new(database.post_repo()),
            comment_repo: Arc::new(database.comment_repo()),
            like_repo: Arc::new(database.like_repo()),
            notification_repo: Arc::new(database.notification_repo()),
            catalog_repo: Arc::new(database.catalog_repo()),
            shelf_repo: Arc::new(database.shelf_repo()),
            blog_repo: Arc::new(database.blog_repo()),
            postgres: Some(Arc::new(database)),
        }
    }

    pub fn backend(&self) -> &'static str {
        if self.postgres.is_some() {
            "postgres"
        } else {
            "memory"
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        match &self.postgres {
            Some(database) => database.ping().await,
            None => Ok(()),
        }
    }
}
