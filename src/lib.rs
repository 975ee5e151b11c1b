// Library modules for the community hub application
pub mod config;
pub mod models;
pub mod db;
pub mod routes;
pub mod services;
pub mod auth;
pub mod error;

use std::sync::Arc;

use axum::Router;
use tera::Tera;

// Re-export commonly used types
pub use error::{AppError, Result};
pub use config::{AdminBootstrap, AppConfig};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: db::DatabaseClient,
    pub auth_service: Arc<auth::AuthService>,
    pub user_service: Arc<services::UserService>,
    pub post_service: Arc<services::PostService>,
    pub comment_service: Arc<services::CommentService>,
    pub notification_service: Arc<services::NotificationService>,
    pub catalog_service: Arc<services::CatalogService>,
    pub bookshelf_service: Arc<services::BookshelfService>,
    pub blog_service: Arc<services::BlogService>,
    pub templates: Arc<Tera>,
}

impl AppState {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let db = db::DatabaseClient::new(&config).await?;
        Self::with_database(config, db)
    }

    /// Wires every service onto an already opened store.
    pub fn with_database(config: AppConfig, db: db::DatabaseClient) -> Result<Self> {
        let auth_service = Arc::new(auth::AuthService::new(config.jwt_secret.clone(), config.token_ttl_hours));
        let notification_service = Arc::new(services::NotificationService::new(
            db.notification_repo.clone(),
            db.user_repo.clone(),
        ));
        let user_service = Arc::new(services::UserService::new(
            db.user_repo.clone(),
            db.follow_repo.clone(),
            notification_service.clone(),
        ));
        let post_service = Arc::new(services::PostService::new(
            db.post_repo.clone(),
            db.comment_repo.clone(),
            db.like_repo.clone(),
            db.follow_repo.clone(),
            db.user_repo.clone(),
            notification_service.clone(),
        ));
        let comment_service = Arc::new(services::CommentService::new(
            db.comment_repo.clone(),
            db.post_repo.clone(),
            db.user_repo.clone(),
            notification_service.clone(),
        ));
        let catalog_service = Arc::new(services::CatalogService::new(db.catalog_repo.clone()));
        let bookshelf_service = Arc::new(services::BookshelfService::new(db.shelf_repo.clone(), db.user_repo.clone()));
        let blog_service = Arc::new(services::BlogService::new(db.blog_repo.clone(), db.user_repo.clone()));
        let templates = Arc::new(routes::web::load_templates()?);

        Ok(Self {
            config,
            db,
            auth_service,
            user_service,
            post_service,
            comment_service,
            notification_service,
            catalog_service,
            bookshelf_service,
            blog_service,
            templates,
        })
    }

    /// Startup chores: permission groups, the optional staff account and demo catalog.
    pub async fn bootstrap(&self) -> Result<()> {
        self.bookshelf_service.setup_groups().await?;
        if let Some(admin) = &self.config.admin {
            let user = self.user_service.ensure_staff_user(admin, &self.auth_service).await?;
            tracing::info!("👤 STARTUP: Staff account {} ready", user.username);
        }
        if self.config.seed_sample_data {
            self.catalog_service.seed_sample_data().await?;
        }
        Ok(())
    }
}

/// Full router with state applied; `main` adds the outer tower layers.
pub fn build_app(state: AppState) -> Router {
    routes::create_routes(state)
}
