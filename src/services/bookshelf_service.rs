use chrono::Utc;
use std::collections::BTreeSet;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::repository::{ShelfRepository, UserRepository};
use crate::models::bookshelf::{default_groups, validate_isbn, ShelfBookRequest};
use crate::models::{Group, Permission, ShelfBook, User};
use crate::{AppError, Result};

/// Books gated by group-granted permissions. Staff users hold every permission.
pub struct BookshelfService {
    shelf_repo: Arc<dyn ShelfRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl BookshelfService {
    pub fn new(shelf_repo: Arc<dyn ShelfRepository>, user_repo: Arc<dyn UserRepository>) -> Self {
        Self { shelf_repo, user_repo }
    }

    /// Creates the Viewers/Editors/Admins groups. Safe to run on every start.
    pub async fn setup_groups(&self) -> Result<Vec<Group>> {
        let mut groups = Vec::new();
        for group in default_groups() {
            let stored = self.shelf_repo.upsert_group(&group).await?;
            tracing::info!("👥 BOOKSHELF: Group {} ready with {:?}", stored.name, stored.permissions);
            groups.push(stored);
        }
        Ok(groups)
    }

    async fn require_user(&self, user_id: Uuid) -> Result<User> {
        match self.user_repo.get_user_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            _ => Err(AppError::AuthError("User not found or inactive".to_string())),
        }
    }

    pub async fn permissions_for(&self, user: &User) -> Result<BTreeSet<Permission>> {
        if user.is_staff {
            return Ok(Permission::ALL.into_iter().collect());
        }
        let mut granted = BTreeSet::new();
        for name in &user.groups {
            if let Some(group) = self.shelf_repo.get_group(name).await? {
                granted.extend(group.permissions);
            }
        }
        Ok(granted)
    }

    /// Resolves the caller and checks one permission: 401 for unknown users, 403 when missing.
    async fn authorize(&self, user_id: Uuid, permission: Permission) -> Result<User> {
        let user = self.require_user(user_id).await?;
        if !self.permissions_for(&user).await?.contains(&permission) {
            tracing::warn!("🚫 BOOKSHELF: {} lacks {}", user.username, permission);
            return Err(AppError::Forbidden(format!(
                "You do not have the '{}' permission required for this action.",
                permission
            )));
        }
        Ok(user)
    }

    async fn require_staff(&self, user_id: Uuid) -> Result<User> {
        let user = self.require_user(user_id).await?;
        if !user.is_staff {
            return Err(AppError::Forbidden("Only staff users may manage groups.".to_string()));
        }
        Ok(user)
    }

    async fn require_book(&self, book_id: Uuid) -> Result<ShelfBook> {
        self.shelf_repo
            .get_book_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn check_request(&self, request: &ShelfBookRequest, existing_id: Option<Uuid>) -> Result<()> {
        request.validate()?;
        validate_isbn(&request.isbn)?;
        if let Some(other) = self.shelf_repo.get_book_by_isbn(&request.isbn).await? {
            if Some(other.id) != existing_id {
                return Err(AppError::ValidationError("A book with this ISBN already exists.".to_string()));
            }
        }
        Ok(())
    }

    pub async fn my_permissions(&self, user_id: Uuid) -> Result<BTreeSet<Permission>> {
        let user = self.require_user(user_id).await?;
        self.permissions_for(&user).await
    }

    pub async fn list_books(&self, user_id: Uuid, search: Option<&str>) -> Result<Vec<ShelfBook>> {
        self.authorize(user_id, Permission::CanView).await?;
        let search = search.map(str::trim).filter(|q| !q.is_empty());
        self.shelf_repo.list_books(search).await
    }

    pub async fn get_book(&self, user_id: Uuid, book_id: Uuid) -> Result<ShelfBook> {
        self.authorize(user_id, Permission::CanView).await?;
        self.require_book(book_id).await
    }

    pub async fn create_book(&self, user_id: Uuid, request: ShelfBookRequest) -> Result<ShelfBook> {
        let user = self.authorize(user_id, Permission::CanCreate).await?;
        self.check_request(&request, None).await?;
        let now = Utc::now();
        let book = ShelfBook {
            id: Uuid::new_v4(),
            title: request.title,
            author: request.author,
            isbn: request.isbn,
            publication_date: request.publication_date,
            owner_id: user.id,
            created_at: now,
            updated_at: now,
        };
        let created = self.shelf_repo.create_book(&book).await?;
        tracing::info!("📗 BOOKSHELF: {} added '{}'", user.username, created.title);
        Ok(created)
    }

    pub async fn update_book(&self, user_id: Uuid, book_id: Uuid, request: ShelfBookRequest) -> Result<ShelfBook> {
        let user = self.authorize(user_id, Permission::CanEdit).await?;
        let mut book = self.require_book(book_id).await?;
        self.check_request(&request, Some(book.id)).await?;
        book.title = request.title;
        book.author = request.author;
        book.isbn = request.isbn;
        book.publication_date = request.publication_date;
        book.updated_at = Utc::now();
        let updated = self.shelf_repo.update_book(&book).await?;
        tracing::info!("📗 BOOKSHELF: {} edited '{}'", user.username, updated.title);
        Ok(updated)
    }

    pub async fn delete_book(&self, user_id: Uuid, book_id: Uuid) -> Result<()> {
        let user = self.authorize(user_id, Permission::CanDelete).await?;
        let book = self.require_book(book_id).await?;
        self.shelf_repo.delete_book(book.id).await?;
        tracing::info!("📕 BOOKSHELF: {} deleted '{}'", user.username, book.title);
        Ok(())
    }

    pub async fn list_groups(&self, user_id: Uuid) -> Result<Vec<Group>> {
        self.require_staff(user_id).await?;
        self.shelf_repo.list_groups().await
    }

    pub async fn add_member(&self, user_id: Uuid, group: &str, member_id: Uuid) -> Result<User> {
        self.require_staff(user_id).await?;
        self.user_repo
            .get_user_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        self.shelf_repo.add_user_to_group(member_id, group).await?;
        tracing::info!("👥 BOOKSHELF: Added {} to {}", member_id, group);
        self.user_repo
            .get_user_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn remove_member(&self, user_id: Uuid, group: &str, member_id: Uuid) -> Result<User> {
        self.require_staff(user_id).await?;
        if self.shelf_repo.get_group(group).await?.is_none() {
            return Err(AppError::NotFound(format!("Group '{}' not found", group)));
        }
        self.user_repo
            .get_user_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        self.shelf_repo.remove_user_from_group(member_id, group).await?;
        tracing::info!("👥 BOOKSHELF: Removed {} from {}", member_id, group);
        self.user_repo
            .get_user_by_id(member_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}
