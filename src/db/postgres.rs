// PostgreSQL repository implementations using sqlx
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Postgres, QueryBuilder};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::db::repository::*;
use crate::db::retry::{with_retry, RetryPolicy};
use crate::models::catalog::{AuthorFilter, AuthorOrdering, BookFilter, BookOrderField, BookOrdering};
use crate::models::comment::CommentQuery;
use crate::models::post::PostQuery;
use crate::models::{
    Author, BlogComment, BlogPost, Book, Comment, Group, Librarian, Library, Notification, Permission, Post,
    ShelfBook, User,
};
use crate::{AppError, Result};

// PostgreSQL connection pool wrapper
pub struct PostgresDatabase {
    pub pool: Arc<PgPool>,
}

impl PostgresDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        tracing::info!("🔗 DATABASE_RESILIENCE: Configuring connection pool");
        tracing::info!("   📊 Max connections: 20");
        tracing::info!("   ⏰ Connection timeout: 30s");
        tracing::info!("   ⏳ Idle timeout: 10m");

        let pool = with_retry("connect", RetryPolicy::default(), move || async move {
            PgPoolOptions::new()
                .max_connections(20)
                .idle_timeout(Duration::from_secs(600))
                .max_lifetime(Duration::from_secs(3600))
                .acquire_timeout(Duration::from_secs(30))
                .connect(database_url)
                .await
                .map_err(|e| AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e)))
        })
        .await?;

        tracing::info!("✅ DATABASE_RESILIENCE: Connection pool configured successfully");

        Ok(Self { pool: Arc::new(pool) })
    }

    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&*self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Failed to run migrations: {}", e)))?;
        tracing::info!("✅ DATABASE: Migrations applied");
        Ok(())
    }

    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }

    pub fn user_repo(&self) -> PostgresUserRepository {
        PostgresUserRepository { pool: self.pool.clone() }
    }

    pub fn follow_repo(&self) -> PostgresFollowRepository {
        PostgresFollowRepository { pool: self.pool.clone() }
    }

    pub fn post_repo(&self) -> PostgresPostRepository {
        PostgresPostRepository { pool: self.pool.clone() }
    }

    pub fn comment_repo(&self) -> PostgresCommentRepository {
        PostgresCommentRepository { pool: self.pool.clone() }
    }

    pub fn like_repo(&self) -> PostgresLikeRepository {
        PostgresLikeRepository { pool: self.pool.clone() }
    }

    pub fn notification_repo(&self) -> PostgresNotificationRepository {
        PostgresNotificationRepository { pool: self.pool.clone() }
    }

    pub fn catalog_repo(&self) -> PostgresCatalogRepository {
        PostgresCatalogRepository { pool: self.pool.clone() }
    }

    pub fn shelf_repo(&self) -> PostgresShelfRepository {
        PostgresShelfRepository { pool: self.pool.clone() }
    }

    pub fn blog_repo(&self) -> PostgresBlogRepository {
        PostgresBlogRepository { pool: self.pool.clone() }
    }
}

/// Unique and foreign-key violations become 400s carrying `message`.
const EMAIL_TAKEN: &str = "A user with that email already exists.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

/// Unique violations on `users` name the column that clashed.
fn user_conflict(err: sqlx::Error) -> AppError {
    let email_clash = matches!(
        &err,
        sqlx::Error::Database(db) if db.constraint() == Some("users_email_lower_idx")
    );
    constraint_error(err, if email_clash { EMAIL_TAKEN } else { USERNAME_TAKEN })
}

fn constraint_error(err: sqlx::Error, message: &str) -> AppError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() || db.is_foreign_key_violation() => {
            AppError::ValidationError(message.to_string())
        }
        _ => err.into(),
    }
}

/// ILIKE pattern matching `term` anywhere, with wildcards in the term escaped.
fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{}%", escaped)
}

const USER_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, bio, profile_picture, \
     is_active, is_staff, date_joined, updated_at, \
     ARRAY(SELECT ug.group_name::TEXT FROM user_groups ug WHERE ug.user_id = users.id ORDER BY ug.group_name) AS groups";

// PostgreSQL User Repository
pub struct PostgresUserRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, first_name, last_name, bio, profile_picture, \
             is_active, is_staff, date_joined, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(user.is_active)
        .bind(user.is_staff)
        .bind(user.date_joined)
        .bind(user.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(user_conflict)?;

        for group in &user.groups {
            sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(user.id)
                .bind(group)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "Unknown group"))?;
        }
        tx.commit().await?;

        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE username = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(username).fetch_optional(&*self.pool).await?)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE LOWER(email) = LOWER($1) LIMIT 1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(email).fetch_optional(&*self.pool).await?)
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ANY($1) ORDER BY username", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(ids.to_vec()).fetch_all(&*self.pool).await?)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let result = sqlx::query(
            "UPDATE users SET email = $2, first_name = $3, last_name = $4, bio = $5, profile_picture = $6, \
             is_active = $7, is_staff = $8, updated_at = NOW() WHERE id = $1",
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.bio)
        .bind(&user.profile_picture)
        .bind(user.is_active)
        .bind(user.is_staff)
        .execute(&*self.pool)
        .await
        .map_err(user_conflict)?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        self.get_user_by_id(user.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }
}

pub struct PostgresFollowRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl FollowRepository for PostgresFollowRepository {
    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followed_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(followed_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| constraint_error(e, "User not found"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND followed_id = $2")
            .bind(follower_id)
            .bind(followed_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND followed_id = $2)",
        )
        .bind(follower_id)
        .bind(followed_id)
        .fetch_one(&*self.pool)
        .await?;
        Ok(exists)
    }

    async fn get_follower_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar("SELECT follower_id FROM follows WHERE followed_id = $1 ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn get_following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(sqlx::query_scalar("SELECT followed_id FROM follows WHERE follower_id = $1 ORDER BY created_at")
            .bind(user_id)
            .fetch_all(&*self.pool)
            .await?)
    }
}

// PostgreSQL Post Repository
pub struct PostgresPostRepository {
    pool: Arc<PgPool>,
}

fn push_post_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &PostQuery) {
    builder.push(" WHERE TRUE");
    if let Some(author_id) = query.author_id {
        builder.push(" AND author_id = ").push_bind(author_id);
    }
    if let Some(author_ids) = &query.author_ids {
        builder.push(" AND author_id = ANY(").push_bind(author_ids.clone()).push(")");
    }
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        let row = sqlx::query_as::<_, Post>(
            "INSERT INTO posts (id, title, content, author_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, title, content, author_id, created_at, updated_at",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id)
        .bind(post.created_at)
        .bind(post.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create post: {}", e)))?;
        Ok(row)
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(sqlx::query_as::<_, Post>(
            "SELECT id, title, content, author_id, created_at, updated_at FROM posts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?)
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM posts");
        push_post_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&*self.pool).await?;

        let mut select = QueryBuilder::new("SELECT id, title, content, author_id, created_at, updated_at FROM posts");
        push_post_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.ordering.sql())
            .push(", id LIMIT ")
            .push_bind(query.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.offset as i64);
        let posts = select.build_query_as::<Post>().fetch_all(&*self.pool).await?;

        Ok((posts, total as u64))
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        sqlx::query_as::<_, Post>(
            "UPDATE posts SET title = $2, content = $3, updated_at = $4 WHERE id = $1 \
             RETURNING id, title, content, author_id, created_at, updated_at",
        )
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.updated_at)
        .fetch_optional(&*self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM posts WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }
}

// PostgreSQL Comment Repository
pub struct PostgresCommentRepository {
    pool: Arc<PgPool>,
}

fn push_comment_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &CommentQuery) {
    builder.push(" WHERE TRUE");
    if let Some(post_id) = query.post_id {
        builder.push(" AND post_id = ").push_bind(post_id);
    }
    if let Some(author_id) = query.author_id {
        builder.push(" AND author_id = ").push_bind(author_id);
    }
    if let Some(term) = &query.search {
        builder.push(" AND content ILIKE ").push_bind(like_pattern(term));
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(
            "INSERT INTO comments (id, post_id, author_id, content, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING id, post_id, author_id, content, created_at, updated_at",
        )
        .bind(comment.id)
        .bind(comment.post_id)
        .bind(comment.author_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| constraint_error(e, "Invalid post"))
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(sqlx::query_as::<_, Comment>(
            "SELECT id, post_id, author_id, content, created_at, updated_at FROM comments WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?)
    }

    async fn list_comments(&self, query: &CommentQuery) -> Result<(Vec<Comment>, u64)> {
        let mut count = QueryBuilder::new("SELECT COUNT(*) FROM comments");
        push_comment_filters(&mut count, query);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&*self.pool).await?;

        let mut select =
            QueryBuilder::new("SELECT id, post_id, author_id, content, created_at, updated_at FROM comments");
        push_comment_filters(&mut select, query);
        select
            .push(" ORDER BY ")
            .push(query.ordering.sql())
            .push(", id LIMIT ")
            .push_bind(query.limit as i64)
            .push(" OFFSET ")
            .push_bind(query.offset as i64);
        let comments = select.build_query_as::<Comment>().fetch_all(&*self.pool).await?;

        Ok((comments, total as u64))
    }

    async fn count_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&*self.pool)
            .await?;
        Ok(count as u64)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment> {
        sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = $3 WHERE id = $1 \
             RETURNING id, post_id, author_id, content, created_at, updated_at",
        )
        .bind(comment.id)
        .bind(&comment.content)
        .bind(comment.updated_at)
        .fetch_optional(&*self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM comments WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }
}

pub struct PostgresLikeRepository {
    pool: Arc<PgPool>,
}

#[async_trait]
impl LikeRepository for PostgresLikeRepository {
    async fn add_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO likes (id, user_id, post_id) VALUES ($1, $2, $3) ON CONFLICT (user_id, post_id) DO NOTHING",
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(post_id)
        .execute(&*self.pool)
        .await
        .map_err(|e| constraint_error(e, "Post not found"))?;
        Ok(result.rows_affected() == 1)
    }

    async fn remove_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM likes WHERE user_id = $1 AND post_id = $2)")
                .bind(user_id)
                .bind(post_id)
                .fetch_one(&*self.pool)
                .await?;
        Ok(exists)
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&*self.pool)
            .await?;
        Ok(count as u64)
    }
}

pub struct PostgresNotificationRepository {
    pool: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct NotificationRow {
    id: Uuid,
    recipient_id: Uuid,
    actor_id: Uuid,
    verb: String,
    target_type: String,
    target_id: Uuid,
    timestamp: chrono::DateTime<chrono::Utc>,
    read: bool,
}

impl TryFrom<NotificationRow> for Notification {
    type Error = AppError;

    fn try_from(row: NotificationRow) -> Result<Self> {
        Ok(Notification {
            id: row.id,
            recipient_id: row.recipient_id,
            actor_id: row.actor_id,
            verb: row.verb.parse()?,
            target_type: row.target_type.parse()?,
            target_id: row.target_id,
            timestamp: row.timestamp,
            read: row.read,
        })
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification> {
        sqlx::query(
            "INSERT INTO notifications (id, recipient_id, actor_id, verb, target_type, target_id, timestamp, read) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(notification.id)
        .bind(notification.recipient_id)
        .bind(notification.actor_id)
        .bind(notification.verb.as_str())
        .bind(notification.target_type.as_str())
        .bind(notification.target_id)
        .bind(notification.timestamp)
        .bind(notification.read)
        .execute(&*self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create notification: {}", e)))?;
        Ok(notification.clone())
    }

    async fn list_for_recipient(&self, recipient_id: Uuid, limit: u32, offset: u32) -> Result<(Vec<Notification>, u64)> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1")
            .bind(recipient_id)
            .fetch_one(&*self.pool)
            .await?;
        let rows = sqlx::query_as::<_, NotificationRow>(
            "SELECT id, recipient_id, actor_id, verb, target_type, target_id, timestamp, read \
             FROM notifications WHERE recipient_id = $1 ORDER BY timestamp DESC, id LIMIT $2 OFFSET $3",
        )
        .bind(recipient_id)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&*self.pool)
        .await?;
        let notifications = rows.into_iter().map(Notification::try_from).collect::<Result<Vec<_>>>()?;
        Ok((notifications, total as u64))
    }

    async fn count_unread(&self, recipient_id: Uuid) -> Result<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE recipient_id = $1 AND NOT read")
                .bind(recipient_id)
                .fetch_one(&*self.pool)
                .await?;
        Ok(count as u64)
    }

    async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE id = $1 AND recipient_id = $2")
            .bind(id)
            .bind(recipient_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND NOT read")
            .bind(recipient_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

pub struct PostgresCatalogRepository {
    pool: Arc<PgPool>,
}

const LIBRARY_COLUMNS: &str =
    "id, name, ARRAY(SELECT lb.book_id FROM library_books lb WHERE lb.library_id = libraries.id) AS book_ids";

fn push_book_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &BookFilter) {
    builder.push(" WHERE TRUE");
    if let Some(title) = &filter.title {
        builder.push(" AND b.title ILIKE ").push_bind(like_pattern(title));
    }
    if let Some(author_id) = filter.author {
        builder.push(" AND b.author_id = ").push_bind(author_id);
    }
    if let Some(name) = &filter.author_name {
        builder.push(" AND a.name ILIKE ").push_bind(like_pattern(name));
    }
    if let Some(year) = filter.publication_year {
        builder.push(" AND b.publication_year = ").push_bind(year);
    }
    if let Some(year) = filter.publication_year_min {
        builder.push(" AND b.publication_year >= ").push_bind(year);
    }
    if let Some(year) = filter.publication_year_max {
        builder.push(" AND b.publication_year <= ").push_bind(year);
    }
    if let Some(term) = &filter.search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (b.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR a.name ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    async fn create_author(&self, author: &Author) -> Result<Author> {
        Ok(sqlx::query_as::<_, Author>("INSERT INTO authors (id, name) VALUES ($1, $2) RETURNING id, name")
            .bind(author.id)
            .bind(&author.name)
            .fetch_one(&*self.pool)
            .await?)
    }

    async fn get_author_by_id(&self, id: Uuid) -> Result<Option<Author>> {
        Ok(sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn get_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        Ok(sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<Author>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT a.id, a.name FROM authors a WHERE TRUE");
        if let Some(name) = &filter.name {
            builder.push(" AND a.name ILIKE ").push_bind(like_pattern(name));
        }
        if let Some(term) = &filter.search {
            builder.push(" AND a.name ILIKE ").push_bind(like_pattern(term));
        }
        if let Some(min) = filter.min_books {
            builder
                .push(" AND (SELECT COUNT(*) FROM books b WHERE b.author_id = a.id) >= ")
                .push_bind(min as i64);
        }
        let ordering = AuthorOrdering::parse(filter.ordering.as_deref());
        builder.push(if ordering.by_id { " ORDER BY a.id" } else { " ORDER BY a.name" });
        builder.push(if ordering.descending { " DESC" } else { " ASC" });
        Ok(builder.build_query_as::<Author>().fetch_all(&*self.pool).await?)
    }

    async fn create_book(&self, book: &Book) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "INSERT INTO books (id, title, publication_year, author_id) VALUES ($1, $2, $3, $4) \
             RETURNING id, title, publication_year, author_id",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| constraint_error(e, "Invalid author"))
    }

    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<Book>> {
        Ok(sqlx::query_as::<_, Book>("SELECT id, title, publication_year, author_id FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&*self.pool)
            .await?)
    }

    async fn get_books_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Book>> {
        Ok(sqlx::query_as::<_, Book>(
            "SELECT id, title, publication_year, author_id FROM books WHERE id = ANY($1) ORDER BY title",
        )
        .bind(ids.to_vec())
        .fetch_all(&*self.pool)
        .await?)
    }

    async fn find_duplicate_book(&self, title: &str, author_id: Uuid, publication_year: i32) -> Result<Option<Book>> {
        Ok(sqlx::query_as::<_, Book>(
            "SELECT id, title, publication_year, author_id FROM books \
             WHERE title = $1 AND author_id = $2 AND publication_year = $3",
        )
        .bind(title)
        .bind(author_id)
        .bind(publication_year)
        .fetch_optional(&*self.pool)
        .await?)
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.title, b.publication_year, b.author_id FROM books b JOIN authors a ON a.id = b.author_id",
        );
        push_book_filters(&mut builder, filter);
        let ordering = BookOrdering::parse(filter.ordering.as_deref());
        let column = match ordering.field {
            BookOrderField::Title => "b.title",
            BookOrderField::PublicationYear => "b.publication_year",
            BookOrderField::AuthorName => "a.name",
            BookOrderField::Id => "b.id",
        };
        builder
            .push(" ORDER BY ")
            .push(column)
            .push(if ordering.descending { " DESC" } else { " ASC" });
        Ok(builder.build_query_as::<Book>().fetch_all(&*self.pool).await?)
    }

    async fn list_books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>> {
        Ok(sqlx::query_as::<_, Book>(
            "SELECT id, title, publication_year, author_id FROM books WHERE author_id = $1 ORDER BY title",
        )
        .bind(author_id)
        .fetch_all(&*self.pool)
        .await?)
    }

    async fn update_book(&self, book: &Book) -> Result<Book> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET title = $2, publication_year = $3, author_id = $4 WHERE id = $1 \
             RETURNING id, title, publication_year, author_id",
        )
        .bind(book.id)
        .bind(&book.title)
        .bind(book.publication_year)
        .bind(book.author_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| constraint_error(e, "Invalid author"))?
        .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM books WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }

    async fn create_library(&self, library: &Library) -> Result<Library> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO libraries (id, name) VALUES ($1, $2)")
            .bind(library.id)
            .bind(&library.name)
            .execute(&mut *tx)
            .await
            .map_err(|e| constraint_error(e, "A library with that name already exists."))?;
        for book_id in &library.book_ids {
            sqlx::query("INSERT INTO library_books (library_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                .bind(library.id)
                .bind(book_id)
                .execute(&mut *tx)
                .await
                .map_err(|e| constraint_error(e, "Invalid book"))?;
        }
        tx.commit().await?;
        Ok(library.clone())
    }

    async fn get_library_by_id(&self, id: Uuid) -> Result<Option<Library>> {
        let sql = format!("SELECT {} FROM libraries WHERE id = $1", LIBRARY_COLUMNS);
        Ok(sqlx::query_as::<_, Library>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn get_library_by_name(&self, name: &str) -> Result<Option<Library>> {
        let sql = format!("SELECT {} FROM libraries WHERE name = $1", LIBRARY_COLUMNS);
        Ok(sqlx::query_as::<_, Library>(&sql).bind(name).fetch_optional(&*self.pool).await?)
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let sql = format!("SELECT {} FROM libraries ORDER BY name", LIBRARY_COLUMNS);
        Ok(sqlx::query_as::<_, Library>(&sql).fetch_all(&*self.pool).await?)
    }

    async fn add_book_to_library(&self, library_id: Uuid, book_id: Uuid) -> Result<()> {
        sqlx::query("INSERT INTO library_books (library_id, book_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(library_id)
            .bind(book_id)
            .execute(&*self.pool)
            .await
            .map_err(|e| constraint_error(e, "Invalid book"))?;
        Ok(())
    }

    async fn set_librarian(&self, librarian: &Librarian) -> Result<Librarian> {
        Ok(sqlx::query_as::<_, Librarian>(
            "INSERT INTO librarians (id, name, library_id) VALUES ($1, $2, $3) \
             ON CONFLICT (library_id) DO UPDATE SET id = EXCLUDED.id, name = EXCLUDED.name \
             RETURNING id, name, library_id",
        )
        .bind(librarian.id)
        .bind(&librarian.name)
        .bind(librarian.library_id)
        .fetch_one(&*self.pool)
        .await?)
    }

    async fn get_librarian_for_library(&self, library_id: Uuid) -> Result<Option<Librarian>> {
        Ok(sqlx::query_as::<_, Librarian>("SELECT id, name, library_id FROM librarians WHERE library_id = $1")
            .bind(library_id)
            .fetch_optional(&*self.pool)
            .await?)
    }
}

pub struct PostgresShelfRepository {
    pool: Arc<PgPool>,
}

#[derive(sqlx::FromRow)]
struct GroupRow {
    name: String,
    permissions: Vec<String>,
}

impl From<GroupRow> for Group {
    fn from(row: GroupRow) -> Self {
        Group {
            name: row.name,
            permissions: row.permissions.iter().filter_map(|p| Permission::from_codename(p)).collect(),
        }
    }
}

const SHELF_COLUMNS: &str = "id, title, author, isbn, publication_date, owner_id, created_at, updated_at";

#[async_trait]
impl ShelfRepository for PostgresShelfRepository {
    async fn upsert_group(&self, group: &Group) -> Result<Group> {
        let mut permissions = self.get_group(&group.name).await?.map(|g| g.permissions).unwrap_or_default();
        for permission in &group.permissions {
            if !permissions.contains(permission) {
                permissions.push(*permission);
            }
        }
        let codenames: Vec<String> = permissions.iter().map(|p| p.codename().to_string()).collect();
        let row = sqlx::query_as::<_, GroupRow>(
            "INSERT INTO groups (name, permissions) VALUES ($1, $2) \
             ON CONFLICT (name) DO UPDATE SET permissions = EXCLUDED.permissions \
             RETURNING name::TEXT AS name, permissions",
        )
        .bind(&group.name)
        .bind(codenames)
        .fetch_one(&*self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_group(&self, name: &str) -> Result<Option<Group>> {
        let row = sqlx::query_as::<_, GroupRow>("SELECT name::TEXT AS name, permissions FROM groups WHERE name = $1")
            .bind(name)
            .fetch_optional(&*self.pool)
            .await?;
        Ok(row.map(Group::from))
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let rows = sqlx::query_as::<_, GroupRow>("SELECT name::TEXT AS name, permissions FROM groups ORDER BY name")
            .fetch_all(&*self.pool)
            .await?;
        Ok(rows.into_iter().map(Group::from).collect())
    }

    async fn add_user_to_group(&self, user_id: Uuid, group: &str) -> Result<()> {
        if self.get_group(group).await?.is_none() {
            return Err(AppError::NotFound(format!("Group '{}' not found", group)));
        }
        sqlx::query("INSERT INTO user_groups (user_id, group_name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(user_id)
            .bind(group)
            .execute(&*self.pool)
            .await
            .map_err(|e| match constraint_error(e, "User not found") {
                AppError::ValidationError(msg) => AppError::NotFound(msg),
                other => other,
            })?;
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: Uuid, group: &str) -> Result<()> {
        sqlx::query("DELETE FROM user_groups WHERE user_id = $1 AND group_name = $2")
            .bind(user_id)
            .bind(group)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn create_book(&self, book: &ShelfBook) -> Result<ShelfBook> {
        let sql = format!(
            "INSERT INTO shelf_books ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) RETURNING {cols}",
            cols = SHELF_COLUMNS
        );
        sqlx::query_as::<_, ShelfBook>(&sql)
            .bind(book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(book.publication_date)
            .bind(book.owner_id)
            .bind(book.created_at)
            .bind(book.updated_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| constraint_error(e, "A book with this ISBN already exists."))
    }

    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<ShelfBook>> {
        let sql = format!("SELECT {} FROM shelf_books WHERE id = $1", SHELF_COLUMNS);
        Ok(sqlx::query_as::<_, ShelfBook>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<ShelfBook>> {
        let sql = format!("SELECT {} FROM shelf_books WHERE isbn = $1", SHELF_COLUMNS);
        Ok(sqlx::query_as::<_, ShelfBook>(&sql).bind(isbn).fetch_optional(&*self.pool).await?)
    }

    async fn list_books(&self, search: Option<&str>) -> Result<Vec<ShelfBook>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM shelf_books", SHELF_COLUMNS));
        if let Some(term) = search {
            let pattern = like_pattern(term);
            builder
                .push(" WHERE title ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR author ILIKE ")
                .push_bind(pattern);
        }
        builder.push(" ORDER BY created_at DESC");
        Ok(builder.build_query_as::<ShelfBook>().fetch_all(&*self.pool).await?)
    }

    async fn update_book(&self, book: &ShelfBook) -> Result<ShelfBook> {
        let sql = format!(
            "UPDATE shelf_books SET title = $2, author = $3, isbn = $4, publication_date = $5, updated_at = $6 \
             WHERE id = $1 RETURNING {}",
            SHELF_COLUMNS
        );
        sqlx::query_as::<_, ShelfBook>(&sql)
            .bind(book.id)
            .bind(&book.title)
            .bind(&book.author)
            .bind(&book.isbn)
            .bind(book.publication_date)
            .bind(book.updated_at)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| constraint_error(e, "A book with this ISBN already exists."))?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM shelf_books WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }
}

pub struct PostgresBlogRepository {
    pool: Arc<PgPool>,
}

const BLOG_POST_COLUMNS: &str = "id, title, content, author_id, tags, published_date";
const BLOG_COMMENT_COLUMNS: &str = "id, post_id, author_id, content, created_at, updated_at";

fn push_blog_filters<'a>(builder: &mut QueryBuilder<'a, Postgres>, tag: Option<&str>, search: Option<&str>) {
    builder.push(" WHERE TRUE");
    if let Some(tag) = tag {
        builder.push(" AND ").push_bind(tag.to_string()).push(" = ANY(tags)");
    }
    if let Some(term) = search {
        let pattern = like_pattern(term);
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR EXISTS (SELECT 1 FROM unnest(tags) t WHERE t ILIKE ")
            .push_bind(pattern)
            .push("))");
    }
}

#[async_trait]
impl BlogRepository for PostgresBlogRepository {
    async fn create_post(&self, post: &BlogPost) -> Result<BlogPost> {
        let sql = format!(
            "INSERT INTO blog_posts ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = BLOG_POST_COLUMNS
        );
        Ok(sqlx::query_as::<_, BlogPost>(&sql)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(post.author_id)
            .bind(&post.tags)
            .bind(post.published_date)
            .fetch_one(&*self.pool)
            .await?)
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<BlogPost>> {
        let sql = format!("SELECT {} FROM blog_posts WHERE id = $1", BLOG_POST_COLUMNS);
        Ok(sqlx::query_as::<_, BlogPost>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn list_posts(&self, tag: Option<&str>, search: Option<&str>, limit: u32, offset: u32) -> Result<(Vec<BlogPost>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM blog_posts");
        push_blog_filters(&mut count, tag, search);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&*self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM blog_posts", BLOG_POST_COLUMNS));
        push_blog_filters(&mut select, tag, search);
        select
            .push(" ORDER BY published_date DESC, id LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);
        let posts = select.build_query_as::<BlogPost>().fetch_all(&*self.pool).await?;
        Ok((posts, total as u64))
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        Ok(sqlx::query_scalar("SELECT DISTINCT unnest(tags) AS tag FROM blog_posts ORDER BY tag")
            .fetch_all(&*self.pool)
            .await?)
    }

    async fn update_post(&self, post: &BlogPost) -> Result<BlogPost> {
        let sql = format!(
            "UPDATE blog_posts SET title = $2, content = $3, tags = $4 WHERE id = $1 RETURNING {}",
            BLOG_POST_COLUMNS
        );
        sqlx::query_as::<_, BlogPost>(&sql)
            .bind(post.id)
            .bind(&post.title)
            .bind(&post.content)
            .bind(&post.tags)
            .fetch_optional(&*self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM blog_posts WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }

    async fn create_comment(&self, comment: &BlogComment) -> Result<BlogComment> {
        let sql = format!(
            "INSERT INTO blog_comments ({cols}) VALUES ($1, $2, $3, $4, $5, $6) RETURNING {cols}",
            cols = BLOG_COMMENT_COLUMNS
        );
        sqlx::query_as::<_, BlogComment>(&sql)
            .bind(comment.id)
            .bind(comment.post_id)
            .bind(comment.author_id)
            .bind(&comment.content)
            .bind(comment.created_at)
            .bind(comment.updated_at)
            .fetch_one(&*self.pool)
            .await
            .map_err(|e| constraint_error(e, "Invalid post"))
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<BlogComment>> {
        let sql = format!("SELECT {} FROM blog_comments WHERE id = $1", BLOG_COMMENT_COLUMNS);
        Ok(sqlx::query_as::<_, BlogComment>(&sql).bind(id).fetch_optional(&*self.pool).await?)
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<BlogComment>> {
        let sql = format!(
            "SELECT {} FROM blog_comments WHERE post_id = $1 ORDER BY created_at",
            BLOG_COMMENT_COLUMNS
        );
        Ok(sqlx::query_as::<_, BlogComment>(&sql).bind(post_id).fetch_all(&*self.pool).await?)
    }

    async fn update_comment(&self, comment: &BlogComment) -> Result<BlogComment> {
        let sql = format!(
            "UPDATE blog_comments SET content = $2, updated_at = $3 WHERE id = $1 RETURNING {}",
            BLOG_COMMENT_COLUMNS
        );
        sqlx::query_as::<_, BlogComment>(&sql)
            .bind(comment.id)
            .bind(&comment.content)
            .bind(comment.updated_at)
            .fetch_optional(&*self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM blog_comments WHERE id = $1").bind(id).execute(&*self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("rust"), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
