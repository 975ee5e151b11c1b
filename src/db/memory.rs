// In-process implementation of every repository trait, used when no
// DATABASE_URL is configured and by the test-suite.
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::db::repository::*;
use crate::models::catalog::{AuthorFilter, AuthorOrdering, BookFilter, BookOrderField, BookOrdering};
use crate::models::comment::CommentQuery;
use crate::models::post::{PostOrdering, PostQuery};
use crate::models::{
    Author, BlogComment, BlogPost, Book, Comment, Follow, Group, Like, Librarian, Library, Notification, Post,
    ShelfBook, User,
};
use crate::{AppError, Result};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    follows: Vec<Follow>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    likes: Vec<Like>,
    notifications: HashMap<Uuid, Notification>,
    authors: HashMap<Uuid, Author>,
    books: HashMap<Uuid, Book>,
    libraries: HashMap<Uuid, Library>,
    librarians: HashMap<Uuid, Librarian>,
    groups: HashMap<String, Group>,
    shelf_books: HashMap<Uuid, ShelfBook>,
    blog_posts: HashMap<Uuid, BlogPost>,
    blog_comments: HashMap<Uuid, BlogComment>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn paginate<T: Clone>(items: &[T], limit: u32, offset: u32) -> Vec<T> {
    items.iter().skip(offset as usize).take(limit as usize).cloned().collect()
}

fn sort_by_timestamps<T>(items: &mut [T], ordering: PostOrdering, created: impl Fn(&T) -> chrono::DateTime<Utc>, updated: impl Fn(&T) -> chrono::DateTime<Utc>) {
    match ordering {
        PostOrdering::CreatedAsc => items.sort_by_key(|i| created(i)),
        PostOrdering::CreatedDesc => items.sort_by_key(|i| std::cmp::Reverse(created(i))),
        PostOrdering::UpdatedAsc => items.sort_by_key(|i| updated(i)),
        PostOrdering::UpdatedDesc => items.sort_by_key(|i| std::cmp::Reverse(updated(i))),
    }
}

/// Case-insensitive email uniqueness, checked under the write lock.
fn check_email_free(state: &State, user: &User) -> Result<()> {
    if state.users.values().any(|u| u.id != user.id && u.email.eq_ignore_ascii_case(&user.email)) {
        return Err(AppError::ValidationError("A user with that email already exists.".to_string()));
    }
    Ok(())
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: &User) -> Result<User> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(AppError::ValidationError("A user with that username already exists.".to_string()));
        }
        check_email_free(&state, user)?;
        state.users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email.eq_ignore_ascii_case(email)).cloned())
    }

    async fn get_users_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>> {
        let state = self.state.read().await;
        let mut users: Vec<User> = ids.iter().filter_map(|id| state.users.get(id).cloned()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> Result<User> {
        let mut state = self.state.write().await;
        check_email_free(&state, user)?;
        let stored = state
            .users
            .get_mut(&user.id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        *stored = User { updated_at: Utc::now(), ..user.clone() };
        Ok(stored.clone())
    }
}

fn remove_post_cascade(state: &mut State, post_id: Uuid) {
    state.posts.remove(&post_id);
    state.comments.retain(|_, c| c.post_id != post_id);
    state.likes.retain(|l| l.post_id != post_id);
}

#[async_trait]
impl FollowRepository for MemoryStore {
    async fn add_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.follows.iter().any(|f| f.follower_id == follower_id && f.followed_id == followed_id) {
            return Ok(false);
        }
        state.follows.push(Follow::new(follower_id, followed_id));
        Ok(true)
    }

    async fn remove_follow(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.follows.len();
        state.follows.retain(|f| !(f.follower_id == follower_id && f.followed_id == followed_id));
        Ok(state.follows.len() != before)
    }

    async fn is_following(&self, follower_id: Uuid, followed_id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.follows.iter().any(|f| f.follower_id == follower_id && f.followed_id == followed_id))
    }

    async fn get_follower_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state.follows.iter().filter(|f| f.followed_id == user_id).map(|f| f.follower_id).collect())
    }

    async fn get_following_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state.follows.iter().filter(|f| f.follower_id == user_id).map(|f| f.followed_id).collect())
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create_post(&self, post: &Post) -> Result<Post> {
        self.state.write().await.posts.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&id).cloned())
    }

    async fn list_posts(&self, query: &PostQuery) -> Result<(Vec<Post>, u64)> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| query.author_id.map_or(true, |id| p.author_id == id))
            .filter(|p| query.author_ids.as_ref().map_or(true, |ids| ids.contains(&p.author_id)))
            .filter(|p| {
                query
                    .search
                    .as_deref()
                    .map_or(true, |term| icontains(&p.title, term) || icontains(&p.content, term))
            })
            .cloned()
            .collect();
        sort_by_timestamps(&mut posts, query.ordering, |p| p.created_at, |p| p.updated_at);
        let total = posts.len() as u64;
        Ok((paginate(&posts, query.limit, query.offset), total))
    }

    async fn update_post(&self, post: &Post) -> Result<Post> {
        let mut state = self.state.write().await;
        let stored = state
            .posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        *stored = post.clone();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        remove_post_cascade(&mut *self.state.write().await, id);
        Ok(())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create_comment(&self, comment: &Comment) -> Result<Comment> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(AppError::ValidationError("Invalid post".to_string()));
        }
        state.comments.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<Comment>> {
        Ok(self.state.read().await.comments.get(&id).cloned())
    }

    async fn list_comments(&self, query: &CommentQuery) -> Result<(Vec<Comment>, u64)> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| query.post_id.map_or(true, |id| c.post_id == id))
            .filter(|c| query.author_id.map_or(true, |id| c.author_id == id))
            .filter(|c| query.search.as_deref().map_or(true, |term| icontains(&c.content, term)))
            .cloned()
            .collect();
        sort_by_timestamps(&mut comments, query.ordering, |c| c.created_at, |c| c.updated_at);
        let total = comments.len() as u64;
        Ok((paginate(&comments, query.limit, query.offset), total))
    }

    async fn count_comments_for_post(&self, post_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.comments.values().filter(|c| c.post_id == post_id).count() as u64)
    }

    async fn update_comment(&self, comment: &Comment) -> Result<Comment> {
        let mut state = self.state.write().await;
        let stored = state
            .comments
            .get_mut(&comment.id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        *stored = comment.clone();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        self.state.write().await.comments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LikeRepository for MemoryStore {
    async fn add_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        if state.likes.iter().any(|l| l.user_id == user_id && l.post_id == post_id) {
            return Ok(false);
        }
        state.likes.push(Like::new(user_id, post_id));
        Ok(true)
    }

    async fn remove_like(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.likes.len();
        state.likes.retain(|l| !(l.user_id == user_id && l.post_id == post_id));
        Ok(state.likes.len() != before)
    }

    async fn has_liked(&self, user_id: Uuid, post_id: Uuid) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state.likes.iter().any(|l| l.user_id == user_id && l.post_id == post_id))
    }

    async fn count_likes(&self, post_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.likes.iter().filter(|l| l.post_id == post_id).count() as u64)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create_notification(&self, notification: &Notification) -> Result<Notification> {
        self.state.write().await.notifications.insert(notification.id, notification.clone());
        Ok(notification.clone())
    }

    async fn list_for_recipient(&self, recipient_id: Uuid, limit: u32, offset: u32) -> Result<(Vec<Notification>, u64)> {
        let state = self.state.read().await;
        let mut items: Vec<Notification> =
            state.notifications.values().filter(|n| n.recipient_id == recipient_id).cloned().collect();
        items.sort_by_key(|n| std::cmp::Reverse(n.timestamp));
        let total = items.len() as u64;
        Ok((paginate(&items, limit, offset), total))
    }

    async fn count_unread(&self, recipient_id: Uuid) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state.notifications.values().filter(|n| n.recipient_id == recipient_id && !n.read).count() as u64)
    }

    async fn mark_read(&self, id: Uuid, recipient_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.notifications.get_mut(&id) {
            Some(n) if n.recipient_id == recipient_id => {
                n.read = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_all_read(&self, recipient_id: Uuid) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut updated = 0;
        for n in state.notifications.values_mut().filter(|n| n.recipient_id == recipient_id && !n.read) {
            n.read = true;
            updated += 1;
        }
        Ok(updated)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn create_author(&self, author: &Author) -> Result<Author> {
        self.state.write().await.authors.insert(author.id, author.clone());
        Ok(author.clone())
    }

    async fn get_author_by_id(&self, id: Uuid) -> Result<Option<Author>> {
        Ok(self.state.read().await.authors.get(&id).cloned())
    }

    async fn get_author_by_name(&self, name: &str) -> Result<Option<Author>> {
        let state = self.state.read().await;
        Ok(state.authors.values().find(|a| a.name == name).cloned())
    }

    async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<Author>> {
        let state = self.state.read().await;
        let book_counts = state.books.values().fold(HashMap::new(), |mut counts, book| {
            *counts.entry(book.author_id).or_insert(0usize) += 1;
            counts
        });
        let mut authors: Vec<Author> = state
            .authors
            .values()
            .filter(|a| filter.name.as_deref().map_or(true, |n| icontains(&a.name, n)))
            .filter(|a| filter.search.as_deref().map_or(true, |s| icontains(&a.name, s)))
            .filter(|a| filter.min_books.map_or(true, |min| book_counts.get(&a.id).copied().unwrap_or(0) >= min))
            .cloned()
            .collect();
        let ordering = AuthorOrdering::parse(filter.ordering.as_deref());
        if ordering.by_id {
            authors.sort_by_key(|a| a.id);
        } else {
            authors.sort_by(|a, b| a.name.cmp(&b.name));
        }
        if ordering.descending {
            authors.reverse();
        }
        Ok(authors)
    }

    async fn create_book(&self, book: &Book) -> Result<Book> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&book.author_id) {
            return Err(AppError::ValidationError("Invalid author".to_string()));
        }
        state.books.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<Book>> {
        Ok(self.state.read().await.books.get(&id).cloned())
    }

    async fn get_books_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = ids.iter().filter_map(|id| state.books.get(id).cloned()).collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn find_duplicate_book(&self, title: &str, author_id: Uuid, publication_year: i32) -> Result<Option<Book>> {
        let state = self.state.read().await;
        Ok(state
            .books
            .values()
            .find(|b| b.title == title && b.author_id == author_id && b.publication_year == publication_year)
            .cloned())
    }

    async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let author_name = |book: &Book| state.authors.get(&book.author_id).map(|a| a.name.clone()).unwrap_or_default();
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| filter.title.as_deref().map_or(true, |t| icontains(&b.title, t)))
            .filter(|b| filter.author.map_or(true, |id| b.author_id == id))
            .filter(|b| filter.author_name.as_deref().map_or(true, |n| icontains(&author_name(b), n)))
            .filter(|b| filter.publication_year.map_or(true, |y| b.publication_year == y))
            .filter(|b| filter.publication_year_min.map_or(true, |y| b.publication_year >= y))
            .filter(|b| filter.publication_year_max.map_or(true, |y| b.publication_year <= y))
            .filter(|b| {
                filter
                    .search
                    .as_deref()
                    .map_or(true, |s| icontains(&b.title, s) || icontains(&author_name(b), s))
            })
            .cloned()
            .collect();
        let ordering = BookOrdering::parse(filter.ordering.as_deref());
        match ordering.field {
            BookOrderField::Title => books.sort_by(|a, b| a.title.cmp(&b.title)),
            BookOrderField::PublicationYear => books.sort_by_key(|b| b.publication_year),
            BookOrderField::AuthorName => books.sort_by_key(|b| author_name(b)),
            BookOrderField::Id => books.sort_by_key(|b| b.id),
        }
        if ordering.descending {
            books.reverse();
        }
        Ok(books)
    }

    async fn list_books_by_author(&self, author_id: Uuid) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let mut books: Vec<Book> = state.books.values().filter(|b| b.author_id == author_id).cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn update_book(&self, book: &Book) -> Result<Book> {
        let mut state = self.state.write().await;
        if !state.authors.contains_key(&book.author_id) {
            return Err(AppError::ValidationError("Invalid author".to_string()));
        }
        let stored = state
            .books
            .get_mut(&book.id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        *stored = book.clone();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.books.remove(&id);
        for library in state.libraries.values_mut() {
            library.book_ids.retain(|b| *b != id);
        }
        Ok(())
    }

    async fn create_library(&self, library: &Library) -> Result<Library> {
        let mut state = self.state.write().await;
        if state.libraries.values().any(|l| l.name == library.name) {
            return Err(AppError::ValidationError("A library with that name already exists.".to_string()));
        }
        state.libraries.insert(library.id, library.clone());
        Ok(library.clone())
    }

    async fn get_library_by_id(&self, id: Uuid) -> Result<Option<Library>> {
        Ok(self.state.read().await.libraries.get(&id).cloned())
    }

    async fn get_library_by_name(&self, name: &str) -> Result<Option<Library>> {
        let state = self.state.read().await;
        Ok(state.libraries.values().find(|l| l.name == name).cloned())
    }

    async fn list_libraries(&self) -> Result<Vec<Library>> {
        let state = self.state.read().await;
        let mut libraries: Vec<Library> = state.libraries.values().cloned().collect();
        libraries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(libraries)
    }

    async fn add_book_to_library(&self, library_id: Uuid, book_id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book_id) {
            return Err(AppError::ValidationError("Invalid book".to_string()));
        }
        let library = state
            .libraries
            .get_mut(&library_id)
            .ok_or_else(|| AppError::NotFound("Library not found".to_string()))?;
        if !library.book_ids.contains(&book_id) {
            library.book_ids.push(book_id);
        }
        Ok(())
    }

    async fn set_librarian(&self, librarian: &Librarian) -> Result<Librarian> {
        let mut state = self.state.write().await;
        state.librarians.insert(librarian.library_id, librarian.clone());
        Ok(librarian.clone())
    }

    async fn get_librarian_for_library(&self, library_id: Uuid) -> Result<Option<Librarian>> {
        Ok(self.state.read().await.librarians.get(&library_id).cloned())
    }
}

#[async_trait]
impl ShelfRepository for MemoryStore {
    async fn upsert_group(&self, group: &Group) -> Result<Group> {
        let mut state = self.state.write().await;
        let stored = state
            .groups
            .entry(group.name.clone())
            .or_insert_with(|| Group { name: group.name.clone(), permissions: Vec::new() });
        // Existing grants are kept; missing ones are added.
        for permission in &group.permissions {
            if !stored.permissions.contains(permission) {
                stored.permissions.push(*permission);
            }
        }
        Ok(stored.clone())
    }

    async fn get_group(&self, name: &str) -> Result<Option<Group>> {
        Ok(self.state.read().await.groups.get(name).cloned())
    }

    async fn list_groups(&self) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let mut groups: Vec<Group> = state.groups.values().cloned().collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn add_user_to_group(&self, user_id: Uuid, group: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(group) {
            return Err(AppError::NotFound(format!("Group '{}' not found", group)));
        }
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        if !user.groups.iter().any(|g| g == group) {
            user.groups.push(group.to_string());
        }
        Ok(())
    }

    async fn remove_user_from_group(&self, user_id: Uuid, group: &str) -> Result<()> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
        user.groups.retain(|g| g != group);
        Ok(())
    }

    async fn create_book(&self, book: &ShelfBook) -> Result<ShelfBook> {
        let mut state = self.state.write().await;
        if state.shelf_books.values().any(|b| b.isbn == book.isbn) {
            return Err(AppError::ValidationError("A book with this ISBN already exists.".to_string()));
        }
        state.shelf_books.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn get_book_by_id(&self, id: Uuid) -> Result<Option<ShelfBook>> {
        Ok(self.state.read().await.shelf_books.get(&id).cloned())
    }

    async fn get_book_by_isbn(&self, isbn: &str) -> Result<Option<ShelfBook>> {
        let state = self.state.read().await;
        Ok(state.shelf_books.values().find(|b| b.isbn == isbn).cloned())
    }

    async fn list_books(&self, search: Option<&str>) -> Result<Vec<ShelfBook>> {
        let state = self.state.read().await;
        let mut books: Vec<ShelfBook> = state
            .shelf_books
            .values()
            .filter(|b| search.map_or(true, |q| icontains(&b.title, q) || icontains(&b.author, q)))
            .cloned()
            .collect();
        books.sort_by_key(|b| std::cmp::Reverse(b.created_at));
        Ok(books)
    }

    async fn update_book(&self, book: &ShelfBook) -> Result<ShelfBook> {
        let mut state = self.state.write().await;
        if state.shelf_books.values().any(|b| b.isbn == book.isbn && b.id != book.id) {
            return Err(AppError::ValidationError("A book with this ISBN already exists.".to_string()));
        }
        let stored = state
            .shelf_books
            .get_mut(&book.id)
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))?;
        *stored = book.clone();
        Ok(book.clone())
    }

    async fn delete_book(&self, id: Uuid) -> Result<()> {
        self.state.write().await.shelf_books.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BlogRepository for MemoryStore {
    async fn create_post(&self, post: &BlogPost) -> Result<BlogPost> {
        self.state.write().await.blog_posts.insert(post.id, post.clone());
        Ok(post.clone())
    }

    async fn get_post_by_id(&self, id: Uuid) -> Result<Option<BlogPost>> {
        Ok(self.state.read().await.blog_posts.get(&id).cloned())
    }

    async fn list_posts(&self, tag: Option<&str>, search: Option<&str>, limit: u32, offset: u32) -> Result<(Vec<BlogPost>, u64)> {
        let state = self.state.read().await;
        let mut posts: Vec<BlogPost> = state
            .blog_posts
            .values()
            .filter(|p| tag.map_or(true, |t| p.tags.iter().any(|pt| pt == t)))
            .filter(|p| {
                search.map_or(true, |q| {
                    icontains(&p.title, q) || icontains(&p.content, q) || p.tags.iter().any(|t| icontains(t, q))
                })
            })
            .cloned()
            .collect();
        posts.sort_by_key(|p| std::cmp::Reverse(p.published_date));
        let total = posts.len() as u64;
        Ok((paginate(&posts, limit, offset), total))
    }

    async fn list_tags(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        let tags: HashSet<&String> = state.blog_posts.values().flat_map(|p| p.tags.iter()).collect();
        let mut tags: Vec<String> = tags.into_iter().cloned().collect();
        tags.sort();
        Ok(tags)
    }

    async fn update_post(&self, post: &BlogPost) -> Result<BlogPost> {
        let mut state = self.state.write().await;
        let stored = state
            .blog_posts
            .get_mut(&post.id)
            .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;
        *stored = post.clone();
        Ok(post.clone())
    }

    async fn delete_post(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        state.blog_posts.remove(&id);
        state.blog_comments.retain(|_, c| c.post_id != id);
        Ok(())
    }

    async fn create_comment(&self, comment: &BlogComment) -> Result<BlogComment> {
        self.state.write().await.blog_comments.insert(comment.id, comment.clone());
        Ok(comment.clone())
    }

    async fn get_comment_by_id(&self, id: Uuid) -> Result<Option<BlogComment>> {
        Ok(self.state.read().await.blog_comments.get(&id).cloned())
    }

    async fn list_comments(&self, post_id: Uuid) -> Result<Vec<BlogComment>> {
        let state = self.state.read().await;
        let mut comments: Vec<BlogComment> =
            state.blog_comments.values().filter(|c| c.post_id == post_id).cloned().collect();
        comments.sort_by_key(|c| c.created_at);
        Ok(comments)
    }

    async fn update_comment(&self, comment: &BlogComment) -> Result<BlogComment> {
        let mut state = self.state.write().await;
        let stored = state
            .blog_comments
            .get_mut(&comment.id)
            .ok_or_else(|| AppError::NotFound("Comment not found".to_string()))?;
        *stored = comment.clone();
        Ok(comment.clone())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<()> {
        self.state.write().await.blog_comments.remove(&id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn post(author_id: Uuid, title: &str, minutes_ago: i64) -> Post {
        let at = Utc::now() - Duration::minutes(minutes_ago);
        Post { id: Uuid::new_v4(), title: title.to_string(), content: "body".to_string(), author_id, created_at: at, updated_at: at }
    }

    fn user(username: &str, email: &str) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: String::new(),
            first_name: String::new(),
            last_name: String::new(),
            bio: String::new(),
            profile_picture: None,
            is_active: true,
            is_staff: false,
            groups: Vec::new(),
            date_joined: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_emails_unique_ignoring_case() {
        let store = MemoryStore::new();
        UserRepository::create_user(&store, &user("alice", "alice@example.com")).await.unwrap();
        let clash = UserRepository::create_user(&store, &user("bob", "ALICE@example.com")).await;
        assert!(matches!(clash, Err(AppError::ValidationError(_))));

        let mut carol = UserRepository::create_user(&store, &user("carol", "carol@example.com")).await.unwrap();
        carol.email = "Alice@Example.com".to_string();
        assert!(UserRepository::update_user(&store, &carol).await.is_err());

        carol.email = "CAROL@example.com".to_string();
        let updated = UserRepository::update_user(&store, &carol).await.unwrap();
        assert_eq!(updated.email, "CAROL@example.com");
    }

    #[tokio::test]
    async fn test_list_posts_orders_and_filters() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        PostRepository::create_post(&store, &post(alice, "Old Rust news", 30)).await.unwrap();
        PostRepository::create_post(&store, &post(alice, "Fresh take", 5)).await.unwrap();
        PostRepository::create_post(&store, &post(bob, "rust tips", 10)).await.unwrap();

        let query = PostQuery { limit: 10, ..Default::default() };
        let (posts, total) = PostRepository::list_posts(&store, &query).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(posts[0].title, "Fresh take");

        let query = PostQuery { search: Some("RUST".to_string()), limit: 10, ..Default::default() };
        let (posts, total) = PostRepository::list_posts(&store, &query).await.unwrap();
        assert_eq!(total, 2);
        assert_eq!(posts[0].title, "rust tips");

        let query = PostQuery { author_id: Some(bob), limit: 10, ..Default::default() };
        assert_eq!(PostRepository::list_posts(&store, &query).await.unwrap().1, 1);
    }

    #[tokio::test]
    async fn test_delete_post_cascades() {
        let store = MemoryStore::new();
        let author = Uuid::new_v4();
        let p = post(author, "Doomed", 1);
        PostRepository::create_post(&store, &p).await.unwrap();
        let comment = Comment {
            id: Uuid::new_v4(),
            post_id: p.id,
            author_id: author,
            content: "hi".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        CommentRepository::create_comment(&store, &comment).await.unwrap();
        assert!(store.add_like(author, p.id).await.unwrap());

        PostRepository::delete_post(&store, p.id).await.unwrap();
        assert_eq!(store.count_comments_for_post(p.id).await.unwrap(), 0);
        assert_eq!(store.count_likes(p.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_like_and_follow_are_idempotent_edges() {
        let store = MemoryStore::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        assert!(store.add_follow(a, b).await.unwrap());
        assert!(!store.add_follow(a, b).await.unwrap());
        assert_eq!(store.get_following_ids(a).await.unwrap(), vec![b]);
        assert!(store.remove_follow(a, b).await.unwrap());
        assert!(!store.remove_follow(a, b).await.unwrap());

        let post_id = Uuid::new_v4();
        assert!(store.add_like(a, post_id).await.unwrap());
        assert!(!store.add_like(a, post_id).await.unwrap());
        assert_eq!(store.count_likes(post_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_upsert_group_merges_permissions() {
        use crate::models::Permission;
        let store = MemoryStore::new();
        let group = Group { name: "Editors".to_string(), permissions: vec![Permission::CanView] };
        store.upsert_group(&group).await.unwrap();
        let group = Group { name: "Editors".to_string(), permissions: vec![Permission::CanEdit, Permission::CanView] };
        let merged = store.upsert_group(&group).await.unwrap();
        assert_eq!(merged.permissions, vec![Permission::CanView, Permission::CanEdit]);
    }
}
