//! Authors, books and libraries of the catalog API.

use chrono::{Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Author {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub publication_year: i32,
    /// Serialized as `author`, the referenced author's id.
    #[serde(rename = "author")]
    pub author_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Library {
    pub id: Uuid,
    pub name: String,
    pub book_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Librarian {
    pub id: Uuid,
    pub name: String,
    pub library_id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAuthorRequest {
    #[validate(length(min = 1, max = 100))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct BookRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub title: String,
    pub publication_year: i32,
    pub author: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct PatchBookRequest {
    #[validate(length(min = 1, max = 200))]
    #[serde(default, deserialize_with = "crate::models::trimmed_opt")]
    pub title: Option<String>,
    pub publication_year: Option<i32>,
    pub author: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateLibraryRequest {
    #[validate(length(min = 1, max = 100))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub name: String,
    #[serde(default)]
    pub books: Vec<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignLibrarianRequest {
    #[validate(length(min = 1, max = 100))]
    #[serde(deserialize_with = "crate::models::trimmed")]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddLibraryBookRequest {
    pub book: Uuid,
}

/// Book list filters; every field is optional and combined with AND.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookFilter {
    pub title: Option<String>,
    pub author: Option<Uuid>,
    pub author_name: Option<String>,
    pub publication_year: Option<i32>,
    pub publication_year_min: Option<i32>,
    pub publication_year_max: Option<i32>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthorFilter {
    pub name: Option<String>,
    pub min_books: Option<usize>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookOrderField {
    Title,
    PublicationYear,
    AuthorName,
    Id,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookOrdering {
    pub field: BookOrderField,
    pub descending: bool,
}

impl Default for BookOrdering {
    fn default() -> Self {
        Self { field: BookOrderField::Title, descending: false }
    }
}

impl BookOrdering {
    /// `title`, `publication_year`, `author__name`, `id`; `-` prefix for descending.
    /// Unknown fields fall back to the default ordering.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw.map(str::trim).filter(|r| !r.is_empty()) else {
            return Self::default();
        };
        let (descending, name) = match raw.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, raw),
        };
        let field = match name {
            "title" => BookOrderField::Title,
            "publication_year" => BookOrderField::PublicationYear,
            "author__name" => BookOrderField::AuthorName,
            "id" => BookOrderField::Id,
            _ => return Self::default(),
        };
        Self { field, descending }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorOrdering {
    pub by_id: bool,
    pub descending: bool,
}

impl AuthorOrdering {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("id") => Self { by_id: true, descending: false },
            Some("-id") => Self { by_id: true, descending: true },
            Some("-name") => Self { by_id: false, descending: true },
            _ => Self { by_id: false, descending: false },
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
pub struct YearRange {
    pub earliest: i32,
    pub latest: i32,
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: Uuid,
    pub name: String,
    pub books: Vec<Book>,
    pub books_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publication_year_range: Option<YearRange>,
}

impl AuthorResponse {
    pub fn new(author: Author, books: Vec<Book>) -> Self {
        let publication_year_range = books
            .iter()
            .map(|b| b.publication_year)
            .fold(None, |range: Option<YearRange>, year| match range {
                None => Some(YearRange { earliest: year, latest: year }),
                Some(r) => Some(YearRange { earliest: r.earliest.min(year), latest: r.latest.max(year) }),
            });
        Self {
            id: author.id,
            name: author.name,
            books_count: books.len(),
            books,
            publication_year_range,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LibraryResponse {
    pub id: Uuid,
    pub name: String,
    pub books: Vec<Book>,
    pub librarian: Option<Librarian>,
}

pub fn validate_publication_year(year: i32) -> Result<()> {
    let current_year = Utc::now().year();
    if year > current_year {
        return Err(AppError::ValidationError(format!(
            "Publication year cannot be in the future. Current year is {}.",
            current_year
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_future_year_rejected() {
        let next_year = Utc::now().year() + 1;
        assert!(validate_publication_year(next_year).is_err());
        assert!(validate_publication_year(1999).is_ok());
    }

    #[test]
    fn test_book_ordering_parse() {
        let ordering = BookOrdering::parse(Some("-publication_year"));
        assert_eq!(ordering.field, BookOrderField::PublicationYear);
        assert!(ordering.descending);
        assert_eq!(BookOrdering::parse(Some("author__name")).field, BookOrderField::AuthorName);
        assert_eq!(BookOrdering::parse(Some("bogus")), BookOrdering::default());
    }

    #[test]
    fn test_author_response_year_range() {
        let author = Author { id: Uuid::new_v4(), name: "Ann".to_string() };
        let books = [1990, 1975, 2004]
            .into_iter()
            .map(|year| Book { id: Uuid::new_v4(), title: format!("B{}", year), publication_year: year, author_id: author.id })
            .collect();
        let response = AuthorResponse::new(author, books);
        assert_eq!(response.books_count, 3);
        assert_eq!(response.publication_year_range, Some(YearRange { earliest: 1975, latest: 2004 }));
    }

    #[test]
    fn test_author_without_books_has_no_range() {
        let author = Author { id: Uuid::new_v4(), name: "Solo".to_string() };
        let response = AuthorResponse::new(author, vec![]);
        assert_eq!(response.books_count, 0);
        assert!(response.publication_year_range.is_none());
    }
}
