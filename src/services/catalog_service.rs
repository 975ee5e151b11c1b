use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::db::repository::CatalogRepository;
use crate::models::catalog::{
    validate_publication_year, AssignLibrarianRequest, AuthorFilter, AuthorResponse, BookFilter, BookRequest,
    CreateAuthorRequest, CreateLibraryRequest, LibraryResponse, PatchBookRequest,
};
use crate::models::{Author, Book, Librarian, Library};
use crate::{AppError, Result};

pub struct CatalogService {
    catalog_repo: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    pub fn new(catalog_repo: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog_repo }
    }

    async fn require_book(&self, book_id: Uuid) -> Result<Book> {
        self.catalog_repo
            .get_book_by_id(book_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Book not found".to_string()))
    }

    async fn require_author(&self, author_id: Uuid) -> Result<Author> {
        self.catalog_repo
            .get_author_by_id(author_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Author not found".to_string()))
    }

    async fn require_library(&self, library_id: Uuid) -> Result<Library> {
        self.catalog_repo
            .get_library_by_id(library_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Library not found".to_string()))
    }

    /// Field checks shared by create, PUT and PATCH once the final values are known.
    async fn check_book(&self, book: &Book) -> Result<()> {
        validate_publication_year(book.publication_year)?;
        if self.catalog_repo.get_author_by_id(book.author_id).await?.is_none() {
            return Err(AppError::ValidationError(format!(
                "Invalid pk \"{}\" - object does not exist.",
                book.author_id
            )));
        }
        if let Some(existing) = self
            .catalog_repo
            .find_duplicate_book(&book.title, book.author_id, book.publication_year)
            .await?
        {
            if existing.id != book.id {
                return Err(AppError::ValidationError(
                    "The fields title, author, publication_year must make a unique set.".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub async fn list_books(&self, filter: &BookFilter) -> Result<Vec<Book>> {
        let books = self.catalog_repo.list_books(filter).await?;
        tracing::debug!("📚 CATALOG: {} books match {:?}", books.len(), filter);
        Ok(books)
    }

    pub async fn get_book(&self, book_id: Uuid) -> Result<Book> {
        self.require_book(book_id).await
    }

    pub async fn create_book(&self, request: BookRequest) -> Result<Book> {
        request.validate()?;
        let book = Book {
            id: Uuid::new_v4(),
            title: request.title,
            publication_year: request.publication_year,
            author_id: request.author,
        };
        self.check_book(&book).await?;
        let created = self.catalog_repo.create_book(&book).await?;
        tracing::info!("📚 CATALOG: Created book '{}' ({})", created.title, created.id);
        Ok(created)
    }

    pub async fn update_book(&self, book_id: Uuid, request: BookRequest) -> Result<Book> {
        self.patch_book(
            book_id,
            PatchBookRequest {
                title: Some(request.title),
                publication_year: Some(request.publication_year),
                author: Some(request.author),
            },
        )
        .await
    }

    pub async fn patch_book(&self, book_id: Uuid, request: PatchBookRequest) -> Result<Book> {
        request.validate()?;
        let mut book = self.require_book(book_id).await?;
        if let Some(title) = request.title {
            book.title = title;
        }
        if let Some(year) = request.publication_year {
            book.publication_year = year;
        }
        if let Some(author) = request.author {
            book.author_id = author;
        }
        self.check_book(&book).await?;
        let updated = self.catalog_repo.update_book(&book).await?;
        tracing::info!("📚 CATALOG: Updated book {}", book_id);
        Ok(updated)
    }

    pub async fn delete_book(&self, book_id: Uuid) -> Result<()> {
        self.require_book(book_id).await?;
        self.catalog_repo.delete_book(book_id).await?;
        tracing::info!("📚 CATALOG: Deleted book {}", book_id);
        Ok(())
    }

    pub async fn list_authors(&self, filter: &AuthorFilter) -> Result<Vec<AuthorResponse>> {
        let authors = self.catalog_repo.list_authors(filter).await?;
        let mut responses = Vec::with_capacity(authors.len());
        for author in authors {
            let books = self.catalog_repo.list_books_by_author(author.id).await?;
            responses.push(AuthorResponse::new(author, books));
        }
        Ok(responses)
    }

    pub async fn get_author(&self, author_id: Uuid) -> Result<AuthorResponse> {
        let author = self.require_author(author_id).await?;
        let books = self.catalog_repo.list_books_by_author(author.id).await?;
        Ok(AuthorResponse::new(author, books))
    }

    pub async fn create_author(&self, request: CreateAuthorRequest) -> Result<AuthorResponse> {
        request.validate()?;
        let author = Author { id: Uuid::new_v4(), name: request.name };
        let created = self.catalog_repo.create_author(&author).await?;
        tracing::info!("✍️ CATALOG: Created author '{}'", created.name);
        Ok(AuthorResponse::new(created, Vec::new()))
    }

    async fn library_response(&self, library: Library) -> Result<LibraryResponse> {
        let books = self.catalog_repo.get_books_by_ids(&library.book_ids).await?;
        let librarian = self.catalog_repo.get_librarian_for_library(library.id).await?;
        Ok(LibraryResponse { id: library.id, name: library.name, books, librarian })
    }

    pub async fn list_libraries(&self) -> Result<Vec<LibraryResponse>> {
        let libraries = self.catalog_repo.list_libraries().await?;
        let mut responses = Vec::with_capacity(libraries.len());
        for library in libraries {
            responses.push(self.library_response(library).await?);
        }
        Ok(responses)
    }

    pub async fn get_library(&self, library_id: Uuid) -> Result<LibraryResponse> {
        let library = self.require_library(library_id).await?;
        self.library_response(library).await
    }

    pub async fn create_library(&self, request: CreateLibraryRequest) -> Result<LibraryResponse> {
        request.validate()?;
        let name = request.name;
        if self.catalog_repo.get_library_by_name(&name).await?.is_some() {
            return Err(AppError::ValidationError("A library with that name already exists.".to_string()));
        }
        let mut book_ids: Vec<Uuid> = Vec::new();
        for book_id in request.books {
            self.catalog_repo
                .get_book_by_id(book_id)
                .await?
                .ok_or_else(|| AppError::ValidationError(format!("Invalid pk \"{}\" - object does not exist.", book_id)))?;
            if !book_ids.contains(&book_id) {
                book_ids.push(book_id);
            }
        }
        let library = Library { id: Uuid::new_v4(), name, book_ids };
        let created = self.catalog_repo.create_library(&library).await?;
        tracing::info!("🏛️ CATALOG: Created library '{}'", created.name);
        self.library_response(created).await
    }

    pub async fn add_book_to_library(&self, library_id: Uuid, book_id: Uuid) -> Result<LibraryResponse> {
        self.require_library(library_id).await?;
        if self.catalog_repo.get_book_by_id(book_id).await?.is_none() {
            return Err(AppError::ValidationError(format!("Invalid pk \"{}\" - object does not exist.", book_id)));
        }
        self.catalog_repo.add_book_to_library(library_id, book_id).await?;
        self.get_library(library_id).await
    }

    /// Replaces any librarian already assigned to the library.
    pub async fn assign_librarian(&self, library_id: Uuid, request: AssignLibrarianRequest) -> Result<Librarian> {
        request.validate()?;
        self.require_library(library_id).await?;
        let librarian = Librarian { id: Uuid::new_v4(), name: request.name, library_id };
        let assigned = self.catalog_repo.set_librarian(&librarian).await?;
        tracing::info!("🏛️ CATALOG: {} is now librarian of {}", assigned.name, library_id);
        Ok(assigned)
    }

    pub async fn books_by_author(&self, author_name: &str) -> Result<Vec<Book>> {
        let author = self
            .catalog_repo
            .get_author_by_name(author_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Author '{}' not found", author_name)))?;
        self.catalog_repo.list_books_by_author(author.id).await
    }

    pub async fn books_in_library(&self, library_name: &str) -> Result<Vec<Book>> {
        let library = self
            .catalog_repo
            .get_library_by_name(library_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library '{}' not found", library_name)))?;
        self.catalog_repo.get_books_by_ids(&library.book_ids).await
    }

    pub async fn librarian_for_library(&self, library_name: &str) -> Result<Librarian> {
        let library = self
            .catalog_repo
            .get_library_by_name(library_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library '{}' not found", library_name)))?;
        self.catalog_repo
            .get_librarian_for_library(library.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Library '{}' has no librarian", library_name)))
    }

    /// Loads a small demo catalog when it is empty.
    pub async fn seed_sample_data(&self) -> Result<()> {
        if !self.catalog_repo.list_authors(&AuthorFilter::default()).await?.is_empty() {
            tracing::info!("🌱 SEED: Catalog already has data, skipping");
            return Ok(());
        }

        let sample: [(&str, &[(&str, i32)]); 3] = [
            ("Chinua Achebe", &[("Things Fall Apart", 1958), ("Arrow of God", 1964)]),
            ("Ursula K. Le Guin", &[("A Wizard of Earthsea", 1968), ("The Dispossessed", 1974)]),
            ("Toni Morrison", &[("Beloved", 1987)]),
        ];

        let mut book_ids = Vec::new();
        for (name, books) in sample {
            let author = self.create_author(CreateAuthorRequest { name: name.to_string() }).await?;
            for (title, year) in books {
                let book = self
                    .create_book(BookRequest { title: title.to_string(), publication_year: *year, author: author.id })
                    .await?;
                book_ids.push(book.id);
            }
        }

        let library = self
            .create_library(CreateLibraryRequest { name: "Central Library".to_string(), books: book_ids })
            .await?;
        self.assign_librarian(library.id, AssignLibrarianRequest { name: "Amina Yusuf".to_string() })
            .await?;
        tracing::info!("🌱 SEED: Sample catalog loaded");
        Ok(())
    }
}
