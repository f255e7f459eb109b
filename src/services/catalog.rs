//! Catalog service: genres, authors and books

use chrono::NaiveDate;
use validator::Validate;

use crate::{
    error::{AppError, AppResult},
    models::{
        author::{Author, AuthorDetails, AuthorForm},
        book::{display_genre, Book, BookDetails, BookForm, BookSummary},
        genre::{Genre, GenreForm},
    },
    repository::Repository,
};

use super::loans::LoansService;

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    loans: LoansService,
}

impl CatalogService {
    pub fn new(repository: Repository, loans: LoansService) -> Self {
        Self { repository, loans }
    }

    // =========================================================================
    // GENRES
    // =========================================================================

    pub async fn list_genres(&self) -> AppResult<Vec<Genre>> {
        self.repository.genres.list().await
    }

    pub async fn create_genre(&self, form: &GenreForm) -> AppResult<Genre> {
        form.validate()?;
        let genre = self.repository.genres.create(form).await?;
        tracing::info!("Genre {} created", genre.name);
        Ok(genre)
    }

    // =========================================================================
    // AUTHORS
    // =========================================================================

    pub async fn list_authors(&self, limit: i64, offset: i64) -> AppResult<(Vec<Author>, i64)> {
        self.repository.authors.list(limit, offset).await
    }

    /// Author with the books attributed to them
    pub async fn get_author(&self, id: i32) -> AppResult<AuthorDetails> {
        let author = self.repository.authors.get_by_id(id).await?;
        let books = self
            .repository
            .books
            .list_by_author(id)
            .await?
            .into_iter()
            .map(BookSummary::from)
            .collect();

        Ok(AuthorDetails {
            display_name: author.display_name(),
            author,
            books,
        })
    }

    pub async fn create_author(&self, form: &AuthorForm) -> AppResult<Author> {
        form.clean()?;
        let author = self.repository.authors.create(form).await?;
        tracing::info!("Author {} created: {}", author.id, author.display_name());
        Ok(author)
    }

    pub async fn update_author(&self, id: i32, form: &AuthorForm) -> AppResult<Author> {
        form.clean()?;
        self.repository.authors.update(id, form).await
    }

    pub async fn delete_author(&self, id: i32) -> AppResult<()> {
        self.repository.authors.delete(id).await?;
        tracing::info!("Author {} deleted", id);
        Ok(())
    }

    // =========================================================================
    // BOOKS
    // =========================================================================

    pub async fn list_books(&self, limit: i64, offset: i64) -> AppResult<(Vec<BookSummary>, i64)> {
        let (rows, total) = self.repository.books.list(limit, offset).await?;
        Ok((rows.into_iter().map(BookSummary::from).collect(), total))
    }

    /// Book with author, genres and copies; overdue flags are relative to `today`
    pub async fn get_book(&self, id: i32, today: NaiveDate) -> AppResult<BookDetails> {
        let book = self.repository.books.get_by_id(id).await?;

        let author = match book.author_id {
            Some(author_id) => Some(self.repository.authors.get_by_id(author_id).await?),
            None => None,
        };
        let genres = self.repository.books.genres_of(id).await?;
        let names: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
        let display_genre = display_genre(&names);
        let copies = self.loans.list_for_book(id, today).await?;

        Ok(BookDetails {
            book,
            author,
            genres,
            display_genre,
            copies,
        })
    }

    pub async fn create_book(&self, form: &BookForm) -> AppResult<Book> {
        form.validate()?;
        self.check_references(form).await?;
        let book = self.repository.books.create(form).await?;
        tracing::info!("Book {} created: {}", book.id, book.title);
        Ok(book)
    }

    pub async fn update_book(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        form.validate()?;
        self.check_references(form).await?;
        self.repository.books.update(id, form).await
    }

    pub async fn delete_book(&self, id: i32) -> AppResult<()> {
        self.repository.books.delete(id).await?;
        tracing::info!("Book {} deleted", id);
        Ok(())
    }

    /// Referenced author and genres must exist
    async fn check_references(&self, form: &BookForm) -> AppResult<()> {
        if let Some(author_id) = form.author_id {
            self.repository.authors.get_by_id(author_id).await?;
        }

        let missing = self.repository.genres.missing(&form.genre_ids).await?;
        if !missing.is_empty() {
            let ids: Vec<String> = missing.iter().map(|id| id.to_string()).collect();
            return Err(AppError::NotFound(format!(
                "Genre(s) {} not found",
                ids.join(", ")
            )));
        }
        Ok(())
    }
}
