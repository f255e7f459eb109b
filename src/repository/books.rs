//! Books repository

use sqlx::{Pool, Postgres, Transaction};

use crate::{
    error::{AppError, AppResult},
    models::{
        book::{Book, BookForm, BookSummaryRow},
        genre::Genre,
    },
};

const SUMMARY_SELECT: &str = r#"
    SELECT b.id, b.title, b.author_id,
           a.first_name AS author_first_name, a.last_name AS author_last_name,
           COALESCE(
               array_agg(g.name::text ORDER BY g.id) FILTER (WHERE g.id IS NOT NULL),
               '{}'
           ) AS genre_names
    FROM books b
    LEFT JOIN authors a ON a.id = b.author_id
    LEFT JOIN book_genres bg ON bg.book_id = b.id
    LEFT JOIN genres g ON g.id = bg.genre_id
"#;

#[derive(Clone)]
pub struct BooksRepository {
    pool: Pool<Postgres>,
}

impl BooksRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Get book by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<Book> {
        sqlx::query_as::<_, Book>("SELECT * FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    /// One page of books ordered by title, with the total count
    pub async fn list(&self, limit: i64, offset: i64) -> AppResult<(Vec<BookSummaryRow>, i64)> {
        let total = self.count().await?;

        let query = format!(
            "{} GROUP BY b.id, a.id ORDER BY b.title, b.id LIMIT $1 OFFSET $2",
            SUMMARY_SELECT
        );
        let rows = sqlx::query_as::<_, BookSummaryRow>(&query)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    /// Books attributed to an author
    pub async fn list_by_author(&self, author_id: i32) -> AppResult<Vec<BookSummaryRow>> {
        let query = format!(
            "{} WHERE b.author_id = $1 GROUP BY b.id, a.id ORDER BY b.title, b.id",
            SUMMARY_SELECT
        );
        let rows = sqlx::query_as::<_, BookSummaryRow>(&query)
            .bind(author_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn genres_of(&self, book_id: i32) -> AppResult<Vec<Genre>> {
        let genres = sqlx::query_as::<_, Genre>(
            r#"
            SELECT g.id, g.name
            FROM genres g
            JOIN book_genres bg ON bg.genre_id = g.id
            WHERE bg.book_id = $1
            ORDER BY g.id
            "#,
        )
        .bind(book_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(genres)
    }

    pub async fn count(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Insert a book and its genre links in one transaction
    pub async fn create(&self, form: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            INSERT INTO books (title, author_id, summary, isbn, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(&form.title)
        .bind(form.author_id)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(&form.image)
        .fetch_one(&mut *tx)
        .await?;

        Self::link_genres(&mut tx, book.id, &form.genre_ids).await?;
        tx.commit().await?;

        Ok(book)
    }

    /// Replace a book's fields and genre links
    pub async fn update(&self, id: i32, form: &BookForm) -> AppResult<Book> {
        let mut tx = self.pool.begin().await?;

        let book = sqlx::query_as::<_, Book>(
            r#"
            UPDATE books
            SET title = $1, author_id = $2, summary = $3, isbn = $4, image = $5
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(&form.title)
        .bind(form.author_id)
        .bind(&form.summary)
        .bind(&form.isbn)
        .bind(&form.image)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))?;

        sqlx::query("DELETE FROM book_genres WHERE book_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        Self::link_genres(&mut tx, id, &form.genre_ids).await?;
        tx.commit().await?;

        Ok(book)
    }

    /// Delete a book; its copies stay in the catalog without a book
    pub async fn delete(&self, id: i32) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }
        Ok(())
    }

    async fn link_genres(
        tx: &mut Transaction<'_, Postgres>,
        book_id: i32,
        genre_ids: &[i32],
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO book_genres (book_id, genre_id)
            SELECT $1, UNNEST($2::int4[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(book_id)
        .bind(genre_ids)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
