//! Book instances (copies) repository

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{Pool, Postgres, Row};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{
        BookInstance, BookInstanceForm, BookInstanceRow, InstanceFilter, LoanStatus,
    },
};

use super::is_foreign_key_violation;

const INSTANCE_SELECT: &str = r#"
    SELECT bi.id, bi.book_id, bi.imprint, bi.due_back, bi.borrower_id, bi.status,
           b.title AS book_title, u.username AS borrower_username
    FROM book_instances bi
    LEFT JOIN books b ON b.id = bi.book_id
    LEFT JOIN users u ON u.id = bi.borrower_id
"#;

/// Storage of book copies, the seam the loan service works against
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BookInstanceStore: Send + Sync + 'static {
    /// Copy by id, with its book title and borrower name
    async fn get(&self, id: Uuid) -> AppResult<BookInstanceRow>;

    /// One page of copies matching `filter`, ordered by due date (missing
    /// dates last), with the total number of matches
    async fn list(
        &self,
        filter: &InstanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<BookInstanceRow>, i64)>;

    /// Every copy of a book
    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstanceRow>>;

    async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance>;

    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance>;

    /// Single-statement write of the due date only
    async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()>;

    /// Number of copies per status; statuses without copies are omitted
    async fn count_by_status(&self) -> AppResult<Vec<(LoanStatus, i64)>>;
}

#[derive(Clone)]
pub struct BookInstancesRepository {
    pool: Pool<Postgres>,
}

impl BookInstancesRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn where_clause(filter: &InstanceFilter) -> String {
        let mut conditions = Vec::new();
        let mut idx = 1;

        if filter.status.is_some() {
            conditions.push(format!("bi.status = ${}", idx));
            idx += 1;
        }
        if filter.borrower_id.is_some() {
            conditions.push(format!("bi.borrower_id = ${}", idx));
        }

        if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        }
    }

    fn not_found(id: Uuid) -> AppError {
        AppError::NotFound(format!("Book instance {} not found", id))
    }
}

#[async_trait]
impl BookInstanceStore for BookInstancesRepository {
    async fn get(&self, id: Uuid) -> AppResult<BookInstanceRow> {
        let query = format!("{} WHERE bi.id = $1", INSTANCE_SELECT);
        sqlx::query_as::<_, BookInstanceRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Self::not_found(id))
    }

    async fn list(
        &self,
        filter: &InstanceFilter,
        limit: i64,
        offset: i64,
    ) -> AppResult<(Vec<BookInstanceRow>, i64)> {
        let where_clause = Self::where_clause(filter);
        let bound = [filter.status.is_some(), filter.borrower_id.is_some()]
            .iter()
            .filter(|b| **b)
            .count();

        let count_query = format!("SELECT COUNT(*) FROM book_instances bi {}", where_clause);
        let mut count_builder = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(status) = filter.status {
            count_builder = count_builder.bind(status);
        }
        if let Some(borrower_id) = filter.borrower_id {
            count_builder = count_builder.bind(borrower_id);
        }
        let total = count_builder.fetch_one(&self.pool).await?;

        let query = format!(
            "{} {} ORDER BY bi.due_back ASC NULLS LAST, bi.id LIMIT ${} OFFSET ${}",
            INSTANCE_SELECT,
            where_clause,
            bound + 1,
            bound + 2
        );
        let mut builder = sqlx::query_as::<_, BookInstanceRow>(&query);
        if let Some(status) = filter.status {
            builder = builder.bind(status);
        }
        if let Some(borrower_id) = filter.borrower_id {
            builder = builder.bind(borrower_id);
        }
        let rows = builder
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok((rows, total))
    }

    async fn list_for_book(&self, book_id: i32) -> AppResult<Vec<BookInstanceRow>> {
        let query = format!(
            "{} WHERE bi.book_id = $1 ORDER BY bi.due_back ASC NULLS LAST, bi.id",
            INSTANCE_SELECT
        );
        let rows = sqlx::query_as::<_, BookInstanceRow>(&query)
            .bind(book_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance> {
        let instance = sqlx::query_as::<_, BookInstance>(
            r#"
            INSERT INTO book_instances (id, book_id, imprint, due_back, borrower_id, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, book_id, imprint, due_back, borrower_id, status
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(form.book_id)
        .bind(&form.imprint)
        .bind(form.due_back)
        .bind(form.borrower_id)
        .bind(form.status)
        .fetch_one(&self.pool)
        .await
        .map_err(unknown_reference)?;
        Ok(instance)
    }

    async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        sqlx::query_as::<_, BookInstance>(
            r#"
            UPDATE book_instances
            SET book_id = $1, imprint = $2, due_back = $3, borrower_id = $4, status = $5
            WHERE id = $6
            RETURNING id, book_id, imprint, due_back, borrower_id, status
            "#,
        )
        .bind(form.book_id)
        .bind(&form.imprint)
        .bind(form.due_back)
        .bind(form.borrower_id)
        .bind(form.status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unknown_reference)?
        .ok_or_else(|| Self::not_found(id))
    }

    async fn update_due_back(&self, id: Uuid, due_back: NaiveDate) -> AppResult<()> {
        let result = sqlx::query("UPDATE book_instances SET due_back = $1 WHERE id = $2")
            .bind(due_back)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn count_by_status(&self) -> AppResult<Vec<(LoanStatus, i64)>> {
        let rows = sqlx::query(
            "SELECT status, COUNT(*) AS n FROM book_instances GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> AppResult<(LoanStatus, i64)> {
                Ok((row.try_get("status")?, row.try_get("n")?))
            })
            .collect()
    }
}

fn unknown_reference(err: sqlx::Error) -> AppError {
    if is_foreign_key_violation(&err) {
        AppError::BadRequest("Unknown book or borrower".to_string())
    } else {
        err.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_where_clause_numbering() {
        assert_eq!(BookInstancesRepository::where_clause(&InstanceFilter::default()), "");
        assert_eq!(
            BookInstancesRepository::where_clause(&InstanceFilter {
                status: Some(LoanStatus::OnLoan),
                borrower_id: None,
            }),
            "WHERE bi.status = $1"
        );
        assert_eq!(
            BookInstancesRepository::where_clause(&InstanceFilter {
                status: Some(LoanStatus::OnLoan),
                borrower_id: Some(3),
            }),
            "WHERE bi.status = $1 AND bi.borrower_id = $2"
        );
    }
}
