//! Loan management service: renewal, on-loan listings and copy records

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    error::AppResult,
    lifecycle,
    models::book_instance::{
        BookInstance, BookInstanceDetails, BookInstanceForm, InstanceFilter, LoanStatus,
        RenewBookForm,
    },
    repository::instances::BookInstanceStore,
};

/// Renewal form as first shown to the librarian
#[derive(Debug, Serialize, ToSchema)]
pub struct RenewalForm {
    pub book_instance: BookInstanceDetails,
    /// Pre-filled renewal date (3 weeks from today)
    pub renewal_date: NaiveDate,
}

#[derive(Clone)]
pub struct LoansService {
    store: Arc<dyn BookInstanceStore>,
}

impl LoansService {
    pub fn new(store: Arc<dyn BookInstanceStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: Uuid, today: NaiveDate) -> AppResult<BookInstanceDetails> {
        Ok(self.store.get(id).await?.into_details(today))
    }

    pub async fn renewal_form(&self, id: Uuid, today: NaiveDate) -> AppResult<RenewalForm> {
        let row = self.store.get(id).await?;
        Ok(RenewalForm {
            book_instance: row.into_details(today),
            renewal_date: lifecycle::compute_default_renewal_date(today),
        })
    }

    /// Validate the form, move the due date and persist it.
    /// Concurrent renewals of one copy are last-writer-wins.
    pub async fn renew(
        &self,
        id: Uuid,
        form: &RenewBookForm,
        today: NaiveDate,
    ) -> AppResult<BookInstance> {
        let proposed = form.clean(today)?;
        let row = self.store.get(id).await?;

        if row.instance.status != LoanStatus::OnLoan {
            tracing::warn!(
                "Renewing book instance {} with status {}",
                id,
                row.instance.status.label()
            );
        }

        let renewed = lifecycle::renew(&row.instance, proposed, today)?;
        self.store.update_due_back(renewed.id, proposed).await?;

        tracing::info!("Book instance {} renewed until {}", id, proposed);
        Ok(renewed)
    }

    /// Copies on loan to one borrower
    pub async fn borrowed_by(
        &self,
        borrower_id: i32,
        limit: i64,
        offset: i64,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let filter = InstanceFilter {
            status: Some(LoanStatus::OnLoan),
            borrower_id: Some(borrower_id),
        };
        self.list(&filter, limit, offset, today).await
    }

    /// Every copy on loan
    pub async fn all_borrowed(
        &self,
        limit: i64,
        offset: i64,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let filter = InstanceFilter {
            status: Some(LoanStatus::OnLoan),
            borrower_id: None,
        };
        self.list(&filter, limit, offset, today).await
    }

    /// Copies matching `filter`, ascending due date with undated copies last
    pub async fn list(
        &self,
        filter: &InstanceFilter,
        limit: i64,
        offset: i64,
        today: NaiveDate,
    ) -> AppResult<(Vec<BookInstanceDetails>, i64)> {
        let (mut rows, total) = self.store.list(filter, limit, offset).await?;
        rows.sort_by(|a, b| lifecycle::due_back_order(a.instance.due_back, b.instance.due_back));
        let details = rows.into_iter().map(|r| r.into_details(today)).collect();
        Ok((details, total))
    }

    pub async fn list_for_book(
        &self,
        book_id: i32,
        today: NaiveDate,
    ) -> AppResult<Vec<BookInstanceDetails>> {
        let mut rows = self.store.list_for_book(book_id).await?;
        rows.sort_by(|a, b| lifecycle::due_back_order(a.instance.due_back, b.instance.due_back));
        Ok(rows.into_iter().map(|r| r.into_details(today)).collect())
    }

    pub async fn create(&self, form: &BookInstanceForm) -> AppResult<BookInstance> {
        form.clean()?;
        let created = self.store.create(form).await?;
        tracing::info!("Book instance {} created ({})", created.id, created.status.label());
        Ok(created)
    }

    pub async fn update(&self, id: Uuid, form: &BookInstanceForm) -> AppResult<BookInstance> {
        form.clean()?;
        let updated = self.store.update(id, form).await?;
        tracing::info!("Book instance {} updated ({})", id, updated.status.label());
        Ok(updated)
    }

    pub async fn count_by_status(&self) -> AppResult<Vec<(LoanStatus, i64)>> {
        self.store.count_by_status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::book_instance::BookInstanceRow,
        repository::instances::MockBookInstanceStore,
    };
    use mockall::predicate::eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn row(id: Uuid, due_back: Option<NaiveDate>, status: LoanStatus) -> BookInstanceRow {
        BookInstanceRow {
            instance: BookInstance {
                id,
                book_id: Some(1),
                imprint: "Ace Books, 1965".to_string(),
                due_back,
                borrower_id: Some(2),
                status,
            },
            book_title: Some("Dune".to_string()),
            borrower_username: Some("paul".to_string()),
        }
    }

    #[tokio::test]
    async fn test_renew_persists_due_date() {
        let id = Uuid::new_v4();
        let today = date(2024, 1, 10);
        let mut store = MockBookInstanceStore::new();
        store
            .expect_get()
            .with(eq(id))
            .returning(move |id| Ok(row(id, Some(date(2024, 1, 12)), LoanStatus::OnLoan)));
        store
            .expect_update_due_back()
            .with(eq(id), eq(date(2024, 1, 31)))
            .times(1)
            .returning(|_, _| Ok(()));

        let service = LoansService::new(Arc::new(store));
        let form = RenewBookForm::new(date(2024, 1, 31));
        let renewed = service.renew(id, &form, today).await.unwrap();
        assert_eq!(renewed.due_back, Some(date(2024, 1, 31)));
        assert_eq!(renewed.status, LoanStatus::OnLoan);
    }

    #[tokio::test]
    async fn test_invalid_renewal_is_not_persisted() {
        let id = Uuid::new_v4();
        let today = date(2024, 1, 10);
        let mut store = MockBookInstanceStore::new();
        store.expect_get().never();
        store.expect_update_due_back().never();

        let service = LoansService::new(Arc::new(store));
        for proposed in [date(2024, 1, 9), date(2024, 2, 10)] {
            let form = RenewBookForm::new(proposed);
            match service.renew(id, &form, today).await {
                Err(AppError::Validation { fields, .. }) => {
                    assert!(fields.contains_key("renewal_date"))
                }
                other => panic!("unexpected result: {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_renew_unknown_copy_is_not_found() {
        let mut store = MockBookInstanceStore::new();
        store
            .expect_get()
            .returning(|id| Err(AppError::NotFound(format!("Book instance {} not found", id))));

        let service = LoansService::new(Arc::new(store));
        let today = date(2024, 1, 10);
        let form = RenewBookForm::new(today);
        let result = service.renew(Uuid::new_v4(), &form, today).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_renewal_form_defaults_to_three_weeks() {
        let mut store = MockBookInstanceStore::new();
        store
            .expect_get()
            .returning(|id| Ok(row(id, Some(date(2024, 1, 1)), LoanStatus::OnLoan)));

        let service = LoansService::new(Arc::new(store));
        let form = service
            .renewal_form(Uuid::new_v4(), date(2024, 1, 10))
            .await
            .unwrap();
        assert_eq!(form.renewal_date, date(2024, 1, 31));
        assert!(form.book_instance.is_overdue);
    }

    #[tokio::test]
    async fn test_borrowed_listing_filters_and_orders() {
        let mut store = MockBookInstanceStore::new();
        store
            .expect_list()
            .withf(|filter, limit, offset| {
                filter.status == Some(LoanStatus::OnLoan)
                    && filter.borrower_id == Some(2)
                    && *limit == 10
                    && *offset == 0
            })
            .returning(|_, _, _| {
                Ok((
                    vec![
                        row(Uuid::new_v4(), None, LoanStatus::OnLoan),
                        row(Uuid::new_v4(), Some(date(2024, 3, 1)), LoanStatus::OnLoan),
                        row(Uuid::new_v4(), Some(date(2024, 1, 1)), LoanStatus::OnLoan),
                        row(Uuid::new_v4(), Some(date(2024, 1, 1)), LoanStatus::OnLoan),
                    ],
                    4,
                ))
            });

        let service = LoansService::new(Arc::new(store));
        let (copies, total) = service
            .borrowed_by(2, 10, 0, date(2024, 2, 1))
            .await
            .unwrap();

        assert_eq!(total, 4);
        let due: Vec<_> = copies.iter().map(|c| c.due_back).collect();
        assert_eq!(
            due,
            vec![
                Some(date(2024, 1, 1)),
                Some(date(2024, 1, 1)),
                Some(date(2024, 3, 1)),
                None
            ]
        );
        assert!(copies[0].is_overdue);
        assert!(!copies[2].is_overdue);
    }

    #[tokio::test]
    async fn test_create_rejects_inconsistent_loan() {
        let mut store = MockBookInstanceStore::new();
        store.expect_create().never();

        let service = LoansService::new(Arc::new(store));
        let form = BookInstanceForm {
            book_id: Some(1),
            imprint: "Ace Books".to_string(),
            due_back: None,
            borrower_id: None,
            status: LoanStatus::OnLoan,
        };
        assert!(matches!(
            service.create(&form).await,
            Err(AppError::Validation { .. })
        ));
    }
}
