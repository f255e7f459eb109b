//! Home page: catalog counters and the session visit counter

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::dashboard::{CatalogCounts, Dashboard, SessionData},
    repository::Repository,
};

use super::{loans::LoansService, sessions::SessionStore};

/// Count the current visit. Returns the number of earlier visits together
/// with the state to persist.
pub fn record_visit(session: SessionData) -> (i64, SessionData) {
    let previous = session.num_visits;
    (
        previous,
        SessionData {
            num_visits: previous + 1,
        },
    )
}

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
    loans: LoansService,
    sessions: Arc<dyn SessionStore>,
}

impl DashboardService {
    pub fn new(
        repository: Repository,
        loans: LoansService,
        sessions: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            repository,
            loans,
            sessions,
        }
    }

    pub async fn counts(&self) -> AppResult<CatalogCounts> {
        let num_books = self.repository.books.count().await?;
        let num_authors = self.repository.authors.count().await?;
        let by_status = self.loans.count_by_status().await?;
        Ok(CatalogCounts::from_status_counts(
            num_books,
            num_authors,
            &by_status,
        ))
    }

    /// Counters for the home page, recording one visit in session `session_id`
    pub async fn visit(&self, session_id: &str) -> AppResult<Dashboard> {
        let counts = self.counts().await?;

        let session = self.sessions.load(session_id).await?;
        let (num_visits, session) = record_visit(session);
        self.sessions.save(session_id, &session).await?;

        Ok(Dashboard { counts, num_visits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_visit_counts_from_zero() {
        let (seen, session) = record_visit(SessionData::default());
        assert_eq!(seen, 0);
        assert_eq!(session.num_visits, 1);

        let (seen, session) = record_visit(session);
        assert_eq!(seen, 1);
        assert_eq!(session.num_visits, 2);
    }
}
