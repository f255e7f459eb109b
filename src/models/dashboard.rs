//! Home page counters and per-session state

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::book_instance::LoanStatus;

/// Aggregate counts of the catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CatalogCounts {
    pub num_books: i64,
    pub num_instances: i64,
    pub num_instances_available: i64,
    pub num_instances_onloan: i64,
    pub num_instances_reserved: i64,
    pub num_instances_maintenance: i64,
    pub num_authors: i64,
}

impl CatalogCounts {
    /// Builds the counters from per-status copy counts. Statuses missing from
    /// `by_status` count as zero.
    pub fn from_status_counts(
        num_books: i64,
        num_authors: i64,
        by_status: &[(LoanStatus, i64)],
    ) -> Self {
        let mut counts = CatalogCounts {
            num_books,
            num_authors,
            ..Default::default()
        };
        for (status, n) in by_status {
            counts.num_instances += n;
            let slot = match status {
                LoanStatus::Available => &mut counts.num_instances_available,
                LoanStatus::OnLoan => &mut counts.num_instances_onloan,
                LoanStatus::Reserved => &mut counts.num_instances_reserved,
                LoanStatus::Maintenance => &mut counts.num_instances_maintenance,
            };
            *slot += n;
        }
        counts
    }
}

/// State kept per browser session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(default)]
    pub num_visits: i64,
}

/// Home page response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Dashboard {
    #[serde(flatten)]
    pub counts: CatalogCounts,
    /// Visits to the home page in this session before the current one
    pub num_visits: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_counts_fold() {
        let counts = CatalogCounts::from_status_counts(
            4,
            2,
            &[(LoanStatus::Available, 3), (LoanStatus::OnLoan, 2), (LoanStatus::Maintenance, 1)],
        );
        assert_eq!(counts.num_instances, 6);
        assert_eq!(counts.num_instances_available, 3);
        assert_eq!(counts.num_instances_onloan, 2);
        assert_eq!(counts.num_instances_reserved, 0);
        assert_eq!(counts.num_instances_maintenance, 1);
        assert_eq!(counts.num_books, 4);
        assert_eq!(counts.num_authors, 2);
    }

    #[test]
    fn test_empty_catalog() {
        assert_eq!(CatalogCounts::from_status_counts(0, 0, &[]), CatalogCounts::default());
    }
}
