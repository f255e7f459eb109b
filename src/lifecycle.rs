//! Loan lifecycle rules: overdue computation and renewal of a copy.
//!
//! Everything here is pure. Callers pass `today` explicitly and persist the
//! returned instance themselves.

use std::cmp::Ordering;

use chrono::{Duration, NaiveDate};
use thiserror::Error;

use crate::models::book_instance::BookInstance;

/// Renewal proposed to the librarian by default
pub const DEFAULT_RENEWAL_WEEKS: i64 = 3;
/// Furthest a renewal may push the due date
pub const MAX_RENEWAL_WEEKS: i64 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewalErrorKind {
    InvalidRenewalDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct RenewalError {
    pub kind: RenewalErrorKind,
    pub reason: &'static str,
}

impl RenewalError {
    fn invalid_date(reason: &'static str) -> Self {
        Self {
            kind: RenewalErrorKind::InvalidRenewalDate,
            reason,
        }
    }
}

pub fn compute_default_renewal_date(today: NaiveDate) -> NaiveDate {
    today + Duration::weeks(DEFAULT_RENEWAL_WEEKS)
}

/// A copy is overdue once `today` is past its due date. Copies without a due
/// date never are.
pub fn is_overdue(instance: &BookInstance, today: NaiveDate) -> bool {
    instance.due_back.map_or(false, |due_back| today > due_back)
}

/// Checks `today <= proposed <= today + 4 weeks`
pub fn validate_renewal_date(
    proposed: NaiveDate,
    today: NaiveDate,
) -> Result<NaiveDate, RenewalError> {
    if proposed < today {
        return Err(RenewalError::invalid_date("Invalid date - renewal in past"));
    }
    if proposed > today + Duration::weeks(MAX_RENEWAL_WEEKS) {
        return Err(RenewalError::invalid_date(
            "Invalid date - renewal more than 4 weeks ahead",
        ));
    }
    Ok(proposed)
}

/// Returns a copy of `instance` due back on `proposed`. The status is not
/// checked: renewing a copy that is not on loan is accepted.
pub fn renew(
    instance: &BookInstance,
    proposed: NaiveDate,
    today: NaiveDate,
) -> Result<BookInstance, RenewalError> {
    let due_back = validate_renewal_date(proposed, today)?;
    Ok(BookInstance {
        due_back: Some(due_back),
        ..instance.clone()
    })
}

/// Listing order of copies: ascending due date, copies without one last
pub fn due_back_order(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::book_instance::LoanStatus;
    use uuid::Uuid;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn instance(due_back: Option<NaiveDate>) -> BookInstance {
        BookInstance {
            id: Uuid::new_v4(),
            book_id: Some(7),
            imprint: "Penguin Classics, 2003".to_string(),
            due_back,
            borrower_id: Some(12),
            status: LoanStatus::OnLoan,
        }
    }

    #[test]
    fn test_default_renewal_is_three_weeks() {
        let mut day = date(2023, 12, 1);
        for _ in 0..120 {
            assert_eq!(compute_default_renewal_date(day) - day, Duration::days(21));
            day = day.succ_opt().unwrap();
        }
        assert_eq!(compute_default_renewal_date(date(2024, 2, 20)), date(2024, 3, 12));
    }

    #[test]
    fn test_no_due_date_is_never_overdue() {
        let copy = instance(None);
        assert!(!is_overdue(&copy, date(1970, 1, 1)));
        assert!(!is_overdue(&copy, date(2999, 12, 31)));
    }

    #[test]
    fn test_overdue_strictly_after_due_date() {
        let copy = instance(Some(date(2024, 1, 1)));
        assert!(is_overdue(&copy, date(2024, 1, 2)));
        assert!(!is_overdue(&copy, date(2024, 1, 1)));
        assert!(!is_overdue(&copy, date(2023, 12, 31)));
    }

    #[test]
    fn test_renew_on_same_day() {
        let today = date(2024, 1, 10);
        let renewed = renew(&instance(Some(date(2024, 1, 5))), today, today).unwrap();
        assert_eq!(renewed.due_back, Some(today));
    }

    #[test]
    fn test_renew_in_past_rejected() {
        let today = date(2024, 1, 10);
        let err = renew(&instance(None), date(2024, 1, 9), today).unwrap_err();
        assert_eq!(err.kind, RenewalErrorKind::InvalidRenewalDate);
        assert_eq!(err.reason, "Invalid date - renewal in past");
    }

    #[test]
    fn test_renew_beyond_four_weeks_rejected() {
        let today = date(2024, 1, 10);
        let err = renew(&instance(None), date(2024, 2, 10), today).unwrap_err();
        assert_eq!(err.kind, RenewalErrorKind::InvalidRenewalDate);
        assert_eq!(err.reason, "Invalid date - renewal more than 4 weeks ahead");

        assert!(renew(&instance(None), date(2024, 2, 8), today).is_err());
    }

    #[test]
    fn test_renew_window_bounds() {
        let today = date(2024, 2, 15);
        let copy = instance(Some(date(2024, 2, 1)));
        for offset in 0..=28 {
            let proposed = today + Duration::days(offset);
            let renewed = renew(&copy, proposed, today).unwrap();
            assert_eq!(renewed.due_back, Some(proposed));
            assert_eq!(
                BookInstance {
                    due_back: copy.due_back,
                    ..renewed
                },
                copy
            );
        }
        for offset in [-365, -1, 29, 30, 400] {
            assert!(renew(&copy, today + Duration::days(offset), today).is_err());
        }
    }

    #[test]
    fn test_renew_ignores_status() {
        let today = date(2024, 1, 10);
        let mut copy = instance(None);
        copy.status = LoanStatus::Available;
        let renewed = renew(&copy, today, today).unwrap();
        assert_eq!(renewed.status, LoanStatus::Available);
    }

    #[test]
    fn test_due_back_order_puts_missing_dates_last() {
        let mut dates = vec![
            None,
            Some(date(2024, 3, 1)),
            Some(date(2024, 1, 1)),
            None,
            Some(date(2024, 2, 1)),
        ];
        dates.sort_by(|a, b| due_back_order(*a, *b));
        assert_eq!(
            dates,
            vec![
                Some(date(2024, 1, 1)),
                Some(date(2024, 2, 1)),
                Some(date(2024, 3, 1)),
                None,
                None
            ]
        );
    }
}
