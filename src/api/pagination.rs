//! Page-numbered listings

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{AppError, AppResult};

/// `?page=` query parameter of the listing endpoints
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// Page number, starting at 1
    pub page: Option<i64>,
}

/// A validated page request: 1-based page number and page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    /// Pages start at 1; anything lower does not exist
    pub fn new(page: Option<i64>, per_page: i64) -> AppResult<Self> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(AppError::NotFound(format!("Invalid page ({})", page)));
        }
        Ok(Self {
            page,
            per_page: per_page.max(1),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.per_page
    }

    pub fn limit(&self) -> i64 {
        self.per_page
    }
}

/// Paginated response wrapper
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub num_pages: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Wrap one fetched page. A page past the last one is a 404; the first
    /// page of an empty listing is not.
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> AppResult<Self> {
        let num_pages = num_pages(total, request.per_page);
        if request.page > num_pages {
            return Err(AppError::NotFound(format!(
                "Invalid page ({}): that page contains no results",
                request.page
            )));
        }
        Ok(Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            num_pages,
        })
    }
}

/// At least one page, even when empty
fn num_pages(total: i64, per_page: i64) -> i64 {
    ((total + per_page - 1) / per_page).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::genre::Genre;

    #[test]
    fn test_num_pages() {
        assert_eq!(num_pages(0, 9), 1);
        assert_eq!(num_pages(9, 9), 1);
        assert_eq!(num_pages(10, 9), 2);
        assert_eq!(num_pages(27, 9), 3);
    }

    #[test]
    fn test_offsets() {
        let req = PageRequest::new(None, 9).unwrap();
        assert_eq!((req.limit(), req.offset()), (9, 0));
        let req = PageRequest::new(Some(3), 10).unwrap();
        assert_eq!((req.limit(), req.offset()), (10, 20));
        assert!(matches!(
            PageRequest::new(Some(0), 10),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_first_page_is_valid() {
        let req = PageRequest::new(Some(1), 9).unwrap();
        let page = PaginatedResponse::<Genre>::new(vec![], 0, req).unwrap();
        assert_eq!(page.num_pages, 1);
        assert!(page.items.is_empty());
    }

    #[test]
    fn test_page_past_the_end_is_not_found() {
        let req = PageRequest::new(Some(3), 9).unwrap();
        assert!(matches!(
            PaginatedResponse::<Genre>::new(vec![], 18, req),
            Err(AppError::NotFound(_))
        ));
        let req = PageRequest::new(Some(2), 9).unwrap();
        assert!(PaginatedResponse::<Genre>::new(vec![], 10, req).is_ok());
    }
}
