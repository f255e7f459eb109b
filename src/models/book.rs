//! Book (catalog title) model and related types

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::{author::Author, book_instance::BookInstanceDetails, genre::Genre};

/// Number of genres shown in book listings
const DISPLAYED_GENRES: usize = 3;

/// Full book model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Book {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub summary: String,
    /// 13 character ISBN, not checksum-validated
    pub isbn: String,
    /// Reference to an externally stored cover image
    pub image: Option<String>,
}

/// Names of the first three genres, comma separated
pub fn display_genre<S: AsRef<str>>(names: &[S]) -> String {
    names
        .iter()
        .take(DISPLAYED_GENRES)
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Internal row structure for book listings
#[derive(Debug, Clone, FromRow)]
pub struct BookSummaryRow {
    pub id: i32,
    pub title: String,
    pub author_id: Option<i32>,
    pub author_first_name: Option<String>,
    pub author_last_name: Option<String>,
    pub genre_names: Vec<String>,
}

impl From<BookSummaryRow> for BookSummary {
    fn from(row: BookSummaryRow) -> Self {
        let author = row.author_id.map(|id| AuthorRef {
            id,
            display_name: format!(
                "{}, {}",
                row.author_last_name.unwrap_or_default(),
                row.author_first_name.unwrap_or_default()
            ),
        });
        BookSummary {
            id: row.id,
            title: row.title,
            author,
            display_genre: display_genre(&row.genre_names),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorRef {
    pub id: i32,
    pub display_name: String,
}

/// Short book representation for lists
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookSummary {
    pub id: i32,
    pub title: String,
    pub author: Option<AuthorRef>,
    pub display_genre: String,
}

/// Book with its author, genres and copies
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub author: Option<Author>,
    pub genres: Vec<Genre>,
    pub display_genre: String,
    pub copies: Vec<BookInstanceDetails>,
}

/// Create/update book request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookForm {
    #[validate(length(min = 1, max = 200, message = "Title must be 1 to 200 characters"))]
    pub title: String,
    pub author_id: Option<i32>,
    /// Brief description of the book
    #[validate(length(min = 1, max = 1000, message = "Summary must be 1 to 1000 characters"))]
    pub summary: String,
    /// 13 Character ISBN number
    #[validate(length(min = 1, max = 13, message = "ISBN must be at most 13 characters"))]
    pub isbn: String,
    /// Genres for this book
    #[validate(length(min = 1, message = "Select at least one genre"))]
    pub genre_ids: Vec<i32>,
    pub image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_genre_keeps_first_three() {
        assert_eq!(display_genre::<&str>(&[]), "");
        assert_eq!(display_genre(&["Fantasy"]), "Fantasy");
        assert_eq!(
            display_genre(&["Fantasy", "Epic", "Adventure", "Classic"]),
            "Fantasy, Epic, Adventure"
        );
    }

    #[test]
    fn test_summary_row_conversion() {
        let summary: BookSummary = BookSummaryRow {
            id: 3,
            title: "The Dispossessed".to_string(),
            author_id: Some(1),
            author_first_name: Some("Ursula".to_string()),
            author_last_name: Some("Le Guin".to_string()),
            genre_names: vec!["Science Fiction".to_string()],
        }
        .into();

        assert_eq!(summary.author.unwrap().display_name, "Le Guin, Ursula");
        assert_eq!(summary.display_genre, "Science Fiction");
    }

    #[test]
    fn test_book_without_author() {
        let summary: BookSummary = BookSummaryRow {
            id: 4,
            title: "Beowulf".to_string(),
            author_id: None,
            author_first_name: None,
            author_last_name: None,
            genre_names: vec![],
        }
        .into();
        assert!(summary.author.is_none());
    }

    #[test]
    fn test_isbn_length() {
        let form = BookForm {
            title: "Dune".to_string(),
            author_id: None,
            summary: "Spice.".to_string(),
            isbn: "97804411728101".to_string(),
            genre_ids: vec![1],
            image: None,
        };
        assert!(form.validate().is_err());

        let form = BookForm {
            isbn: "9780441172719".to_string(),
            ..form
        };
        assert!(form.validate().is_ok());
    }
}
