//! Author model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use super::book::BookSummary;

/// Full author model from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Author {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub date_of_death: Option<NaiveDate>,
}

impl Author {
    /// `"{last_name}, {first_name}"`
    pub fn display_name(&self) -> String {
        format!("{}, {}", self.last_name, self.first_name)
    }
}

/// Author with the books attributed to them
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AuthorDetails {
    #[serde(flatten)]
    pub author: Author,
    pub display_name: String,
    pub books: Vec<BookSummary>,
}

/// Create/update author request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct AuthorForm {
    #[validate(length(min = 1, max = 100, message = "First name must be 1 to 100 characters"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name must be 1 to 100 characters"))]
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    /// Date of death ("Died")
    pub date_of_death: Option<NaiveDate>,
}

impl AuthorForm {
    /// Field validation plus the lifespan rule, reported on `date_of_death`
    pub fn clean(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let (Some(born), Some(died)) = (self.date_of_birth, self.date_of_death) {
            if died < born {
                let mut err = ValidationError::new("lifespan");
                err.message = Some("Date of death precedes date of birth".into());
                errors.add("date_of_death", err);
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> AuthorForm {
        AuthorForm {
            first_name: "Ursula".to_string(),
            last_name: "Le Guin".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1929, 10, 21),
            date_of_death: NaiveDate::from_ymd_opt(2018, 1, 22),
        }
    }

    #[test]
    fn test_display_name() {
        let author = Author {
            id: 1,
            first_name: "Ursula".to_string(),
            last_name: "Le Guin".to_string(),
            date_of_birth: None,
            date_of_death: None,
        };
        assert_eq!(author.display_name(), "Le Guin, Ursula");
    }

    #[test]
    fn test_form_validation() {
        assert!(form().clean().is_ok());

        let mut f = form();
        f.last_name = String::new();
        assert!(f.validate().is_err());

        let mut f = form();
        f.first_name = "x".repeat(101);
        assert!(f.validate().is_err());
    }

    #[test]
    fn test_death_before_birth_rejected() {
        let mut f = form();
        f.date_of_death = NaiveDate::from_ymd_opt(1900, 1, 1);
        match crate::error::AppError::from(f.clean().unwrap_err()) {
            crate::error::AppError::Validation { fields, .. } => {
                assert_eq!(
                    fields.get("date_of_death"),
                    Some(&vec!["Date of death precedes date of birth".to_string()])
                );
                assert!(!fields.contains_key("__all__"));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        f.date_of_birth = None;
        assert!(f.clean().is_ok());
    }
}
