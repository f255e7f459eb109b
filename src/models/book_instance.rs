//! Book instance (borrowable copy) model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::{
    error::{AppError, AppResult},
    lifecycle,
};

/// Availability of a copy, stored as its one-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Maintenance,
    OnLoan,
    Available,
    Reserved,
}

impl LoanStatus {
    pub const ALL: [LoanStatus; 4] = [
        LoanStatus::Maintenance,
        LoanStatus::OnLoan,
        LoanStatus::Available,
        LoanStatus::Reserved,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "m",
            LoanStatus::OnLoan => "o",
            LoanStatus::Available => "a",
            LoanStatus::Reserved => "r",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            LoanStatus::Maintenance => "Maintenance",
            LoanStatus::OnLoan => "On loan",
            LoanStatus::Available => "Available",
            LoanStatus::Reserved => "Reserved",
        }
    }
}

impl Default for LoanStatus {
    fn default() -> Self {
        LoanStatus::Maintenance
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Accepts the stored code (`o`) as well as the API name (`on_loan`)
impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "m" | "maintenance" => Ok(LoanStatus::Maintenance),
            "o" | "on_loan" => Ok(LoanStatus::OnLoan),
            "a" | "available" => Ok(LoanStatus::Available),
            "r" | "reserved" => Ok(LoanStatus::Reserved),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

// SQLx conversion for LoanStatus
impl sqlx::Type<Postgres> for LoanStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for LoanStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for LoanStatus {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.code(), buf)
    }
}

/// Book instance as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BookInstance {
    pub id: Uuid,
    pub book_id: Option<i32>,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    pub status: LoanStatus,
}

/// Book instance joined with the title of its book and its borrower's name
#[derive(Debug, Clone, FromRow)]
pub struct BookInstanceRow {
    #[sqlx(flatten)]
    pub instance: BookInstance,
    pub book_title: Option<String>,
    pub borrower_username: Option<String>,
}

impl BookInstanceRow {
    pub fn into_details(self, today: NaiveDate) -> BookInstanceDetails {
        let is_overdue = lifecycle::is_overdue(&self.instance, today);
        let display = format!(
            "{} ({})",
            self.instance.id,
            self.book_title.as_deref().unwrap_or("")
        );
        let i = self.instance;
        BookInstanceDetails {
            id: i.id,
            book: i.book_id.map(|id| BookRef {
                id,
                title: self.book_title.unwrap_or_default(),
            }),
            imprint: i.imprint,
            due_back: i.due_back,
            borrower: i.borrower_id.map(|id| BorrowerRef {
                id,
                username: self.borrower_username.unwrap_or_default(),
            }),
            status: i.status,
            status_label: i.status.label().to_string(),
            is_overdue,
            display,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookRef {
    pub id: i32,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BorrowerRef {
    pub id: i32,
    pub username: String,
}

/// Book instance with full details for display
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookInstanceDetails {
    pub id: Uuid,
    pub book: Option<BookRef>,
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower: Option<BorrowerRef>,
    pub status: LoanStatus,
    pub status_label: String,
    pub is_overdue: bool,
    /// `"{id} ({book title})"`
    pub display: String,
}

/// Create/update book instance request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct BookInstanceForm {
    pub book_id: Option<i32>,
    #[validate(length(min = 1, max = 200, message = "Imprint must be 1 to 200 characters"))]
    pub imprint: String,
    pub due_back: Option<NaiveDate>,
    pub borrower_id: Option<i32>,
    /// Defaults to maintenance
    #[serde(default)]
    pub status: LoanStatus,
}

impl BookInstanceForm {
    /// Field validation plus the on-loan consistency rule: a copy on loan
    /// must name its borrower and its due date.
    pub fn clean(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if self.status == LoanStatus::OnLoan {
            if self.borrower_id.is_none() {
                errors.add("borrower_id", required("A copy on loan needs a borrower"));
            }
            if self.due_back.is_none() {
                errors.add("due_back", required("A copy on loan needs a due date"));
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn required(message: &'static str) -> ValidationError {
    let mut err = ValidationError::new("required");
    err.message = Some(message.into());
    err
}

/// Filter for copy listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceFilter {
    pub status: Option<LoanStatus>,
    pub borrower_id: Option<i32>,
}

/// Query parameters for copy listings
#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct InstanceQuery {
    /// Status code (`m`, `o`, `a`, `r`) or name (`on_loan`, ...)
    pub status: Option<String>,
    pub page: Option<i64>,
}

/// Renewal form as posted. The date stays raw text until `clean` so that a
/// blank or malformed value is reported on its field.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct RenewBookForm {
    /// Date between now and 4 weeks (default 3), `YYYY-MM-DD`
    pub renewal_date: Option<String>,
}

impl RenewBookForm {
    pub fn new(renewal_date: NaiveDate) -> Self {
        Self {
            renewal_date: Some(renewal_date.to_string()),
        }
    }

    /// Returns the validated renewal date or the errors bound to `renewal_date`
    pub fn clean(&self, today: NaiveDate) -> AppResult<NaiveDate> {
        let raw = self.renewal_date.as_deref().map(str::trim).unwrap_or("");
        if raw.is_empty() {
            return Err(AppError::field("renewal_date", "This field is required."));
        }
        let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .map_err(|_| AppError::field("renewal_date", "Enter a valid date."))?;
        Ok(lifecycle::validate_renewal_date(date, today)?)
    }
}
