//! Genre model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Genre {
    pub id: i32,
    pub name: String,
}

/// Create genre request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct GenreForm {
    /// Book genre (e.g. Science Fiction)
    #[validate(length(min = 1, max = 200, message = "Genre name must be 1 to 200 characters"))]
    pub name: String,
}
