//! Copy management endpoints (librarians only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{
        BookInstance, BookInstanceDetails, BookInstanceForm, InstanceFilter, InstanceQuery,
        LoanStatus,
    },
};

use super::{
    pagination::{PageRequest, PaginatedResponse},
    today, AuthenticatedUser,
};

/// List copies, optionally filtered by status
#[utoipa::path(
    get,
    path = "/bookinstances/",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(InstanceQuery),
    responses(
        (status = 200, description = "One page of copies", body = PaginatedResponse<BookInstanceDetails>),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Librarian permission required")
    )
)]
pub async fn list_instances(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<InstanceQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    claims.require_librarian()?;

    let status = query
        .status
        .as_deref()
        .map(|s| s.parse::<LoanStatus>())
        .transpose()
        .map_err(AppError::BadRequest)?;
    let filter = InstanceFilter {
        status,
        borrower_id: None,
    };

    let request = PageRequest::new(query.page, state.config.pagination.loans_per_page)?;
    let (copies, total) = state
        .services
        .loans
        .list(&filter, request.limit(), request.offset(), today())
        .await?;
    Ok(Json(PaginatedResponse::new(copies, total, request)?))
}

#[utoipa::path(
    get,
    path = "/bookinstances/{id}/",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book instance ID")
    ),
    responses(
        (status = 200, description = "Copy details", body = BookInstanceDetails),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn get_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BookInstanceDetails>> {
    claims.require_librarian()?;

    let copy = state.services.loans.get(id, today()).await?;
    Ok(Json(copy))
}

/// Add a copy; status defaults to maintenance
#[utoipa::path(
    post,
    path = "/bookinstances/",
    tag = "copies",
    security(("bearer_auth" = [])),
    request_body = BookInstanceForm,
    responses(
        (status = 201, description = "Copy created", body = BookInstance),
        (status = 400, description = "Invalid input")
    )
)]
pub async fn create_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<BookInstanceForm>,
) -> AppResult<(StatusCode, Json<BookInstance>)> {
    claims.require_librarian()?;

    let created = state.services.loans.create(&form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/bookinstances/{id}/",
    tag = "copies",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book instance ID")
    ),
    request_body = BookInstanceForm,
    responses(
        (status = 200, description = "Copy updated", body = BookInstance),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn update_instance(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(form): Json<BookInstanceForm>,
) -> AppResult<Json<BookInstance>> {
    claims.require_librarian()?;

    let updated = state.services.loans.update(id, &form).await?;
    Ok(Json(updated))
}
