//! Loan endpoints: borrowed copies and renewal

use axum::{
    extract::{rejection::FormRejection, Path, Query, State},
    response::Redirect,
    Form, Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::book_instance::{BookInstanceDetails, RenewBookForm},
    services::loans::RenewalForm,
};

use super::{
    pagination::{PageQuery, PageRequest, PaginatedResponse},
    today, AuthenticatedUser,
};

/// Copies on loan to the current user, soonest due first
#[utoipa::path(
    get,
    path = "/mybooks/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "Copies borrowed by the current user", body = PaginatedResponse<BookInstanceDetails>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn my_books(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    let request = PageRequest::new(query.page, state.config.pagination.loans_per_page)?;
    let (copies, total) = state
        .services
        .loans
        .borrowed_by(claims.user_id, request.limit(), request.offset(), today())
        .await?;
    Ok(Json(PaginatedResponse::new(copies, total, request)?))
}

/// Every copy on loan, soonest due first
#[utoipa::path(
    get,
    path = "/borrowed/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(PageQuery),
    responses(
        (status = 200, description = "All copies on loan", body = PaginatedResponse<BookInstanceDetails>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Librarian permission required")
    )
)]
pub async fn all_borrowed(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookInstanceDetails>>> {
    claims.require_librarian()?;

    let request = PageRequest::new(query.page, state.config.pagination.loans_per_page)?;
    let (copies, total) = state
        .services
        .loans
        .all_borrowed(request.limit(), request.offset(), today())
        .await?;
    Ok(Json(PaginatedResponse::new(copies, total, request)?))
}

/// Renewal form, pre-filled three weeks ahead
#[utoipa::path(
    get,
    path = "/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book instance ID")
    ),
    responses(
        (status = 200, description = "Renewal form", body = RenewalForm),
        (status = 403, description = "Librarian permission required"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renewal_form(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<RenewalForm>> {
    claims.require_librarian()?;

    let form = state.services.loans.renewal_form(id, today()).await?;
    Ok(Json(form))
}

/// Renew a loan, then go back to the home page
#[utoipa::path(
    post,
    path = "/book/{id}/renew/",
    tag = "loans",
    security(("bearer_auth" = [])),
    params(
        ("id" = Uuid, Path, description = "Book instance ID")
    ),
    request_body(content = RenewBookForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 303, description = "Renewed, redirect to /"),
        (status = 400, description = "Invalid renewal date", body = crate::error::ErrorResponse),
        (status = 403, description = "Librarian permission required"),
        (status = 404, description = "Book instance not found")
    )
)]
pub async fn renew(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    form: Result<Form<RenewBookForm>, FormRejection>,
) -> AppResult<Redirect> {
    claims.require_librarian()?;
    let Form(form) = form.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    state.services.loans.renew(id, &form, today()).await?;
    Ok(Redirect::to("/"))
}
