//! Author endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::author::{Author, AuthorDetails, AuthorForm},
};

use super::{
    pagination::{PageQuery, PageRequest, PaginatedResponse},
    AuthenticatedUser,
};

/// List authors by last then first name
#[utoipa::path(
    get,
    path = "/authors/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of authors", body = PaginatedResponse<Author>),
        (status = 404, description = "No such page")
    )
)]
pub async fn list_authors(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<Author>>> {
    let request = PageRequest::new(query.page, state.config.pagination.authors_per_page)?;
    let (authors, total) = state
        .services
        .catalog
        .list_authors(request.limit(), request.offset())
        .await?;
    Ok(Json(PaginatedResponse::new(authors, total, request)?))
}

#[utoipa::path(
    get,
    path = "/authors/{id}/",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 200, description = "Author with their books", body = AuthorDetails),
        (status = 404, description = "Author not found")
    )
)]
pub async fn get_author(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<AuthorDetails>> {
    let author = state.services.catalog.get_author(id).await?;
    Ok(Json(author))
}

#[utoipa::path(
    post,
    path = "/authors/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = AuthorForm,
    responses(
        (status = 201, description = "Author created", body = Author),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian permission required")
    )
)]
pub async fn create_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<AuthorForm>,
) -> AppResult<(StatusCode, Json<Author>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_author(&form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/authors/{id}/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    request_body = AuthorForm,
    responses(
        (status = 200, description = "Author updated", body = Author),
        (status = 404, description = "Author not found")
    )
)]
pub async fn update_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(form): Json<AuthorForm>,
) -> AppResult<Json<Author>> {
    claims.require_librarian()?;

    let updated = state.services.catalog.update_author(id, &form).await?;
    Ok(Json(updated))
}

/// Delete an author; their books remain without an author
#[utoipa::path(
    delete,
    path = "/authors/{id}/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Author ID")
    ),
    responses(
        (status = 204, description = "Author deleted"),
        (status = 404, description = "Author not found")
    )
)]
pub async fn delete_author(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_author(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
