//! Book catalog endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::book::{Book, BookDetails, BookForm, BookSummary},
};

use super::{
    pagination::{PageQuery, PageRequest, PaginatedResponse},
    today, AuthenticatedUser,
};

/// List books by title
#[utoipa::path(
    get,
    path = "/books/",
    tag = "catalog",
    params(PageQuery),
    responses(
        (status = 200, description = "One page of books", body = PaginatedResponse<BookSummary>),
        (status = 404, description = "No such page")
    )
)]
pub async fn list_books(
    State(state): State<crate::AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<PaginatedResponse<BookSummary>>> {
    let request = PageRequest::new(query.page, state.config.pagination.books_per_page)?;
    let (books, total) = state
        .services
        .catalog
        .list_books(request.limit(), request.offset())
        .await?;
    Ok(Json(PaginatedResponse::new(books, total, request)?))
}

/// Book with its author, genres and copies
#[utoipa::path(
    get,
    path = "/books/{id}/",
    tag = "catalog",
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 200, description = "Book details", body = BookDetails),
        (status = 404, description = "Book not found")
    )
)]
pub async fn get_book(
    State(state): State<crate::AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<BookDetails>> {
    let book = state.services.catalog.get_book(id, today()).await?;
    Ok(Json(book))
}

/// Create a book
#[utoipa::path(
    post,
    path = "/books/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    request_body = BookForm,
    responses(
        (status = 201, description = "Book created", body = Book),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Librarian permission required"),
        (status = 404, description = "Unknown author or genre")
    )
)]
pub async fn create_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(form): Json<BookForm>,
) -> AppResult<(StatusCode, Json<Book>)> {
    claims.require_librarian()?;

    let created = state.services.catalog.create_book(&form).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a book and replace its genres
#[utoipa::path(
    put,
    path = "/books/{id}/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    request_body = BookForm,
    responses(
        (status = 200, description = "Book updated", body = Book),
        (status = 404, description = "Book, author or genre not found")
    )
)]
pub async fn update_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
    Json(form): Json<BookForm>,
) -> AppResult<Json<Book>> {
    claims.require_librarian()?;

    let updated = state.services.catalog.update_book(id, &form).await?;
    Ok(Json(updated))
}

/// Delete a book; its copies remain without a book
#[utoipa::path(
    delete,
    path = "/books/{id}/",
    tag = "catalog",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Book ID")
    ),
    responses(
        (status = 204, description = "Book deleted"),
        (status = 404, description = "Book not found")
    )
)]
pub async fn delete_book(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    claims.require_librarian()?;

    state.services.catalog.delete_book(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
