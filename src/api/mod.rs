//! HTTP handlers and the application router

pub mod auth;
pub mod authors;
pub mod books;
pub mod dashboard;
pub mod genres;
pub mod groups;
pub mod health;
pub mod instances;
pub mod loans;
pub mod openapi;
pub mod pagination;
pub mod users;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::AppError, models::user::UserClaims, AppState};

/// Extractor for authenticated user from JWT token
pub struct AuthenticatedUser(pub UserClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Authentication("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Authentication("Invalid authorization header format".to_string())
        })?;

        let claims = state.services.users.verify_token(token)?;
        Ok(AuthenticatedUser(claims))
    }
}

/// Local calendar date of the request; overdue checks and renewal windows
/// are relative to it
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let routes = Router::new()
        // Health
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Catalog
        .route("/", get(dashboard::index))
        .route("/books/", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id/",
            get(books::get_book)
                .put(books::update_book)
                .delete(books::delete_book),
        )
        .route("/authors/", get(authors::list_authors).post(authors::create_author))
        .route(
            "/authors/:id/",
            get(authors::get_author)
                .put(authors::update_author)
                .delete(authors::delete_author),
        )
        .route("/genres/", get(genres::list_genres).post(genres::create_genre))
        // Loans
        .route("/mybooks/", get(loans::my_books))
        .route("/borrowed/", get(loans::all_borrowed))
        .route("/book/:id/renew/", get(loans::renewal_form).post(loans::renew))
        // Copies
        .route(
            "/bookinstances/",
            get(instances::list_instances).post(instances::create_instance),
        )
        .route(
            "/bookinstances/:id/",
            get(instances::get_instance).put(instances::update_instance),
        )
        // Machine API
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .route("/api/users", get(users::list_users).post(users::create_user))
        .route(
            "/api/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/api/groups", get(groups::list_groups).post(groups::create_group))
        .route(
            "/api/groups/:id",
            get(groups::get_group)
                .put(groups::update_group)
                .delete(groups::delete_group),
        )
        .with_state(state);

    Router::new()
        .merge(routes)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
