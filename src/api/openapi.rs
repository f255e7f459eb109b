//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{
    auth, authors, books, dashboard, genres, groups, health, instances, loans, users,
};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LocalLibrary API",
        version = "0.3.0",
        description = "Catalog, loans and renewal for a small lending library",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Catalog
        dashboard::index,
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        authors::list_authors,
        authors::get_author,
        authors::create_author,
        authors::update_author,
        authors::delete_author,
        genres::list_genres,
        genres::create_genre,
        // Loans
        loans::my_books,
        loans::all_borrowed,
        loans::renewal_form,
        loans::renew,
        // Copies
        instances::list_instances,
        instances::get_instance,
        instances::create_instance,
        instances::update_instance,
        // Auth
        auth::login,
        auth::me,
        // Users and groups
        users::list_users,
        users::get_user,
        users::create_user,
        users::update_user,
        users::delete_user,
        groups::list_groups,
        groups::get_group,
        groups::create_group,
        groups::update_group,
        groups::delete_group,
    ),
    components(
        schemas(
            // Catalog
            crate::models::dashboard::Dashboard,
            crate::models::dashboard::CatalogCounts,
            crate::models::genre::Genre,
            crate::models::genre::GenreForm,
            crate::models::author::Author,
            crate::models::author::AuthorDetails,
            crate::models::author::AuthorForm,
            crate::models::book::Book,
            crate::models::book::AuthorRef,
            crate::models::book::BookSummary,
            crate::models::book::BookDetails,
            crate::models::book::BookForm,
            // Copies and loans
            crate::models::book_instance::LoanStatus,
            crate::models::book_instance::BookInstance,
            crate::models::book_instance::BookRef,
            crate::models::book_instance::BorrowerRef,
            crate::models::book_instance::BookInstanceDetails,
            crate::models::book_instance::BookInstanceForm,
            crate::models::book_instance::RenewBookForm,
            crate::services::loans::RenewalForm,
            // Users
            auth::LoginRequest,
            auth::LoginResponse,
            auth::Me,
            crate::models::user::User,
            crate::models::user::Group,
            crate::models::user::GroupDetails,
            crate::models::user::CreateUser,
            crate::models::user::UpdateUser,
            crate::models::user::GroupForm,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "catalog", description = "Books, authors and genres"),
        (name = "loans", description = "Borrowed copies and renewal"),
        (name = "copies", description = "Copy management"),
        (name = "auth", description = "Authentication endpoints"),
        (name = "users", description = "Users and groups")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renewal_route_documented() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/book/{id}/renew/"));
        assert!(doc.paths.paths.contains_key("/borrowed/"));
    }
}
