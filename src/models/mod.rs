//! Data models for LocalLibrary

pub mod author;
pub mod book;
pub mod book_instance;
pub mod dashboard;
pub mod genre;
pub mod user;

// Re-export commonly used types
pub use author::{Author, AuthorDetails};
pub use book::{Book, BookDetails, BookSummary};
pub use book_instance::{BookInstance, BookInstanceDetails, LoanStatus};
pub use genre::Genre;
pub use user::{Group, User, UserClaims};
