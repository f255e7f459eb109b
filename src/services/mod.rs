//! Business logic services

pub mod catalog;
pub mod dashboard;
pub mod loans;
pub mod sessions;
pub mod users;

use std::sync::Arc;

use crate::{config::AuthConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub loans: loans::LoansService,
    pub dashboard: dashboard::DashboardService,
    pub users: users::UsersService,
}

impl Services {
    /// Create all services over the given repository and session backend
    pub fn new(
        repository: Repository,
        auth_config: AuthConfig,
        sessions: Arc<dyn sessions::SessionStore>,
    ) -> Self {
        let loans = loans::LoansService::new(Arc::new(repository.instances.clone()));
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), loans.clone()),
            dashboard: dashboard::DashboardService::new(
                repository.clone(),
                loans.clone(),
                sessions,
            ),
            users: users::UsersService::new(repository, auth_config),
            loans,
        }
    }
}
