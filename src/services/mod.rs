//! Business logic services

pub mod authors;
pub mod catalog;
pub mod customers;
pub mod loans;

use std::sync::Arc;

use crate::{config::LoansConfig, repository::Repository};

pub use loans::{AutoConfirm, ConfirmationPort};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub customers: customers::CustomersService,
    pub authors: authors::AuthorsService,
    pub loans: loans::LoansService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(
        repository: Repository,
        confirmation: Arc<dyn ConfirmationPort>,
        loans_config: LoansConfig,
    ) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone()),
            customers: customers::CustomersService::new(repository.clone()),
            authors: authors::AuthorsService::new(repository.clone()),
            loans: loans::LoansService::new(repository.loans, confirmation, loans_config),
        }
    }
}
