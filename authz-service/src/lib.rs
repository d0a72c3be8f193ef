//! authz-service: multi-tenant authorization core.
//!
//! Decides whether an actor may perform a module action inside a company,
//! and provisions/deletes the permission structures a tenant needs. No
//! transport: callers hand in an already-resolved actor id and translate
//! [`service_core::error::ErrorKind`] into their own status codes.
pub mod config;
pub mod db;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use crate::config::AuthzConfig;
use crate::services::{AccessValidator, AuthorizationService, AuthzStore, CompanyService};
use crate::utils::crypto::FieldCipher;

/// Shared application state wiring the store and services together.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AuthzConfig>,
    pub store: AuthzStore,
    pub validator: AccessValidator,
    pub authorization: AuthorizationService,
    pub companies: CompanyService,
}

impl AppState {
    pub fn new(
        config: AuthzConfig,
        pool: sqlx::PgPool,
        cipher: Arc<dyn FieldCipher>,
    ) -> Self {
        let store = AuthzStore::new(pool);
        let validator = AccessValidator::new(store.clone());
        let authorization = AuthorizationService::new(store.clone(), validator.clone());
        let companies = CompanyService::new(store.clone(), validator.clone(), cipher);

        Self {
            config: Arc::new(config),
            store,
            validator,
            authorization,
            companies,
        }
    }
}
