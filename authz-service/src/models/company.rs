//! Company model - the tenant unit.
//!
//! `email`, `phone` and `address` hold ciphertext at rest; the company
//! service runs them through the field-encryption collaborator on the way
//! in and out. Rows read straight from the store are still encrypted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Company entity.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Company {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    /// Tenant slug, unique across the system.
    pub identifier: String,
    pub logo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for company provisioning. Plaintext; validated before encryption.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewCompany {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
    #[validate(length(max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub identifier: String,
    pub logo: Option<String>,
}

/// Input for company contact updates. Plaintext; validated before encryption.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompanyUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 50))]
    pub phone: String,
    #[validate(length(max = 500))]
    pub address: String,
    #[validate(length(min = 1, max = 100))]
    pub identifier: String,
}
