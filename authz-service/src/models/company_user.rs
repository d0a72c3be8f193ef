//! CompanyUser model - the membership record linking a user to a company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Membership entity, unique per (company, user). `is_main` marks the
/// company's original creator.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompanyUser {
    pub id: i64,
    pub company_id: i64,
    pub user_id: i64,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
