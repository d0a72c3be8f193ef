//! UserRole model - a role granted to a user.
//!
//! Keyed by `user_id` directly (matching the permission-check hot path);
//! tenant isolation is enforced at assignment time by resolving the
//! member's CompanyUser row for the role's company.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Role grant, unique per (user, role).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserRole {
    pub id: i64,
    pub user_id: i64,
    pub role_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
