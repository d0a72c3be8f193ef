//! Permission model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A named capability, grantable to roles and bundling module actions.
/// `company_id` is absent for catalog (global) permissions.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Permission {
    pub id: i64,
    pub company_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Permission {
    /// True for catalog permissions not owned by any tenant.
    pub fn is_global(&self) -> bool {
        self.company_id.is_none()
    }
}
