//! Role model - company-scoped roles plus the single global ROOT role.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::Permission;

/// The single system-wide super-role. Never company-scoped, never assignable
/// through the normal path, never touched by role management.
pub const ROLE_ROOT: &str = "ROOT";

/// The role every company gets at provisioning time, holding the full
/// catalog grant.
pub const ROLE_ADMIN: &str = "ADMIN";

/// Role entity. `company_id` is absent only for ROOT.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Role {
    pub id: i64,
    pub company_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// True for the global super-role.
    pub fn is_root(&self) -> bool {
        self.name == ROLE_ROOT && self.company_id.is_none()
    }
}

/// Role with its resolved permission set, for detailed reads.
#[derive(Debug, Clone, Serialize)]
pub struct RoleWithPermissions {
    #[serde(flatten)]
    pub role: Role,
    pub permissions: Vec<Permission>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn role(name: &str, company_id: Option<i64>) -> Role {
        Role {
            id: 1,
            company_id,
            name: name.to_string(),
            description: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn root_is_global_only() {
        assert!(role(ROLE_ROOT, None).is_root());
        // A company-scoped role named ROOT is not the super-role.
        assert!(!role(ROLE_ROOT, Some(7)).is_root());
        assert!(!role(ROLE_ADMIN, None).is_root());
    }
}
