//! Permission catalog vocabulary: modules and their actions.
//!
//! Global and read-mostly; seeded once at deploy time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Module names seeded into the catalog.
pub const MODULE_COMPANY: &str = "company";
pub const MODULE_USER: &str = "user";
pub const MODULE_ROLE: &str = "role";

/// Action names seeded for every module.
pub const ACTION_CREATE: &str = "create";
pub const ACTION_READ: &str = "read";
pub const ACTION_UPDATE: &str = "update";
pub const ACTION_DELETE: &str = "delete";

pub const SEED_MODULES: [&str; 3] = [MODULE_COMPANY, MODULE_USER, MODULE_ROLE];
pub const SEED_ACTIONS: [&str; 4] = [ACTION_CREATE, ACTION_READ, ACTION_UPDATE, ACTION_DELETE];

/// A named functional area (e.g. "company").
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Module {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operation within a module, unique per (module, name).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModuleAction {
    pub id: i64,
    pub module_id: i64,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Name of the global permission covering one module action.
pub fn permission_name(module: &str, action: &str) -> String {
    format!("{}.{}", module, action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_names_are_dotted_pairs() {
        assert_eq!(permission_name(MODULE_COMPANY, ACTION_DELETE), "company.delete");
    }

    #[test]
    fn seed_vocabulary_is_fixed() {
        assert_eq!(SEED_MODULES.len() * SEED_ACTIONS.len(), 12);
    }
}
