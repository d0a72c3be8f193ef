//! Catalog seeding: the global module/action/permission baseline and the
//! global ROOT role. Runs at startup, after migrations; fully idempotent,
//! so restarts and rolling deploys are safe.

use service_core::error::AppError;

use crate::models::catalog::{permission_name, SEED_ACTIONS, SEED_MODULES};
use crate::models::role::ROLE_ROOT;
use crate::services::AuthzStore;

/// Ensure the global catalog exists: every seed module, each with the full
/// action set, a global permission per (module, action) pair linked to its
/// module action, and the global ROOT role. Existing rows are left alone.
pub async fn ensure_seeded(store: &AuthzStore) -> Result<(), AppError> {
    let mut created = 0usize;

    for module_name in SEED_MODULES {
        let module_id = match store.find_module_by_name(module_name).await? {
            Some(module) => module.id,
            None => {
                created += 1;
                store
                    .insert_module(module_name, &format!("{} management", module_name))
                    .await?
            }
        };

        for action_name in SEED_ACTIONS {
            let action_id = match store.find_module_action(module_id, action_name).await? {
                Some(action) => action.id,
                None => {
                    created += 1;
                    store
                        .insert_module_action(
                            module_id,
                            action_name,
                            &format!("{} {}", action_name, module_name),
                        )
                        .await?
                }
            };

            let name = permission_name(module_name, action_name);
            let permission_id = match store.find_global_permission_by_name(&name).await? {
                Some(permission) => permission.id,
                None => {
                    created += 1;
                    store
                        .create_global_permission(&name, &format!("{} on {}", action_name, module_name))
                        .await?
                }
            };
            store
                .link_permission_module_action(permission_id, action_id)
                .await?;
        }
    }

    if store.find_role_by_name(None, ROLE_ROOT).await?.is_none() {
        created += 1;
        store
            .insert_role(None, ROLE_ROOT, "System-wide super role")
            .await?;
        tracing::info!("Global {} role created", ROLE_ROOT);
    }

    if created > 0 {
        tracing::info!(created, "Authorization catalog seeded");
    } else {
        tracing::debug!("Authorization catalog already up to date");
    }
    Ok(())
}
