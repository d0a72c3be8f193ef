//! Authorization service: the only component that mutates role, permission
//! and assignment state. Every operation re-validates access before
//! touching data, and every multi-row write is transactional.

use service_core::error::AppError;

use crate::models::{
    ModuleAction, Permission, Role, RoleWithPermissions, UserRole, role::ROLE_ROOT,
};
use crate::services::{AccessValidator, ActorContext, AuthzStore};

#[derive(Clone)]
pub struct AuthorizationService {
    store: AuthzStore,
    validator: AccessValidator,
}

impl AuthorizationService {
    pub fn new(store: AuthzStore, validator: AccessValidator) -> Self {
        Self { store, validator }
    }

    /// Create a company-scoped role.
    pub async fn create_role(
        &self,
        actor: &ActorContext,
        company_id: i64,
        name: &str,
        description: &str,
    ) -> Result<Role, AppError> {
        self.store
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("company {} not found", company_id))
            })?;
        self.validator.resolve_company_access(actor, company_id).await?;

        if name == ROLE_ROOT {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "the ROOT role name is reserved"
            )));
        }

        let role = self.store.insert_role(Some(company_id), name, description).await?;

        tracing::info!(role_id = role.id, company_id, "Role created");
        Ok(role)
    }

    /// Create a permission and associate it with a role of the same company
    /// in one transaction.
    pub async fn create_permission(
        &self,
        actor: &ActorContext,
        company_id: i64,
        name: &str,
        description: &str,
        role_id: i64,
    ) -> Result<Permission, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;

        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", role_id)))?;

        // A role from another tenant is indistinguishable from a missing one.
        if role.company_id != Some(company_id) {
            return Err(AppError::NotFound(anyhow::anyhow!(
                "role {} not found in company {}",
                role_id,
                company_id
            )));
        }

        let permission = self
            .store
            .create_permission_with_role(company_id, name, description, role_id)
            .await?;

        tracing::info!(
            permission_id = permission.id,
            role_id,
            company_id,
            "Permission created and granted"
        );
        Ok(permission)
    }

    /// Grant a role to a user. ROOT and cross-tenant grants are rejected by
    /// the validator; duplicates surface as Conflict.
    pub async fn assign_role(
        &self,
        actor: &ActorContext,
        user_id: i64,
        role_id: i64,
    ) -> Result<UserRole, AppError> {
        let membership = self
            .validator
            .resolve_role_assignment(actor, user_id, role_id)
            .await?;

        // Defense in depth: the validator already rejected ROOT, but a grant
        // of the super-role must never slip through.
        if let Some(role) = self.store.find_role_by_id(role_id).await? {
            if role.name == ROLE_ROOT {
                return Err(AppError::Forbidden(anyhow::anyhow!(
                    "the ROOT role cannot be assigned"
                )));
            }
        }

        let grant = self.store.insert_user_role(membership.user_id, role_id).await?;

        tracing::info!(user_id, role_id, "Role assigned");
        Ok(grant)
    }

    /// Atomically replace a role's permission set. Idempotent: replaying the
    /// same set yields the same rows. Every id must name a permission of the
    /// role's own company (or a catalog permission).
    pub async fn update_role_permissions(
        &self,
        actor: &ActorContext,
        role_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), AppError> {
        let role = self.validator.resolve_role_access(actor, role_id).await?;

        if role.is_root() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "the ROOT role's permissions cannot be managed"
            )));
        }

        for &permission_id in permission_ids {
            let permission = self
                .store
                .find_permission_by_id(permission_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(anyhow::anyhow!("permission {} not found", permission_id))
                })?;

            if !permission.is_global() && permission.company_id != role.company_id {
                return Err(AppError::Forbidden(anyhow::anyhow!(
                    "permission {} belongs to another company",
                    permission_id
                )));
            }
        }

        self.store.replace_role_permissions(role_id, permission_ids).await?;

        tracing::info!(role_id, count = permission_ids.len(), "Role permissions replaced");
        Ok(())
    }

    /// The hot path: does the user hold the (module, action) capability.
    /// One indexed query over the grant chain.
    pub async fn check_permission(
        &self,
        user_id: i64,
        module_name: &str,
        action_name: &str,
    ) -> Result<bool, AppError> {
        let module_action_id = self
            .store
            .module_action_id(module_name, action_name)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "module action {}.{} not found",
                    module_name,
                    action_name
                ))
            })?;

        self.store.has_permission(user_id, module_action_id).await
    }

    /// Remove one permission grant from a role.
    pub async fn remove_permission(
        &self,
        actor: &ActorContext,
        role_id: i64,
        permission_id: i64,
    ) -> Result<(), AppError> {
        let role = self.validator.resolve_role_access(actor, role_id).await?;

        if role.is_root() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "the ROOT role's permissions cannot be managed"
            )));
        }

        self.store.remove_role_permission(role_id, permission_id).await?;

        tracing::info!(role_id, permission_id, "Permission removed from role");
        Ok(())
    }

    /// Load a role with its resolved permission set.
    pub async fn get_role(
        &self,
        actor: &ActorContext,
        role_id: i64,
    ) -> Result<RoleWithPermissions, AppError> {
        let role = self.validator.resolve_role_access(actor, role_id).await?;
        let permissions = self.store.list_permissions_by_role(role_id).await?;

        Ok(RoleWithPermissions { role, permissions })
    }

    /// All roles of a company, permission sets included.
    pub async fn list_roles(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<Vec<RoleWithPermissions>, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;

        let roles = self.store.list_roles_by_company(company_id).await?;
        let mut out = Vec::with_capacity(roles.len());
        for role in roles {
            let permissions = self.store.list_permissions_by_role(role.id).await?;
            out.push(RoleWithPermissions { role, permissions });
        }
        Ok(out)
    }

    /// Permissions visible to a company: its own plus the global catalog.
    pub async fn list_permissions(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<Vec<Permission>, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;
        self.store.list_permissions_by_company(company_id).await
    }

    /// Module actions bundled by a permission.
    pub async fn get_permission_module_actions(
        &self,
        actor: &ActorContext,
        permission_id: i64,
    ) -> Result<Vec<ModuleAction>, AppError> {
        self.validator
            .resolve_permission_ownership(actor, permission_id)
            .await?;
        self.store.module_actions_for_permission(permission_id).await
    }

    /// Atomically replace the module-action set of a permission.
    pub async fn update_permission_module_actions(
        &self,
        actor: &ActorContext,
        permission_id: i64,
        module_action_ids: &[i64],
    ) -> Result<(), AppError> {
        self.validator
            .resolve_permission_ownership(actor, permission_id)
            .await?;

        self.store
            .replace_permission_module_actions(permission_id, module_action_ids)
            .await?;

        tracing::info!(
            permission_id,
            count = module_action_ids.len(),
            "Permission module actions replaced"
        );
        Ok(())
    }

    /// The full action vocabulary.
    pub async fn list_module_actions(&self) -> Result<Vec<ModuleAction>, AppError> {
        self.store.list_module_actions().await
    }

    /// Every distinct permission a user holds.
    pub async fn get_user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, AppError> {
        self.store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("user {} not found", user_id)))?;

        self.store.user_permissions(user_id).await
    }
}
