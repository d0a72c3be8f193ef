//! Access validator: the read-only half of every authorization decision.
//!
//! Resolves identity, tenant membership and root status, and fails with a
//! distinct error kind per violation so callers never have to re-derive
//! which check broke. Never mutates state.

use service_core::error::AppError;

use crate::models::{CompanyUser, Permission, Role};
use crate::services::AuthzStore;

/// The actor identity resolved by the external session layer. `user_id` is
/// `None` when the caller carried no resolvable identity.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActorContext {
    pub user_id: Option<i64>,
}

impl ActorContext {
    pub fn authenticated(user_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    pub fn anonymous() -> Self {
        Self { user_id: None }
    }
}

#[derive(Clone)]
pub struct AccessValidator {
    store: AuthzStore,
}

impl AccessValidator {
    pub fn new(store: AuthzStore) -> Self {
        Self { store }
    }

    /// Resolve the actor id or fail as unauthenticated.
    pub fn require_actor(&self, actor: &ActorContext) -> Result<i64, AppError> {
        actor
            .user_id
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("actor identity not resolved")))
    }

    /// Require a membership row for (actor, company). Returns the actor id
    /// for follow-up writes.
    pub async fn resolve_company_access(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<i64, AppError> {
        let user_id = self.require_actor(actor)?;

        if !self.store.has_company_access(user_id, company_id).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "user {} has no access to company {}",
                user_id,
                company_id
            )));
        }

        Ok(user_id)
    }

    /// Require the actor to hold the global ROOT role.
    pub async fn resolve_root_access(&self, actor: &ActorContext) -> Result<i64, AppError> {
        let user_id = self.require_actor(actor)?;

        if !self.store.is_root(user_id).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "user {} does not hold the ROOT role",
                user_id
            )));
        }

        Ok(user_id)
    }

    /// Load a permission and re-check ownership: a company-scoped permission
    /// requires membership of that company, a global catalog permission
    /// requires ROOT.
    pub async fn resolve_permission_ownership(
        &self,
        actor: &ActorContext,
        permission_id: i64,
    ) -> Result<Permission, AppError> {
        let permission = self
            .store
            .find_permission_by_id(permission_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("permission {} not found", permission_id))
            })?;

        match permission.company_id {
            Some(company_id) => {
                self.resolve_company_access(actor, company_id).await?;
            }
            None => {
                self.resolve_root_access(actor).await?;
            }
        }

        Ok(permission)
    }

    /// Load a role and require the actor's access to its scope: membership
    /// for company roles, ROOT for global ones.
    pub async fn resolve_role_access(
        &self,
        actor: &ActorContext,
        role_id: i64,
    ) -> Result<Role, AppError> {
        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", role_id)))?;

        match role.company_id {
            Some(company_id) => {
                self.resolve_company_access(actor, company_id).await?;
            }
            None => {
                self.resolve_root_access(actor).await?;
            }
        }

        Ok(role)
    }

    /// Resolve everything an assignment needs: the role must exist, must not
    /// be ROOT, must be company-scoped, the target user must be a member of
    /// the role's company, and the actor must be a member too. Returns the
    /// target membership so the caller can persist the grant.
    pub async fn resolve_role_assignment(
        &self,
        actor: &ActorContext,
        target_user_id: i64,
        role_id: i64,
    ) -> Result<CompanyUser, AppError> {
        let actor_id = self.require_actor(actor)?;

        let role = self
            .store
            .find_role_by_id(role_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("role {} not found", role_id)))?;

        if role.is_root() {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "the ROOT role cannot be assigned"
            )));
        }

        let company_id = role.company_id.ok_or_else(|| {
            AppError::Forbidden(anyhow::anyhow!(
                "global roles cannot be assigned through the normal path"
            ))
        })?;

        let membership = self
            .store
            .find_company_user(company_id, target_user_id)
            .await?
            .ok_or_else(|| {
                AppError::Forbidden(anyhow::anyhow!(
                    "user {} is not a member of company {}",
                    target_user_id,
                    company_id
                ))
            })?;

        // Cross-tenant assignment: the role's company decides whose
        // membership counts, and the actor must belong there as well.
        if !self.store.has_company_access(actor_id, company_id).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "user {} has no access to company {}",
                actor_id,
                company_id
            )));
        }

        Ok(membership)
    }
}
