//! Company workflows: provisioning, deletion, member management and
//! contact reads/updates.
//!
//! Provisioning turns "create company" into a fully authorized tenant in
//! one transaction; deletion unwinds every authorization record in strict
//! dependency order. Sensitive contact fields pass through the field
//! cipher at this seam, right before writes and right after reads.

use std::sync::Arc;

use service_core::error::AppError;
use validator::Validate;

use crate::models::{
    role::{ROLE_ADMIN, ROLE_ROOT},
    Company, CompanyUpdate, CompanyUser, NewCompany, NewUser, User,
};
use crate::services::store::map_db_err;
use crate::services::{AccessValidator, ActorContext, AuthzStore};
use crate::utils::crypto::FieldCipher;

#[derive(Clone)]
pub struct CompanyService {
    store: AuthzStore,
    validator: AccessValidator,
    cipher: Arc<dyn FieldCipher>,
}

impl CompanyService {
    pub fn new(store: AuthzStore, validator: AccessValidator, cipher: Arc<dyn FieldCipher>) -> Self {
        Self {
            store,
            validator,
            cipher,
        }
    }

    /// Provision a new tenant: company, owning membership, ADMIN role, a
    /// company-scoped clone of the full permission catalog granted to
    /// ADMIN, and the creator's ADMIN grant. All-or-nothing.
    ///
    /// An empty catalog is a valid degenerate state: the company still
    /// comes up, with zero grants on ADMIN.
    pub async fn provision_company(
        &self,
        actor: &ActorContext,
        input: &NewCompany,
    ) -> Result<Company, AppError> {
        let user_id = self.validator.require_actor(actor)?;
        input.validate()?;

        let encrypted = NewCompany {
            name: input.name.clone(),
            email: self.cipher.encrypt(&input.email)?,
            phone: self.cipher.encrypt(&input.phone)?,
            address: self.cipher.encrypt(&input.address)?,
            identifier: input.identifier.clone(),
            logo: input.logo.clone(),
        };

        let catalog = self.store.list_global_permissions().await?;

        let mut tx = self.store.pool().begin().await.map_err(map_db_err)?;

        // 1. Company row (contact fields already ciphertext).
        let company_id = self.store.insert_company_tx(&mut *tx, &encrypted).await?;

        // 2. Owning membership.
        self.store
            .insert_company_user_tx(&mut *tx, company_id, user_id, true)
            .await?;

        // 3. ADMIN role scoped to the new company.
        let role_id = self
            .store
            .insert_role_tx(&mut *tx, Some(company_id), ROLE_ADMIN, "Company administrator")
            .await?;

        // 4. Clone every catalog permission into the company's scope, carry
        //    its module-action links over, and grant it to ADMIN.
        for global in &catalog {
            let permission_id = self
                .store
                .insert_permission_tx(&mut *tx, Some(company_id), &global.name, &global.description)
                .await?;
            self.store
                .copy_permission_module_actions_tx(&mut *tx, global.id, permission_id)
                .await?;
            self.store
                .insert_role_permission_tx(&mut *tx, role_id, permission_id)
                .await?;
        }

        // 5. The creator holds ADMIN from the first moment.
        self.store.insert_user_role_tx(&mut *tx, user_id, role_id).await?;

        tx.commit().await.map_err(map_db_err)?;

        tracing::info!(
            company_id,
            user_id,
            grants = catalog.len(),
            "Company provisioned"
        );

        let company = self
            .store
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!("company {} vanished after commit", company_id))
            })?;
        self.decrypt_company(company)
    }

    /// Delete a company and every authorization record referencing it, in
    /// strict dependency order, in one transaction. Only the owning member
    /// or a ROOT holder may delete.
    pub async fn delete_company(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<(), AppError> {
        let user_id = self.validator.require_actor(actor)?;

        self.store
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("company {} not found", company_id))
            })?;

        let is_owner = self
            .store
            .find_company_user(company_id, user_id)
            .await?
            .map(|cu| cu.is_main)
            .unwrap_or(false);
        if !is_owner && !self.store.is_root(user_id).await? {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "only the owning member or {} may delete company {}",
                ROLE_ROOT,
                company_id
            )));
        }

        let mut tx = self.store.pool().begin().await.map_err(map_db_err)?;

        self.store.delete_company_users_tx(&mut *tx, company_id).await?;
        self.store
            .delete_user_roles_for_company_tx(&mut *tx, company_id)
            .await?;
        self.store
            .delete_role_permissions_for_company_tx(&mut *tx, company_id)
            .await?;
        self.store
            .delete_permissions_for_company_tx(&mut *tx, company_id)
            .await?;
        self.store.delete_roles_for_company_tx(&mut *tx, company_id).await?;
        self.store.delete_company_tx(&mut *tx, company_id).await?;

        tx.commit().await.map_err(map_db_err)?;

        tracing::info!(company_id, "Company deleted");
        Ok(())
    }

    /// Register a new user as a member of a company: user row (encrypted
    /// contact fields, unique email lookup hash) plus membership, one
    /// transaction.
    pub async fn register_member(
        &self,
        actor: &ActorContext,
        company_id: i64,
        input: &NewUser,
    ) -> Result<CompanyUser, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;
        input.validate()?;

        let email_hash = User::email_lookup_hash(&input.email);
        if self.store.find_user_by_email_hash(&email_hash).await?.is_some() {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "a user with this email already exists"
            )));
        }

        let email = self.cipher.encrypt(&input.email)?;
        let phone = self.cipher.encrypt(&input.phone)?;

        let mut tx = self.store.pool().begin().await.map_err(map_db_err)?;

        let user_id = self
            .store
            .insert_user_tx(&mut *tx, &email, &email_hash, &input.password_hash, &phone)
            .await?;
        let membership_id = self
            .store
            .insert_company_user_tx(&mut *tx, company_id, user_id, false)
            .await?;

        tx.commit().await.map_err(map_db_err)?;

        tracing::info!(company_id, user_id, "Member registered");

        self.store
            .find_company_user(company_id, user_id)
            .await?
            .filter(|cu| cu.id == membership_id)
            .ok_or_else(|| {
                AppError::InternalError(anyhow::anyhow!(
                    "membership {} vanished after commit",
                    membership_id
                ))
            })
    }

    /// All memberships of a company.
    pub async fn list_members(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<Vec<CompanyUser>, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;
        self.store.list_company_users(company_id).await
    }

    /// Remove a member: their role grants within the company, then the
    /// membership row, one transaction. The owning member cannot be removed.
    pub async fn remove_member(
        &self,
        actor: &ActorContext,
        company_id: i64,
        user_id: i64,
    ) -> Result<(), AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;

        let membership = self
            .store
            .find_company_user(company_id, user_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!(
                    "user {} is not a member of company {}",
                    user_id,
                    company_id
                ))
            })?;

        if membership.is_main {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "the owning member cannot be removed"
            )));
        }

        let mut tx = self.store.pool().begin().await.map_err(map_db_err)?;

        self.store
            .delete_member_roles_tx(&mut *tx, company_id, user_id)
            .await?;
        self.store
            .delete_company_user_tx(&mut *tx, company_id, user_id)
            .await?;

        tx.commit().await.map_err(map_db_err)?;

        tracing::info!(company_id, user_id, "Member removed");
        Ok(())
    }

    /// Load a company, contact fields decrypted.
    pub async fn get_company(
        &self,
        actor: &ActorContext,
        company_id: i64,
    ) -> Result<Company, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;

        let company = self
            .store
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("company {} not found", company_id))
            })?;
        self.decrypt_company(company)
    }

    /// Every company the actor belongs to, contact fields decrypted.
    pub async fn list_companies(&self, actor: &ActorContext) -> Result<Vec<Company>, AppError> {
        let user_id = self.validator.require_actor(actor)?;

        let companies = self.store.list_companies_for_user(user_id).await?;
        companies
            .into_iter()
            .map(|c| self.decrypt_company(c))
            .collect()
    }

    /// Every company in the system. Restricted to root operators.
    pub async fn list_all_companies(&self, actor: &ActorContext) -> Result<Vec<Company>, AppError> {
        self.validator.resolve_root_access(actor).await?;

        let companies = self.store.list_companies().await?;
        companies
            .into_iter()
            .map(|c| self.decrypt_company(c))
            .collect()
    }

    /// Update company contact fields, encrypting on the way in.
    pub async fn update_company(
        &self,
        actor: &ActorContext,
        company_id: i64,
        update: &CompanyUpdate,
    ) -> Result<Company, AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;
        update.validate()?;

        self.store
            .find_company_by_id(company_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(anyhow::anyhow!("company {} not found", company_id))
            })?;

        let encrypted = CompanyUpdate {
            name: update.name.clone(),
            email: self.cipher.encrypt(&update.email)?,
            phone: self.cipher.encrypt(&update.phone)?,
            address: self.cipher.encrypt(&update.address)?,
            identifier: update.identifier.clone(),
        };

        self.store.update_company(company_id, &encrypted).await?;

        self.get_company(actor, company_id).await
    }

    /// Update the company's logo reference.
    pub async fn update_company_logo(
        &self,
        actor: &ActorContext,
        company_id: i64,
        logo: &str,
    ) -> Result<(), AppError> {
        self.validator.resolve_company_access(actor, company_id).await?;
        self.store.update_company_logo(company_id, logo).await
    }

    fn decrypt_company(&self, mut company: Company) -> Result<Company, AppError> {
        company.email = self.cipher.decrypt(&company.email)?;
        company.phone = self.cipher.decrypt(&company.phone)?;
        company.address = self.cipher.decrypt(&company.address)?;
        Ok(company)
    }
}
