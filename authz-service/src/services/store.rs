//! Authorization store: every SQL statement of the core lives here.
//!
//! Methods come in two shapes: pool-backed for single statements, and
//! `_tx`-suffixed variants taking a `PgConnection` so the provisioning and
//! deletion workflows can compose them inside one transaction.

use service_core::error::AppError;
use sqlx::postgres::PgPool;
use sqlx::PgConnection;

use crate::models::{
    Company, CompanyUpdate, CompanyUser, Module, ModuleAction, NewCompany, Permission, Role, User,
    UserRole,
};

/// Map database failures onto the error taxonomy: unique-key violations are
/// conflicts, foreign-key violations are bad references, everything else is
/// an internal store failure.
pub(crate) fn map_db_err(err: sqlx::Error) -> AppError {
    let code = match &err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    };
    match code.as_deref() {
        Some("23505") => AppError::Conflict(anyhow::anyhow!(err)),
        Some("23503") => AppError::BadRequest(anyhow::anyhow!(err)),
        _ => AppError::DatabaseError(anyhow::anyhow!(err)),
    }
}

/// PostgreSQL-backed authorization store.
#[derive(Clone)]
pub struct AuthzStore {
    pool: PgPool,
}

impl AuthzStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // ==================== Company Operations ====================

    /// Insert a company inside an open transaction. Contact fields must
    /// already be ciphertext.
    pub async fn insert_company_tx(
        &self,
        conn: &mut PgConnection,
        input: &NewCompany,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO companies (name, email, phone, address, identifier, logo)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&input.name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(&input.address)
        .bind(&input.identifier)
        .bind(&input.logo)
        .fetch_one(conn)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Find company by ID.
    pub async fn find_company_by_id(&self, company_id: i64) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE id = $1")
            .bind(company_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Find company by its tenant slug.
    pub async fn find_company_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies WHERE identifier = $1")
            .bind(identifier)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Every company in the system, oldest first.
    pub async fn list_companies(&self) -> Result<Vec<Company>, AppError> {
        sqlx::query_as::<_, Company>("SELECT * FROM companies ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// All companies a user belongs to.
    pub async fn list_companies_for_user(&self, user_id: i64) -> Result<Vec<Company>, AppError> {
        sqlx::query_as::<_, Company>(
            r#"
            SELECT DISTINCT c.* FROM companies c
            JOIN company_users cu ON c.id = cu.company_id
            WHERE cu.user_id = $1
            ORDER BY c.id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Update company contact fields (already ciphertext).
    pub async fn update_company(
        &self,
        company_id: i64,
        update: &CompanyUpdate,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE companies
            SET name = $1, email = $2, phone = $3, address = $4, identifier = $5,
                updated_at = NOW()
            WHERE id = $6
            "#,
        )
        .bind(&update.name)
        .bind(&update.email)
        .bind(&update.phone)
        .bind(&update.address)
        .bind(&update.identifier)
        .bind(company_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Update company logo reference.
    pub async fn update_company_logo(&self, company_id: i64, logo: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE companies SET logo = $1, updated_at = NOW() WHERE id = $2")
            .bind(logo)
            .bind(company_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Delete the company row itself. The deletion workflow removes all
    /// dependents first.
    pub async fn delete_company_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(company_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // ==================== User Operations ====================

    /// Insert a user inside an open transaction. Email/phone ciphertext,
    /// password pre-hashed. Duplicate lookup hash surfaces as Conflict.
    pub async fn insert_user_tx(
        &self,
        conn: &mut PgConnection,
        email: &str,
        email_hash: &str,
        password_hash: &str,
        phone: &str,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (email, email_hash, password, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(email)
        .bind(email_hash)
        .bind(password_hash)
        .bind(phone)
        .fetch_one(conn)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Find user by ID.
    pub async fn find_user_by_id(&self, user_id: i64) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Find user by the non-reversible email lookup hash.
    pub async fn find_user_by_email_hash(
        &self,
        email_hash: &str,
    ) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE email_hash = $1")
            .bind(email_hash)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    // ==================== CompanyUser Operations ====================

    /// Insert a membership inside an open transaction.
    pub async fn insert_company_user_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
        user_id: i64,
        is_main: bool,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO company_users (company_id, user_id, is_main)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .bind(is_main)
        .fetch_one(conn)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Find the membership row for (company, user).
    pub async fn find_company_user(
        &self,
        company_id: i64,
        user_id: i64,
    ) -> Result<Option<CompanyUser>, AppError> {
        sqlx::query_as::<_, CompanyUser>(
            "SELECT * FROM company_users WHERE company_id = $1 AND user_id = $2",
        )
        .bind(company_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// All memberships of a company.
    pub async fn list_company_users(&self, company_id: i64) -> Result<Vec<CompanyUser>, AppError> {
        sqlx::query_as::<_, CompanyUser>(
            "SELECT * FROM company_users WHERE company_id = $1 ORDER BY id",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// True iff a membership row exists for (user, company).
    pub async fn has_company_access(
        &self,
        user_id: i64,
        company_id: i64,
    ) -> Result<bool, AppError> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM company_users
                WHERE user_id = $1 AND company_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(exists)
    }

    /// Remove every membership of a company.
    pub async fn delete_company_users_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM company_users WHERE company_id = $1")
            .bind(company_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove one member's membership row.
    pub async fn delete_company_user_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
        user_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM company_users WHERE company_id = $1 AND user_id = $2")
            .bind(company_id)
            .bind(user_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove one member's role grants within a company.
    pub async fn delete_member_roles_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
        user_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM user_roles ur
            USING roles r
            WHERE ur.role_id = r.id AND r.company_id = $1 AND ur.user_id = $2
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .execute(conn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    // ==================== Catalog Operations ====================

    /// Find module by name.
    pub async fn find_module_by_name(&self, name: &str) -> Result<Option<Module>, AppError> {
        sqlx::query_as::<_, Module>("SELECT * FROM modules WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Insert a module.
    pub async fn insert_module(&self, name: &str, description: &str) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO modules (name, description) VALUES ($1, $2) RETURNING id",
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// All modules, stable order.
    pub async fn list_modules(&self) -> Result<Vec<Module>, AppError> {
        sqlx::query_as::<_, Module>("SELECT * FROM modules ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Find one action of a module.
    pub async fn find_module_action(
        &self,
        module_id: i64,
        name: &str,
    ) -> Result<Option<ModuleAction>, AppError> {
        sqlx::query_as::<_, ModuleAction>(
            "SELECT * FROM module_actions WHERE module_id = $1 AND name = $2",
        )
        .bind(module_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Insert a module action.
    pub async fn insert_module_action(
        &self,
        module_id: i64,
        name: &str,
        description: &str,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO module_actions (module_id, name, description) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(module_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// All module actions, stable order.
    pub async fn list_module_actions(&self) -> Result<Vec<ModuleAction>, AppError> {
        sqlx::query_as::<_, ModuleAction>(
            "SELECT * FROM module_actions ORDER BY module_id, name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Resolve (module name, action name) to the module action id.
    pub async fn module_action_id(
        &self,
        module_name: &str,
        action_name: &str,
    ) -> Result<Option<i64>, AppError> {
        let row: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT ma.id
            FROM module_actions ma
            JOIN modules m ON ma.module_id = m.id
            WHERE m.name = $1 AND ma.name = $2
            "#,
        )
        .bind(module_name)
        .bind(action_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(row.map(|(id,)| id))
    }

    // ==================== Role Operations ====================

    /// Insert a role. Duplicate (company, name) surfaces as Conflict.
    pub async fn insert_role(
        &self,
        company_id: Option<i64>,
        name: &str,
        description: &str,
    ) -> Result<Role, AppError> {
        sqlx::query_as::<_, Role>(
            r#"
            INSERT INTO roles (company_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Insert a role inside an open transaction.
    pub async fn insert_role_tx(
        &self,
        conn: &mut PgConnection,
        company_id: Option<i64>,
        name: &str,
        description: &str,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO roles (company_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(description)
        .fetch_one(conn)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Find role by ID.
    pub async fn find_role_by_id(&self, role_id: i64) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE id = $1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Find a role by scope and name. `None` scope matches global roles.
    pub async fn find_role_by_name(
        &self,
        company_id: Option<i64>,
        name: &str,
    ) -> Result<Option<Role>, AppError> {
        sqlx::query_as::<_, Role>(
            "SELECT * FROM roles WHERE company_id IS NOT DISTINCT FROM $1 AND name = $2",
        )
        .bind(company_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// All roles of a company.
    pub async fn list_roles_by_company(&self, company_id: i64) -> Result<Vec<Role>, AppError> {
        sqlx::query_as::<_, Role>("SELECT * FROM roles WHERE company_id = $1 ORDER BY name")
            .bind(company_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Remove every role grant pointing at a company's roles.
    pub async fn delete_user_roles_for_company_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM user_roles ur
            USING roles r
            WHERE ur.role_id = r.id AND r.company_id = $1
            "#,
        )
        .bind(company_id)
        .execute(conn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove every permission grant of a company's roles.
    pub async fn delete_role_permissions_for_company_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM role_permissions rp
            USING roles r
            WHERE rp.role_id = r.id AND r.company_id = $1
            "#,
        )
        .bind(company_id)
        .execute(conn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove a company's permissions and their module-action links.
    pub async fn delete_permissions_for_company_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            DELETE FROM permission_module_actions pma
            USING permissions p
            WHERE pma.permission_id = p.id AND p.company_id = $1
            "#,
        )
        .bind(company_id)
        .execute(&mut *conn)
        .await
        .map_err(map_db_err)?;

        sqlx::query("DELETE FROM permissions WHERE company_id = $1")
            .bind(company_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Remove a company's roles.
    pub async fn delete_roles_for_company_tx(
        &self,
        conn: &mut PgConnection,
        company_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM roles WHERE company_id = $1")
            .bind(company_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    // ==================== Permission Operations ====================

    /// Create a permission and its role association in one transaction: the
    /// permission is never observable without the association.
    pub async fn create_permission_with_role(
        &self,
        company_id: i64,
        name: &str,
        description: &str,
        role_id: i64,
    ) -> Result<Permission, AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        let permission = sqlx::query_as::<_, Permission>(
            r#"
            INSERT INTO permissions (company_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(description)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_db_err)?;

        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission.id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok(permission)
    }

    /// Insert a permission inside an open transaction.
    pub async fn insert_permission_tx(
        &self,
        conn: &mut PgConnection,
        company_id: Option<i64>,
        name: &str,
        description: &str,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO permissions (company_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(company_id)
        .bind(name)
        .bind(description)
        .fetch_one(conn)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Find permission by ID.
    pub async fn find_permission_by_id(
        &self,
        permission_id: i64,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>("SELECT * FROM permissions WHERE id = $1")
            .bind(permission_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// Permissions granted to a role.
    pub async fn list_permissions_by_role(
        &self,
        role_id: i64,
    ) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT p.* FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            WHERE rp.role_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(role_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Permissions visible to a company: its own plus the global catalog.
    pub async fn list_permissions_by_company(
        &self,
        company_id: i64,
    ) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE company_id = $1 OR company_id IS NULL ORDER BY name",
        )
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// The global catalog: company-absent permissions.
    pub async fn list_global_permissions(&self) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE company_id IS NULL ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Look up a catalog (company-absent) permission by name.
    pub async fn find_global_permission_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            "SELECT * FROM permissions WHERE name = $1 AND company_id IS NULL",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Insert a catalog permission.
    pub async fn create_global_permission(
        &self,
        name: &str,
        description: &str,
    ) -> Result<i64, AppError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO permissions (name, description)
            VALUES ($1, $2)
            RETURNING id
            "#,
        )
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(id)
    }

    /// Grant a permission to a role inside an open transaction.
    pub async fn insert_role_permission_tx(
        &self,
        conn: &mut PgConnection,
        role_id: i64,
        permission_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
            .bind(role_id)
            .bind(permission_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Atomically replace a role's permission set: delete-all then insert
    /// the new set in one transaction. Idempotent for a fixed set.
    pub async fn replace_role_permissions(
        &self,
        role_id: i64,
        permission_ids: &[i64],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        for permission_id in permission_ids {
            sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
                .bind(role_id)
                .bind(permission_id)
                .execute(&mut *tx)
                .await
                .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    /// Remove one permission grant from a role.
    pub async fn remove_role_permission(
        &self,
        role_id: i64,
        permission_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
            .bind(role_id)
            .bind(permission_id)
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// Module actions bundled by a permission.
    pub async fn module_actions_for_permission(
        &self,
        permission_id: i64,
    ) -> Result<Vec<ModuleAction>, AppError> {
        sqlx::query_as::<_, ModuleAction>(
            r#"
            SELECT ma.* FROM module_actions ma
            JOIN permission_module_actions pma ON ma.id = pma.module_action_id
            WHERE pma.permission_id = $1
            ORDER BY ma.module_id, ma.name
            "#,
        )
        .bind(permission_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Link a permission to a module action; already-linked pairs are a no-op.
    pub async fn link_permission_module_action(
        &self,
        permission_id: i64,
        module_action_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO permission_module_actions (permission_id, module_action_id)
            VALUES ($1, $2)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(permission_id)
        .bind(module_action_id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    /// Atomically replace a permission's module-action set.
    pub async fn replace_permission_module_actions(
        &self,
        permission_id: i64,
        module_action_ids: &[i64],
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query("DELETE FROM permission_module_actions WHERE permission_id = $1")
            .bind(permission_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;

        for module_action_id in module_action_ids {
            sqlx::query(
                r#"
                INSERT INTO permission_module_actions (permission_id, module_action_id)
                VALUES ($1, $2)
                "#,
            )
            .bind(permission_id)
            .bind(module_action_id)
            .execute(&mut *tx)
            .await
            .map_err(map_db_err)?;
        }

        tx.commit().await.map_err(map_db_err)?;
        Ok(())
    }

    /// Copy every module-action link of one permission onto another, inside
    /// an open transaction. Used when provisioning clones the catalog.
    pub async fn copy_permission_module_actions_tx(
        &self,
        conn: &mut PgConnection,
        from_permission_id: i64,
        to_permission_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO permission_module_actions (permission_id, module_action_id)
            SELECT $1, module_action_id
            FROM permission_module_actions
            WHERE permission_id = $2
            "#,
        )
        .bind(to_permission_id)
        .bind(from_permission_id)
        .execute(conn)
        .await
        .map_err(map_db_err)?;
        Ok(())
    }

    // ==================== UserRole Operations ====================

    /// Grant a role to a user. A duplicate grant surfaces as Conflict.
    pub async fn insert_user_role(&self, user_id: i64, role_id: i64) -> Result<UserRole, AppError> {
        sqlx::query_as::<_, UserRole>(
            "INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2) RETURNING *",
        )
        .bind(user_id)
        .bind(role_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)
    }

    /// Grant a role to a user inside an open transaction.
    pub async fn insert_user_role_tx(
        &self,
        conn: &mut PgConnection,
        user_id: i64,
        role_id: i64,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user_id)
            .bind(role_id)
            .execute(conn)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// All role grants of a user.
    pub async fn list_user_roles(&self, user_id: i64) -> Result<Vec<UserRole>, AppError> {
        sqlx::query_as::<_, UserRole>("SELECT * FROM user_roles WHERE user_id = $1 ORDER BY id")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)
    }

    /// True iff the user holds the global ROOT role.
    pub async fn is_root(&self, user_id: i64) -> Result<bool, AppError> {
        let (is_root,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_roles ur
                JOIN roles r ON ur.role_id = r.id
                WHERE ur.user_id = $1 AND r.name = 'ROOT' AND r.company_id IS NULL
            )
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(is_root)
    }

    /// The permission-check hot path: one query over the grant chain, no
    /// per-role lookups.
    pub async fn has_permission(
        &self,
        user_id: i64,
        module_action_id: i64,
    ) -> Result<bool, AppError> {
        let (allowed,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM user_roles ur
                JOIN role_permissions rp ON ur.role_id = rp.role_id
                JOIN permission_module_actions pma ON rp.permission_id = pma.permission_id
                WHERE ur.user_id = $1 AND pma.module_action_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(module_action_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;
        Ok(allowed)
    }

    /// Every distinct permission a user holds through any role.
    pub async fn user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, AppError> {
        sqlx::query_as::<_, Permission>(
            r#"
            SELECT DISTINCT p.* FROM permissions p
            JOIN role_permissions rp ON p.id = rp.permission_id
            JOIN user_roles ur ON rp.role_id = ur.role_id
            WHERE ur.user_id = $1
            ORDER BY p.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)
    }
}
