//! Company provisioning and deletion integration tests.
//!
//! Covers the atomic provisioning workflow (creator ends up fully
//! authorized) and the deletion cascade (no orphaned authorization rows).

mod common;

use common::{sample_company, TestApp};
use service_core::error::ErrorKind;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn provisioned_creator_holds_full_catalog() {
    // Arrange
    let app = TestApp::spawn().await;
    let (user_id, actor) = app.seed_user("owner@acme.test").await;

    // Act
    let company = app
        .state
        .companies
        .provision_company(&actor, &sample_company("acme"))
        .await
        .expect("provisioning failed");

    // Assert - creator can immediately perform every seeded module action
    for module in ["company", "user", "role"] {
        for action in ["create", "read", "update", "delete"] {
            let allowed = app
                .state
                .authorization
                .check_permission(user_id, module, action)
                .await
                .expect("check failed");
            assert!(allowed, "creator lacks {}.{}", module, action);
        }
    }

    // Contact fields come back decrypted, but the row at rest is ciphertext.
    assert_eq!(company.email, "ops@acme.test");
    let (stored_email,): (String,) =
        sqlx::query_as("SELECT email FROM companies WHERE id = $1")
            .bind(company.id)
            .fetch_one(&app.pool)
            .await
            .expect("company row missing");
    assert_eq!(stored_email, "enc:ops@acme.test");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn provisioning_with_empty_catalog_still_succeeds() {
    // Arrange - strip the global catalog; provisioning must tolerate it
    let app = TestApp::spawn().await;
    let (user_id, actor) = app.seed_user("owner@bare.test").await;
    sqlx::query(
        "DELETE FROM permission_module_actions WHERE permission_id IN \
         (SELECT id FROM permissions WHERE company_id IS NULL)",
    )
    .execute(&app.pool)
    .await
    .expect("failed to strip catalog links");
    sqlx::query("DELETE FROM permissions WHERE company_id IS NULL")
        .execute(&app.pool)
        .await
        .expect("failed to strip catalog");

    // Act
    let company = app
        .state
        .companies
        .provision_company(&actor, &sample_company("bare"))
        .await
        .expect("provisioning failed");

    // Assert - company and ADMIN exist, with zero grants
    let roles = app
        .state
        .authorization
        .list_roles(&actor, company.id)
        .await
        .expect("list_roles failed");
    assert_eq!(roles.len(), 1);
    assert_eq!(roles[0].role.name, "ADMIN");
    assert!(roles[0].permissions.is_empty());

    let perms = app
        .state
        .authorization
        .get_user_permissions(user_id)
        .await
        .expect("get_user_permissions failed");
    assert!(perms.is_empty());
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn duplicate_identifier_conflicts() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, actor) = app.seed_user("owner@dup.test").await;
    app.state
        .companies
        .provision_company(&actor, &sample_company("dup"))
        .await
        .expect("first provisioning failed");

    // Act
    let err = app
        .state
        .companies
        .provision_company(&actor, &sample_company("dup"))
        .await
        .expect_err("duplicate identifier accepted");

    // Assert - and the original row is untouched
    assert_eq!(err.kind(), ErrorKind::Conflict);
    let survivor = app
        .state
        .store
        .find_company_by_identifier("dup")
        .await
        .expect("lookup failed")
        .expect("original company missing");
    assert_eq!(survivor.name, "dup Inc");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn invalid_input_rejected_before_any_write() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, actor) = app.seed_user("owner@inv.test").await;
    let mut input = sample_company("inv");
    input.email = "not-an-email".to_string();

    // Act
    let err = app
        .state
        .companies
        .provision_company(&actor, &input)
        .await
        .expect_err("bad email accepted");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Invalid);
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM companies WHERE identifier = 'inv'")
            .fetch_one(&app.pool)
            .await
            .expect("count failed");
    assert_eq!(count, 0);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn deletion_leaves_no_orphans() {
    // Arrange
    let app = TestApp::spawn().await;
    let (user_id, actor) = app.seed_user("owner@gone.test").await;
    let company = app
        .state
        .companies
        .provision_company(&actor, &sample_company("gone"))
        .await
        .expect("provisioning failed");

    // Act
    app.state
        .companies
        .delete_company(&actor, company.id)
        .await
        .expect("deletion failed");

    // Assert - every company-linked authorization row is gone
    for (table, column) in [
        ("company_users", "company_id"),
        ("roles", "company_id"),
        ("permissions", "company_id"),
    ] {
        let (count,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {} WHERE {} = $1",
            table, column
        ))
        .bind(company.id)
        .fetch_one(&app.pool)
        .await
        .expect("count failed");
        assert_eq!(count, 0, "orphaned rows in {}", table);
    }

    let (grants,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM user_roles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&app.pool)
            .await
            .expect("count failed");
    assert_eq!(grants, 0);

    let err = app
        .state
        .companies
        .get_company(&actor, company.id)
        .await
        .expect_err("deleted company still readable");
    assert!(matches!(err.kind(), ErrorKind::NotFound | ErrorKind::Forbidden));
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn only_owner_or_root_may_delete() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@keep.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("keep"))
        .await
        .expect("provisioning failed");

    let member = app
        .state
        .companies
        .register_member(
            &owner,
            company.id,
            &authz_service::models::NewUser {
                email: "member@keep.test".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                phone: "+1 555 0101".to_string(),
            },
        )
        .await
        .expect("member registration failed");
    let member_actor =
        authz_service::services::ActorContext::authenticated(member.user_id);

    // Act
    let err = app
        .state
        .companies
        .delete_company(&member_actor, company.id)
        .await
        .expect_err("plain member deleted the company");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // A ROOT holder who is not a member can.
    let (root_id, root_actor) = app.seed_user("root@keep.test").await;
    app.grant_root(root_id).await;
    app.state
        .companies
        .delete_company(&root_actor, company.id)
        .await
        .expect("root deletion failed");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn only_root_sees_every_company() {
    // Arrange - two tenants owned by different users
    let app = TestApp::spawn().await;
    let (_, first_owner) = app.seed_user("owner@alpha.test").await;
    let (_, second_owner) = app.seed_user("owner@beta.test").await;
    app.state
        .companies
        .provision_company(&first_owner, &sample_company("alpha"))
        .await
        .expect("provisioning failed");
    app.state
        .companies
        .provision_company(&second_owner, &sample_company("beta"))
        .await
        .expect("provisioning failed");

    // Act / Assert - a plain member is refused the system-wide listing
    let err = app
        .state
        .companies
        .list_all_companies(&first_owner)
        .await
        .expect_err("plain member listed every company");
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // A ROOT holder sees both tenants, contact fields decrypted.
    let (root_id, root_actor) = app.seed_user("root@wide.test").await;
    app.grant_root(root_id).await;
    let companies = app
        .state
        .companies
        .list_all_companies(&root_actor)
        .await
        .expect("root listing failed");
    assert_eq!(companies.len(), 2);
    assert_eq!(companies[0].email, "ops@alpha.test");
    assert_eq!(companies[1].email, "ops@beta.test");

    // Their own membership view stays scoped to one tenant each.
    let own = app
        .state
        .companies
        .list_companies(&first_owner)
        .await
        .expect("member listing failed");
    assert_eq!(own.len(), 1);
    assert_eq!(own[0].identifier, "alpha");
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn removed_member_loses_membership_and_grants() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@churn.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("churn"))
        .await
        .expect("provisioning failed");
    let member = app
        .state
        .companies
        .register_member(
            &owner,
            company.id,
            &authz_service::models::NewUser {
                email: "temp@churn.test".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                phone: "+1 555 0104".to_string(),
            },
        )
        .await
        .expect("member registration failed");
    assert_eq!(
        app.state
            .companies
            .list_members(&owner, company.id)
            .await
            .expect("list_members failed")
            .len(),
        2
    );

    // Act
    app.state
        .companies
        .remove_member(&owner, company.id, member.user_id)
        .await
        .expect("removal failed");

    // Assert
    let members = app
        .state
        .companies
        .list_members(&owner, company.id)
        .await
        .expect("list_members failed");
    assert_eq!(members.len(), 1);
    assert!(members[0].is_main);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn owning_member_cannot_be_removed() {
    // Arrange
    let app = TestApp::spawn().await;
    let (owner_id, owner) = app.seed_user("owner@stay.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("stay"))
        .await
        .expect("provisioning failed");

    // Act
    let err = app
        .state
        .companies
        .remove_member(&owner, company.id, owner_id)
        .await
        .expect_err("owner removed themselves");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}
