//! Access validator integration tests.
//!
//! Identity resolution, membership checks, ROOT resolution, and
//! permission ownership branches.

mod common;

use authz_service::services::ActorContext;
use common::{sample_company, TestApp};
use service_core::error::ErrorKind;

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn user_without_roles_has_no_permissions() {
    // Arrange - a member with a membership but zero role grants
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@none.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("none"))
        .await
        .expect("provisioning failed");
    let member = app
        .state
        .companies
        .register_member(
            &owner,
            company.id,
            &authz_service::models::NewUser {
                email: "bare@none.test".to_string(),
                password_hash: "$argon2id$stub".to_string(),
                phone: "+1 555 0103".to_string(),
            },
        )
        .await
        .expect("member registration failed");

    // Act / Assert - membership alone grants nothing
    for action in ["create", "read", "update", "delete"] {
        let allowed = app
            .state
            .authorization
            .check_permission(member.user_id, "company", action)
            .await
            .expect("check failed");
        assert!(!allowed, "bare member holds company.{}", action);
    }
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn unknown_module_action_is_not_found() {
    // Arrange
    let app = TestApp::spawn().await;
    let (user_id, _) = app.seed_user("user@unknown.test").await;

    // Act
    let err = app
        .state
        .authorization
        .check_permission(user_id, "spaceship", "launch")
        .await
        .expect_err("unknown module action accepted");

    // Assert
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn anonymous_actor_is_unauthenticated() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@anon.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("anon"))
        .await
        .expect("provisioning failed");

    // Act
    let err = app
        .state
        .validator
        .resolve_company_access(&ActorContext::anonymous(), company.id)
        .await
        .expect_err("anonymous actor resolved");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Unauthenticated);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn membership_gates_company_access() {
    // Arrange
    let app = TestApp::spawn().await;
    let (owner_id, owner) = app.seed_user("owner@gate.test").await;
    let (_, stranger) = app.seed_user("stranger@gate.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("gate"))
        .await
        .expect("provisioning failed");

    // Act / Assert
    let resolved = app
        .state
        .validator
        .resolve_company_access(&owner, company.id)
        .await
        .expect("owner access denied");
    assert_eq!(resolved, owner_id);

    let err = app
        .state
        .validator
        .resolve_company_access(&stranger, company.id)
        .await
        .expect_err("stranger access granted");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn root_resolution_requires_the_global_role() {
    // Arrange
    let app = TestApp::spawn().await;
    let (root_id, root_actor) = app.seed_user("root@sys.test").await;
    let (_, plain_actor) = app.seed_user("plain@sys.test").await;
    app.grant_root(root_id).await;

    // Act / Assert
    let resolved = app
        .state
        .validator
        .resolve_root_access(&root_actor)
        .await
        .expect("root access denied");
    assert_eq!(resolved, root_id);

    let err = app
        .state
        .validator
        .resolve_root_access(&plain_actor)
        .await
        .expect_err("plain user resolved as root");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn root_without_membership_is_not_a_member() {
    // Arrange - ROOT grants system authority, not implicit membership
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@bypass.test").await;
    let (root_id, root_actor) = app.seed_user("root@bypass.test").await;
    app.grant_root(root_id).await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("bypass"))
        .await
        .expect("provisioning failed");

    // Act
    let err = app
        .state
        .validator
        .resolve_company_access(&root_actor, company.id)
        .await
        .expect_err("membership invented for root");

    // Assert
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn company_permission_ownership_follows_membership() {
    // Arrange - a company-scoped permission
    let app = TestApp::spawn().await;
    let (_, owner) = app.seed_user("owner@own.test").await;
    let (_, stranger) = app.seed_user("stranger@own.test").await;
    let company = app
        .state
        .companies
        .provision_company(&owner, &sample_company("own"))
        .await
        .expect("provisioning failed");
    let permission = app
        .state
        .store
        .list_permissions_by_company(company.id)
        .await
        .expect("list failed")
        .into_iter()
        .find(|p| p.company_id == Some(company.id))
        .expect("no company-scoped permission");

    // Act / Assert
    let owned = app
        .state
        .validator
        .resolve_permission_ownership(&owner, permission.id)
        .await
        .expect("member denied own permission");
    assert_eq!(owned.id, permission.id);

    let err = app
        .state
        .validator
        .resolve_permission_ownership(&stranger, permission.id)
        .await
        .expect_err("stranger resolved ownership");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn global_permission_ownership_requires_root() {
    // Arrange - a catalog permission and two actors
    let app = TestApp::spawn().await;
    let (root_id, root_actor) = app.seed_user("root@global.test").await;
    let (_, plain_actor) = app.seed_user("plain@global.test").await;
    app.grant_root(root_id).await;

    let global = app
        .state
        .store
        .list_global_permissions()
        .await
        .expect("list failed")
        .into_iter()
        .next()
        .expect("catalog empty");

    // Act / Assert
    let owned = app
        .state
        .validator
        .resolve_permission_ownership(&root_actor, global.id)
        .await
        .expect("root denied catalog permission");
    assert_eq!(owned.id, global.id);

    let err = app
        .state
        .validator
        .resolve_permission_ownership(&plain_actor, global.id)
        .await
        .expect_err("plain user owned catalog permission");
    assert_eq!(err.kind(), ErrorKind::Forbidden);
}

#[tokio::test]
#[ignore] // Requires PostgreSQL
async fn missing_role_or_permission_is_not_found() {
    // Arrange
    let app = TestApp::spawn().await;
    let (_, actor) = app.seed_user("user@missing.test").await;

    // Act / Assert
    let err = app
        .state
        .validator
        .resolve_role_access(&actor, 999_999)
        .await
        .expect_err("phantom role resolved");
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = app
        .state
        .validator
        .resolve_permission_ownership(&actor, 999_999)
        .await
        .expect_err("phantom permission resolved");
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
