//! End-to-end request flow over in-memory storage: establish identity from a
//! bearer assertion, bind the tenant, authorize the action.

use std::sync::Arc;

use auth_identity::{
    IdentityConfig, IdentityService, InMemoryUserRepository, LoginRequest, RegisterRequest,
};
use auth_sessions::{DeviceInfo, InMemorySessionRepository, NoopRevocationCache, SessionService};
use auth_tokens::{TokenConfig, TokenService};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::Request;
use gateway::{require_permission, AuthState, CurrentUser, OrgScope, ORG_HEADER};
use tenancy::{
    InMemoryMembershipRepository, InMemoryOrganizationRepository, MembershipService,
    PermissionChecker, PlanTier, TenantResolver,
};

struct Harness {
    state: AuthState,
    memberships: MembershipService,
}

fn harness() -> Harness {
    let tokens = Arc::new(TokenService::new(TokenConfig {
        access_secret: "it-access".into(),
        refresh_secret: "it-refresh".into(),
        ..TokenConfig::default()
    }));
    let sessions = Arc::new(SessionService::new(
        Arc::new(InMemorySessionRepository::new()),
        Arc::new(NoopRevocationCache),
        tokens.clone(),
    ));
    let identity = Arc::new(IdentityService::new(
        Arc::new(InMemoryUserRepository::new()),
        sessions,
        tokens,
        IdentityConfig::default(),
    ));

    let membership_repo = Arc::new(InMemoryMembershipRepository::new());
    let org_repo = Arc::new(InMemoryOrganizationRepository::new());
    Harness {
        state: AuthState::new(
            identity,
            Arc::new(TenantResolver::new(membership_repo.clone())),
            Arc::new(PermissionChecker::new(membership_repo.clone())),
        ),
        memberships: MembershipService::new(org_repo, membership_repo),
    }
}

async fn register_and_login(harness: &Harness, email: &str) -> (uuid::Uuid, String) {
    harness
        .state
        .identity
        .register(
            RegisterRequest {
                email: email.into(),
                password: "Secret123!".into(),
                full_name: None,
            },
            DeviceInfo::default(),
        )
        .await
        .unwrap();
    let login = harness
        .state
        .identity
        .login(
            LoginRequest {
                email: email.into(),
                password: "Secret123!".into(),
            },
            DeviceInfo::default(),
        )
        .await
        .unwrap();
    (login.user_id, login.tokens.access_token)
}

fn authed_parts(harness: &Harness, access_token: &str, uri: &str) -> axum::http::request::Parts {
    let request = Request::builder()
        .uri(uri)
        .header(AUTHORIZATION, format!("Bearer {access_token}"))
        .body(())
        .unwrap();
    let (mut parts, _) = request.into_parts();
    parts.extensions.insert(harness.state.clone());
    parts
}

#[tokio::test]
async fn bearer_assertion_yields_identity_context() {
    let harness = harness();
    let (user_id, access_token) = register_and_login(&harness, "flow@x.com").await;

    let mut parts = authed_parts(&harness, &access_token, "/me");
    let user = CurrentUser::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(user.id, user_id);
    assert_eq!(user.email, "flow@x.com");
    assert!(!user.is_super_admin);
}

#[tokio::test]
async fn garbage_assertions_are_unauthorized() {
    let harness = harness();
    let mut parts = authed_parts(&harness, "not.a.jwt", "/me");
    let err = CurrentUser::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn org_scope_resolves_and_authorizes() {
    let harness = harness();
    let (user_id, access_token) = register_and_login(&harness, "flow@x.com").await;
    let (org, _) = harness
        .memberships
        .create_organization("Flow Corp", PlanTier::Starter, user_id)
        .await
        .unwrap();

    // Explicit header scoping.
    let mut parts = authed_parts(&harness, &access_token, "/tasks");
    parts
        .headers
        .insert(ORG_HEADER, org.id.to_string().parse().unwrap());
    let scope = OrgScope::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(scope.organization_id, org.id);

    // The creator is the owner, so every action label passes.
    require_permission(&harness.state, &scope.user, scope.organization_id, "create_project")
        .await
        .unwrap();
}

#[tokio::test]
async fn default_organization_is_the_oldest_membership() {
    let harness = harness();
    let (user_id, access_token) = register_and_login(&harness, "flow@x.com").await;
    let (org, _) = harness
        .memberships
        .create_organization("Flow Corp", PlanTier::Free, user_id)
        .await
        .unwrap();

    // No explicit source anywhere in the request.
    let mut parts = authed_parts(&harness, &access_token, "/tasks");
    let scope = OrgScope::from_request_parts(&mut parts, &()).await.unwrap();
    assert_eq!(scope.organization_id, org.id);
}

#[tokio::test]
async fn strangers_are_forbidden_without_leaking_existence() {
    let harness = harness();
    let (owner_id, _) = register_and_login(&harness, "owner@x.com").await;
    let (org, _) = harness
        .memberships
        .create_organization("Secret Corp", PlanTier::Business, owner_id)
        .await
        .unwrap();

    let (_, stranger_token) = register_and_login(&harness, "stranger@x.com").await;
    let mut parts = authed_parts(&harness, &stranger_token, "/tasks");
    parts
        .headers
        .insert(ORG_HEADER, org.id.to_string().parse().unwrap());

    let err = OrgScope::from_request_parts(&mut parts, &())
        .await
        .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn member_without_a_role_grant_is_denied_the_action() {
    let harness = harness();
    let (owner_id, _) = register_and_login(&harness, "owner@x.com").await;
    let (org, _) = harness
        .memberships
        .create_organization("Flow Corp", PlanTier::Free, owner_id)
        .await
        .unwrap();

    let (client_id, client_token) = register_and_login(&harness, "client@x.com").await;
    harness
        .memberships
        .add_member(org.id, client_id, "viewer")
        .await
        .unwrap();

    let mut parts = authed_parts(&harness, &client_token, "/tasks");
    parts
        .headers
        .insert(ORG_HEADER, org.id.to_string().parse().unwrap());
    let scope = OrgScope::from_request_parts(&mut parts, &()).await.unwrap();

    // Legacy "viewer" normalizes to the client role: read passes, task
    // creation does not.
    require_permission(&harness.state, &scope.user, scope.organization_id, "view_task")
        .await
        .unwrap();
    let err = require_permission(
        &harness.state,
        &scope.user,
        scope.organization_id,
        "create_task",
    )
    .await
    .unwrap_err();
    assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
}
