use std::collections::HashMap;

use async_trait::async_trait;
use auth_sessions::DeviceInfo;
use axum::extract::{FromRequestParts, Path, Query};
use axum::http::{header::AUTHORIZATION, header::USER_AGENT, request::Parts};
use tenancy::OrgSelection;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AuthState;

/// Header carrying an explicit organization id.
pub const ORG_HEADER: &str = "x-organization-id";

/// Device descriptor for session records: user agent plus the client
/// address as forwarded by the proxy in front of us.
pub fn device_info(parts: &Parts) -> DeviceInfo {
    let user_agent = parts
        .headers
        .get(USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(|ua| ua.to_string());
    let ip_address = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|ip| ip.trim().to_string());
    DeviceInfo {
        user_agent,
        ip_address,
    }
}

/// Organization remembered from an earlier request in the same session,
/// inserted as a request extension by the consuming application.
#[derive(Debug, Clone, Copy)]
pub struct RememberedOrg(pub Uuid);

/// Authenticated identity context, extracted from the `Authorization`
/// header. Verifies the access assertion and loads the live user record, so
/// deactivated or tombstoned accounts fail here.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub is_super_admin: bool,
}

/// Tenant-bound request context: the authenticated identity plus the single
/// organization id this request operates against.
#[derive(Debug, Clone)]
pub struct OrgScope {
    pub user: CurrentUser,
    pub organization_id: Uuid,
}

fn bearer_token(parts: &Parts) -> Result<String, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError::authentication("Missing Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .map(|token| token.to_string())
        .ok_or_else(|| {
            ApiError::authentication("Invalid Authorization header format. Expected: Bearer <token>")
        })
}

fn auth_state(parts: &Parts) -> Result<AuthState, ApiError> {
    parts
        .extensions
        .get::<AuthState>()
        .cloned()
        .ok_or_else(|| ApiError::internal("AuthState extension not configured"))
}

fn parse_org_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::validation("Invalid organization id"))
}

/// Collect explicit organization id sources from the request head. Body
/// fields cannot be read here; handlers that accept one pass it to
/// [`tenancy::TenantResolver::resolve`] via [`OrgSelection::from_body`]
/// after deserialization.
async fn org_selection<S: Send + Sync>(
    parts: &mut Parts,
    state: &S,
) -> Result<OrgSelection, ApiError> {
    let mut selection = OrgSelection::default();

    if let Ok(Path(params)) = Path::<HashMap<String, String>>::from_request_parts(parts, state).await
    {
        if let Some(raw) = params.get("org_id").or_else(|| params.get("organization_id")) {
            selection.path = Some(parse_org_id(raw)?);
        }
    }

    if let Ok(Query(params)) =
        Query::<HashMap<String, String>>::from_request_parts(parts, state).await
    {
        if let Some(raw) = params.get("organization_id") {
            selection.query = Some(parse_org_id(raw)?);
        }
    }

    if let Some(raw) = parts.headers.get(ORG_HEADER).and_then(|h| h.to_str().ok()) {
        selection.header = Some(parse_org_id(raw)?);
    }

    if let Some(RememberedOrg(id)) = parts.extensions.get::<RememberedOrg>() {
        selection.remembered = Some(*id);
    }

    Ok(selection)
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let state = auth_state(parts)?;
        let token = bearer_token(parts)?;
        let user = state.identity.authenticate_access(&token).await?;
        Ok(CurrentUser {
            id: user.id,
            email: user.email,
            is_super_admin: user.is_super_admin,
        })
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for OrgScope
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        let auth = auth_state(parts)?;
        let selection = org_selection(parts, state).await?;
        let organization_id = auth
            .resolver
            .resolve(user.id, user.is_super_admin, &selection)
            .await?;
        Ok(OrgScope {
            user,
            organization_id,
        })
    }
}

/// Route-layer permission gate: resolves the endpoint's action label through
/// the permission checker and rejects with an authorization error on deny.
pub async fn require_permission(
    state: &AuthState,
    user: &CurrentUser,
    organization_id: Uuid,
    action: &str,
) -> Result<(), ApiError> {
    let allowed = state
        .checker
        .has_permission(user.id, user.is_super_admin, organization_id, Some(action))
        .await?;
    if allowed {
        Ok(())
    } else {
        Err(ApiError::authorization(format!(
            "Permission denied: {action}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_for(request: Request<()>) -> Parts {
        request.into_parts().0
    }

    #[test]
    fn bearer_token_requires_the_scheme() {
        let parts = parts_for(
            Request::builder()
                .header(AUTHORIZATION, "Bearer abc.def.ghi")
                .body(())
                .unwrap(),
        );
        assert_eq!(bearer_token(&parts).unwrap(), "abc.def.ghi");

        let parts = parts_for(
            Request::builder()
                .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
                .body(())
                .unwrap(),
        );
        assert!(bearer_token(&parts).is_err());

        let parts = parts_for(Request::builder().body(()).unwrap());
        assert!(bearer_token(&parts).is_err());
    }

    #[tokio::test]
    async fn org_selection_reads_query_header_and_extension() {
        let query_org = Uuid::new_v4();
        let header_org = Uuid::new_v4();
        let remembered_org = Uuid::new_v4();

        let request = Request::builder()
            .uri(format!("/tasks?organization_id={query_org}"))
            .header(ORG_HEADER, header_org.to_string())
            .body(())
            .unwrap();
        let mut parts = parts_for(request);
        parts.extensions.insert(RememberedOrg(remembered_org));

        let selection = org_selection(&mut parts, &()).await.unwrap();
        assert_eq!(selection.query, Some(query_org));
        assert_eq!(selection.header, Some(header_org));
        assert_eq!(selection.remembered, Some(remembered_org));
        // Query outranks header and remembered.
        assert_eq!(selection.candidate(), Some(query_org));
    }

    #[test]
    fn device_info_reads_agent_and_forwarded_ip() {
        let parts = parts_for(
            Request::builder()
                .header(USER_AGENT, "Mozilla/5.0")
                .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
                .body(())
                .unwrap(),
        );
        let device = device_info(&parts);
        assert_eq!(device.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(device.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[tokio::test]
    async fn malformed_explicit_org_id_is_a_validation_error() {
        let request = Request::builder()
            .uri("/tasks")
            .header(ORG_HEADER, "not-a-uuid")
            .body(())
            .unwrap();
        let mut parts = parts_for(request);

        let err = org_selection(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation { .. }));
    }
}
