use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::account::errors::AccountError;
use crate::account::models::Principal;
use crate::account::models::Role;
use crate::account::ports::AccountServicePort;
use crate::inbound::http::handlers::ErrorNormalizer;
use crate::inbound::http::router::AppState;

/// Extension type carrying the authenticated principal through the request
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

/// Middleware that resolves the bearer token to a live principal and adds
/// it to the request extensions.
///
/// Rejects the request when the token is missing, does not verify, its
/// subject no longer exists, or the password changed after it was issued.
pub async fn protect(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let token = match extract_bearer_token(&req) {
        Some(token) => token,
        None => {
            tracing::warn!("Request without bearer token");
            return Err(state
                .errors
                .normalize(AccountError::NotLoggedIn)
                .into_response());
        }
    };

    let principal = state
        .account_service
        .authenticate(token)
        .await
        .map_err(|e| {
            tracing::warn!(error = %e, "Authentication failed");
            state.errors.normalize(e).into_response()
        })?;

    req.extensions_mut().insert(CurrentPrincipal(principal));

    Ok(next.run(req).await)
}

fn extract_bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Role allow-list for a protected route subtree.
#[derive(Debug, Clone)]
pub struct RoleSet(Vec<Role>);

impl RoleSet {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self(roles.into_iter().collect())
    }

    pub fn allows(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

/// Pure authorization decision, kept separate from the HTTP plumbing.
pub fn authorize(principal: &Principal, allowed: &RoleSet) -> Result<(), AccountError> {
    if allowed.allows(principal.role) {
        Ok(())
    } else {
        Err(AccountError::Forbidden)
    }
}

/// State for the role-restriction middleware.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub allowed: RoleSet,
    pub errors: ErrorNormalizer,
}

impl RouteGuard {
    pub fn new(allowed: RoleSet, errors: ErrorNormalizer) -> Self {
        Self { allowed, errors }
    }
}

/// Middleware restricting a route to the roles in the guard.
///
/// Composed after [`protect`]; a request that reaches it without an
/// authenticated principal is rejected as not logged in.
pub async fn restrict(
    State(guard): State<RouteGuard>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let current = match req.extensions().get::<CurrentPrincipal>() {
        Some(current) => current,
        None => {
            return Err(guard
                .errors
                .normalize(AccountError::NotLoggedIn)
                .into_response())
        }
    };

    authorize(&current.0, &guard.allowed).map_err(|e| {
        tracing::warn!(principal_id = %current.0.id, role = %current.0.role, "Access denied");
        guard.errors.normalize(e).into_response()
    })?;

    Ok(next.run(req).await)
}
