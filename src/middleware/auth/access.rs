//! Bearer token verification + permission check → `Claims` in request extensions
//!
//! - Each protected route declares its permission when it is registered:
//!   `protect(post(create_drink), &state, POST_DRINKS)`.
//! - The handler only runs after both the token and the permission checked out;
//!   it reads the claims through the `AuthClaims` extractor.
//! - Every failure is an `AppError::Auth(..)` (401).

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::{self, Next},
    response::Response,
    routing::MethodRouter,
};

use crate::error::AppError;
use crate::services::auth::{AuthService, permissions};
use crate::state::AppState;

/// Middleware state: the verifier plus the permission this route requires.
#[derive(Clone)]
pub struct PermissionGuard {
    auth: Arc<AuthService>,
    permission: &'static str,
}

/// Wrap `route` so it only runs for callers holding `permission`.
///
/// `route_layer` keeps the guard off unmatched methods, so a wrong method
/// still gets 405 rather than 401.
pub fn protect(
    route: MethodRouter<AppState>,
    state: &AppState,
    permission: &'static str,
) -> MethodRouter<AppState> {
    let guard = PermissionGuard {
        auth: state.auth.clone(),
        permission,
    };
    route.route_layer(middleware::from_fn_with_state(guard, access_middleware))
}

async fn access_middleware(
    State(guard): State<PermissionGuard>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    // Owned copy: the request itself is not Sync and must not be borrowed across the await.
    let authorization = req.headers().get(header::AUTHORIZATION).cloned();

    let claims = match guard.auth.authenticate(authorization.as_ref()).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                reason = err.code(),
                permission = guard.permission,
                "access token verification failed"
            );
            return Err(err.into());
        }
    };

    if let Err(err) = permissions::require(&claims, guard.permission) {
        tracing::warn!(
            reason = err.code(),
            subject = claims.subject(),
            permission = guard.permission,
            "permission check failed"
        );
        return Err(err.into());
    }

    tracing::debug!(
        subject = claims.subject(),
        audience = ?claims.audience(),
        expires_at = %claims.expires_at(),
        permission = guard.permission,
        "access granted"
    );

    // middleware → extractor
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}
