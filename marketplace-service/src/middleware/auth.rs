use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::{models::RoleSet, AppState};

/// Authenticated caller, resolved from the bearer token and the account it names.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub roles: RoleSet,
}

/// Middleware to require an active account behind a valid bearer token.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::Unauthorized(anyhow::anyhow!("Missing or invalid Authorization header"))
        })?;

    let claims = state.jwt.validate_access_token(token)?;

    let account = state
        .accounts
        .find(&claims.sub)
        .await?
        .filter(|account| account.is_active())
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Account not found or inactive")))?;

    tracing::Span::current().record("user_id", account.id.as_str());

    req.extensions_mut().insert(AuthUser {
        user_id: account.id,
        roles: account.roles,
    });

    Ok(next.run(req).await)
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Not authenticated")))
    }
}
