use crate::{auth::resolve_bearer, error::AppError, state::AppState};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, Request},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let user_id = resolve_bearer(auth_header, &state.config.jwt_secret)?;

    // Signature alone is not enough; the subject must still exist.
    if !state.user_repository.exists(user_id).await? {
        return Err(AppError::Unauthenticated("Invalid token".to_string()));
    }

    req.extensions_mut().insert(AuthUser(user_id));

    Ok(next.run(req).await)
}

/// Authenticated caller, placed in request extensions by [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .copied()
            .ok_or_else(|| AppError::Unauthenticated("Authorization header required".to_string()))
    }
}
