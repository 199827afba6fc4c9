use crate::error::{AppError, Result};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ACCESS_TOKEN: &str = "access";
pub const REFRESH_TOKEN: &str = "refresh";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub email: String,
    pub token_type: String,
    pub jti: String,
    pub exp: i64,
}

fn sign(user_id: Uuid, email: &str, token_type: &str, ttl: Duration, secret: &str) -> Result<String> {
    let expiration = Utc::now()
        .checked_add_signed(ttl)
        .ok_or(AppError::InternalError)?
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        email: email.to_string(),
        token_type: token_type.to_string(),
        jti: Uuid::new_v4().to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AppError::InternalError)
}

/// Short-lived token presented on every protected request
pub fn create_access_token(user_id: Uuid, email: &str, secret: &str, minutes: i64) -> Result<String> {
    sign(user_id, email, ACCESS_TOKEN, Duration::minutes(minutes), secret)
}

/// Long-lived token, also persisted so it can be revoked
pub fn create_refresh_token(user_id: Uuid, email: &str, secret: &str, days: i64) -> Result<String> {
    sign(user_id, email, REFRESH_TOKEN, Duration::days(days), secret)
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthenticated("Invalid token".to_string()))
}

/// Resolves an `Authorization` header value to the authenticated user id.
pub fn resolve_bearer(header: Option<&str>, secret: &str) -> Result<Uuid> {
    let header = header
        .ok_or_else(|| AppError::Unauthenticated("Authorization header required".to_string()))?;

    let token = match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            token.trim()
        }
        _ => {
            return Err(AppError::Unauthenticated(
                "Invalid authorization header format".to_string(),
            ))
        }
    };

    let claims = verify_jwt(token, secret)?;
    if claims.token_type != ACCESS_TOKEN {
        return Err(AppError::Unauthenticated("Invalid token".to_string()));
    }

    Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthenticated("Invalid token".to_string()))
}
