use crate::auth::auth_repository::RefreshTokenRepository;
use crate::auth::jwt::{create_access_token, create_refresh_token, verify_jwt, REFRESH_TOKEN};
use crate::auth::password::{hash_password, verify_password};
use crate::db::DbPool;
use crate::error::{is_unique_violation, AppError, Result};
use crate::state::Config;
use crate::user::user_models::User;
use crate::user::user_repository::{NewUser, UserRepository};
use chrono::{Duration, Utc};
use uuid::Uuid;

/// Issued credential pair.
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct AuthService {
    db: DbPool,
    user_repo: UserRepository,
    refresh_token_repo: RefreshTokenRepository,
    jwt_secret: String,
    access_token_minutes: i64,
    refresh_token_days: i64,
}

impl AuthService {
    pub fn new(
        db: DbPool,
        user_repo: UserRepository,
        refresh_token_repo: RefreshTokenRepository,
        config: &Config,
    ) -> Self {
        Self {
            db,
            user_repo,
            refresh_token_repo,
            jwt_secret: config.jwt_secret.clone(),
            access_token_minutes: config.access_token_minutes,
            refresh_token_days: config.refresh_token_days,
        }
    }

    fn issue(&self, user_id: Uuid, email: &str) -> Result<TokenPair> {
        Ok(TokenPair {
            access_token: create_access_token(user_id, email, &self.jwt_secret, self.access_token_minutes)?,
            refresh_token: create_refresh_token(user_id, email, &self.jwt_secret, self.refresh_token_days)?,
        })
    }

    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(User, TokenPair)> {
        let password_hash = hash_password(password)?;

        let mut tx = self.db.begin().await?;

        let user = self
            .user_repo
            .create_with_tx(
                &mut tx,
                NewUser {
                    username,
                    email,
                    display_name,
                    password_hash: &password_hash,
                },
            )
            .await
            .map_err(|e| match e {
                AppError::Database(ref db_err) if is_unique_violation(db_err) => {
                    AppError::Conflict("User already exists".to_string())
                }
                other => other,
            })?;

        let tokens = self.issue(user.id, &user.email)?;

        let expires_at = Utc::now() + Duration::days(self.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &tokens.refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        tracing::info!(user_id = %user.id, "user registered");

        Ok((user, tokens))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<(User, TokenPair)> {
        let user = self
            .user_repo
            .find_by_email(email)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid credentials".into()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthenticated("Invalid credentials".into()));
        }

        let tokens = self.issue(user.id, &user.email)?;

        let mut tx = self.db.begin().await?;

        let expires_at = Utc::now() + Duration::days(self.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &tokens.refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        Ok((user, tokens))
    }

    /// Rotates a refresh token: the presented one is revoked and a new pair is issued.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = verify_jwt(refresh_token, &self.jwt_secret)?;
        if claims.token_type != REFRESH_TOKEN {
            return Err(AppError::Unauthenticated("Invalid refresh token".into()));
        }

        self.refresh_token_repo
            .find_by_token(refresh_token)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("Invalid refresh token".into()))?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthenticated("Invalid token claims".into()))?;

        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthenticated("User not found".into()))?;

        let tokens = self.issue(user.id, &user.email)?;

        let mut tx = self.db.begin().await?;

        // A concurrent refresh with the same token loses here.
        let revoked = self
            .refresh_token_repo
            .delete_by_token_with_tx(&mut tx, refresh_token)
            .await?;
        if revoked == 0 {
            return Err(AppError::Unauthenticated("Invalid refresh token".into()));
        }

        let expires_at = Utc::now() + Duration::days(self.refresh_token_days);
        self.refresh_token_repo
            .create_with_tx(&mut tx, user.id, &tokens.refresh_token, expires_at)
            .await?;

        tx.commit().await?;

        Ok(tokens)
    }

    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        self.refresh_token_repo.delete_by_token(refresh_token).await?;
        Ok(())
    }
}
