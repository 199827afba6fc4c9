use async_trait::async_trait;
use crate::error::Result;
use sqlx::PgPool;
use uuid::Uuid;
use super::{
    user_directory::UserDirectory,
    user_models::{User, UserSummary},
};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub display_name: Option<&'a str>,
    pub password_hash: &'a str,
}

#[derive(Default)]
pub struct ProfileChanges {
    pub display_name: Option<String>,
    pub phone_number: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
}

#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_with_tx(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        new_user: NewUser<'_>,
    ) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (username, email, display_name, password_hash)
             VALUES ($1, $2, $3, $4)
             RETURNING *"
        )
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.display_name)
        .bind(new_user.password_hash)
        .fetch_one(&mut **tx)
        .await?;

        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn find_by_id(&self, user_id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    pub async fn exists(&self, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(exists)
    }

    pub async fn update_profile(&self, user_id: Uuid, changes: ProfileChanges) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET
                display_name = COALESCE($1, display_name),
                phone_number = COALESCE($2, phone_number),
                avatar_url = COALESCE($3, avatar_url),
                location = COALESCE($4, location),
                updated_at = NOW()
             WHERE id = $5
             RETURNING *"
        )
        .bind(changes.display_name)
        .bind(changes.phone_number)
        .bind(changes.avatar_url)
        .bind(changes.location)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_summary(&self, user_id: Uuid) -> Result<Option<UserSummary>> {
        let summary = sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, display_name, avatar_url FROM users WHERE id = $1"
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary)
    }
}
