use crate::{
    error::{AppError, Result},
    user::{
        user_dto::UpdateProfileRequest,
        user_models::UserResponse,
        user_repository::{ProfileChanges, UserRepository},
    },
};
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    user_repository: UserRepository,
}

impl UserService {
    pub fn new(user_repository: UserRepository) -> Self {
        Self { user_repository }
    }

    pub async fn get_current_user(&self, user_id: Uuid) -> Result<UserResponse> {
        let user = self
            .user_repository
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(user.into())
    }

    pub async fn update_current_user(
        &self,
        user_id: Uuid,
        payload: UpdateProfileRequest,
    ) -> Result<UserResponse> {
        let changes = ProfileChanges {
            display_name: payload.display_name,
            phone_number: payload.phone_number,
            avatar_url: payload.avatar_url,
            location: payload.location,
        };

        let user = self
            .user_repository
            .update_profile(user_id, changes)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        Ok(UserResponse::from(user))
    }
}
