use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100))]
    pub display_name: Option<String>,
    #[validate(length(min = 3, max = 32))]
    pub phone_number: Option<String>,
    #[validate(url)]
    pub avatar_url: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub location: Option<String>,
}
