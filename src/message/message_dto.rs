use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Checked by the service after the membership check.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    /// One of `text`, `image`, `file`; defaults to `text`
    #[serde(default = "default_message_type")]
    pub message_type: String,
    pub content: Option<String>,
    pub file_url: Option<String>,
    pub reply_to_message_id: Option<Uuid>,
}

fn default_message_type() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct EditMessageRequest {
    #[validate(length(min = 1, max = 5000))]
    pub content: String,
}
