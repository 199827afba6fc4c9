use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use uuid::Uuid;

use crate::{
    conversation::conversation_dto::{
        ConversationDetail, CreateConversationRequest, MuteRequest, ReadReceipt, UnreadCountResponse,
    },
    dto::{ApiResponse, PageQuery, PageRequest},
    error::Result,
    extract::{AppJson, AppPath, AppQuery},
    middleware::AuthUser,
    state::AppState,
};

/// Get or create a direct conversation with another user
#[utoipa::path(
    post,
    path = "/api/v1/conversations",
    tag = "conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "Conversation created", body = ConversationDetail),
        (status = 200, description = "Existing conversation returned", body = ConversationDetail),
        (status = 400, description = "Invalid input"),
        (status = 404, description = "User or product not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppJson(payload): AppJson<CreateConversationRequest>,
) -> Result<impl IntoResponse> {
    let resolved = state
        .conversation_service
        .get_or_create(user_id, payload.user_id, payload.product_id)
        .await?;

    let (status, message) = if resolved.created {
        (StatusCode::CREATED, "Conversation created")
    } else {
        (StatusCode::OK, "Conversation retrieved")
    };

    Ok((status, Json(ApiResponse::success(message, resolved.conversation))))
}

/// List the caller's conversations, most recently active first
#[utoipa::path(
    get,
    path = "/api/v1/conversations",
    tag = "conversations",
    params(PageQuery),
    responses(
        (status = 200, description = "Conversations retrieved"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = PageRequest::from_query(&query, PageRequest::CONVERSATIONS_DEFAULT);
    let conversations = state
        .conversation_service
        .list_conversations(user_id, page)
        .await?;

    Ok(Json(ApiResponse::success("Conversations retrieved", conversations)))
}

/// Get a single conversation
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Conversation retrieved", body = ConversationDetail),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    let conversation = state
        .conversation_service
        .get_conversation(conversation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success("Conversation retrieved", conversation)))
}

/// Mark the conversation as read up to its newest message
#[utoipa::path(
    put,
    path = "/api/v1/conversations/{id}/read",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Read cursor updated", body = ReadReceipt),
        (status = 404, description = "Conversation not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_conversation_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    let receipt = state
        .conversation_service
        .mark_read(conversation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success("Conversation marked as read", receipt)))
}

/// Count messages the caller has not read yet
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/unread",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Unread count", body = UnreadCountResponse),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_unread_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    let unread_count = state
        .conversation_service
        .unread_count(conversation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::success(
        "Unread count retrieved",
        UnreadCountResponse {
            conversation_id,
            unread_count,
        },
    )))
}

/// Leave a conversation
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/leave",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Left conversation"),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn leave_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .conversation_service
        .leave(conversation_id, user_id)
        .await?;

    Ok(Json(ApiResponse::message("Left conversation")))
}

/// Mute or unmute a conversation
#[utoipa::path(
    put,
    path = "/api/v1/conversations/{id}/mute",
    tag = "conversations",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = MuteRequest,
    responses(
        (status = 200, description = "Mute setting updated"),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn mute_conversation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
    AppJson(payload): AppJson<MuteRequest>,
) -> Result<impl IntoResponse> {
    let muted = state
        .conversation_service
        .set_muted(conversation_id, user_id, payload.muted)
        .await?;

    let message = if muted { "Conversation muted" } else { "Conversation unmuted" };
    Ok(Json(ApiResponse::message(message)))
}
