use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive},
        IntoResponse, Sse,
    },
    Json,
};
use futures::stream::Stream;
use std::convert::Infallible;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::{ApiResponse, PageQuery, PageRequest},
    error::Result,
    extract::{AppJson, AppPath, AppQuery},
    middleware::AuthUser,
    state::AppState,
    message::{
        message_dto::{EditMessageRequest, SendMessageRequest},
        message_models::MessageDetail,
        message_service::OutgoingMessage,
    },
};

/// Send a message to a conversation
#[utoipa::path(
    post,
    path = "/api/v1/conversations/{id}/messages",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Conversation ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = MessageDetail),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Not a participant"),
        (status = 404, description = "Reply target not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
    AppJson(payload): AppJson<SendMessageRequest>,
) -> Result<impl IntoResponse> {
    let message = state
        .message_service
        .send(
            conversation_id,
            user_id,
            OutgoingMessage {
                message_type: payload.message_type,
                content: payload.content,
                file_url: payload.file_url,
                reply_to_message_id: payload.reply_to_message_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success("Message sent", message))))
}

/// Message history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/conversations/{id}/messages",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Conversation ID"), PageQuery),
    responses(
        (status = 200, description = "Messages retrieved"),
        (status = 403, description = "Not a participant")
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_messages(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(conversation_id): AppPath<Uuid>,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<impl IntoResponse> {
    let page = PageRequest::from_query(&query, PageRequest::MESSAGES_DEFAULT);
    let messages = state
        .message_service
        .list(conversation_id, user_id, page)
        .await?;

    Ok(Json(ApiResponse::success("Messages retrieved", messages)))
}

/// Edit one of your own text messages
#[utoipa::path(
    put,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Message ID")),
    request_body = EditMessageRequest,
    responses(
        (status = 200, description = "Message edited", body = MessageDetail),
        (status = 403, description = "Not the sender"),
        (status = 404, description = "Message not found"),
        (status = 422, description = "Message type cannot be edited")
    ),
    security(("bearer_auth" = []))
)]
pub async fn edit_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(message_id): AppPath<Uuid>,
    AppJson(payload): AppJson<EditMessageRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let message = state
        .message_service
        .edit(message_id, user_id, payload.content)
        .await?;

    Ok(Json(ApiResponse::success("Message edited", message)))
}

/// Delete one of your own messages
#[utoipa::path(
    delete,
    path = "/api/v1/messages/{id}",
    tag = "messages",
    params(("id" = Uuid, Path, description = "Message ID")),
    responses(
        (status = 200, description = "Message deleted"),
        (status = 403, description = "Not the sender"),
        (status = 404, description = "Message not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(message_id): AppPath<Uuid>,
) -> Result<impl IntoResponse> {
    state.message_service.delete(message_id, user_id).await?;

    Ok(Json(ApiResponse::message("Message deleted")))
}

/// Real-time message events (SSE)
#[utoipa::path(
    get,
    path = "/api/v1/messages/stream",
    tag = "messages",
    responses(
        (status = 200, description = "Message stream established"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn message_stream(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let rx = state.message_tx.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |result| match result {
        Ok(event) if event.recipients.contains(&user_id) => {
            let json = serde_json::to_string(&event).ok()?;
            Some(Ok(Event::default().event("message").data(json)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
