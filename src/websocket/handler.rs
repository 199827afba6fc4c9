use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    middleware::AuthUser,
    state::AppState,
    websocket::types::{ClientMessage, ErrorPayload, ReadReceiptPayload, TypingPayload, WsMessage},
};

/// WebSocket upgrade handler
#[utoipa::path(
    get,
    path = "/api/v1/ws",
    tag = "realtime",
    responses(
        (status = 101, description = "Switching to the websocket protocol"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = []))
)]
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, user_id, state))
}

async fn handle_socket(socket: WebSocket, user_id: Uuid, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    let connection_id = state.ws_connections.add_connection(user_id, tx.clone());

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(json) = serde_json::to_string(&msg) {
                if sender.send(Message::Text(json)).await.is_err() {
                    break;
                }
            }
        }
    });

    let state_clone = state.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Err(e) = process_client_message(&text, user_id, &state_clone).await {
                        tracing::debug!(error = %e, %user_id, "rejected websocket message");
                        let _ = tx.send(WsMessage::Error(ErrorPayload {
                            message: client_error(&e),
                        }));
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.ws_connections.remove_connection(&user_id, &connection_id);
}

/// Same wording the HTTP envelope would use; internal details stay in the log.
fn client_error(err: &AppError) -> String {
    match err {
        AppError::Database(_) | AppError::InternalError => "Internal server error".to_string(),
        AppError::InvalidInput(msg)
        | AppError::Unauthenticated(msg)
        | AppError::Forbidden(msg)
        | AppError::NotFound(msg)
        | AppError::Conflict(msg)
        | AppError::InvalidOperation(msg) => msg.clone(),
    }
}

async fn process_client_message(text: &str, user_id: Uuid, state: &AppState) -> Result<()> {
    let client_msg: ClientMessage = serde_json::from_str(text)
        .map_err(|e| AppError::InvalidInput(format!("Invalid message format: {}", e)))?;

    match client_msg {
        ClientMessage::Typing {
            conversation_id,
            is_typing,
        } => {
            let others = state
                .conversation_service
                .other_participants(conversation_id, user_id)
                .await?;
            state.ws_connections.send_to_users(
                &others,
                WsMessage::Typing(TypingPayload {
                    conversation_id,
                    user_id,
                    is_typing,
                }),
            );
        }
        ClientMessage::MarkRead { conversation_id } => {
            let receipt = state
                .conversation_service
                .mark_read(conversation_id, user_id)
                .await?;
            let others = state
                .conversation_service
                .other_participants(conversation_id, user_id)
                .await
                .unwrap_or_default();
            state.ws_connections.send_to_users(
                &others,
                WsMessage::ReadReceipt(ReadReceiptPayload {
                    conversation_id,
                    user_id,
                    last_read_message_id: receipt.last_read_message_id,
                    last_read_at: receipt.last_read_at,
                }),
            );
        }
    }

    Ok(())
}
