use axum::{
    routing::{get, post, put},
    Router,
};

use crate::{message::message_handlers, state::AppState};

use super::conversation_handlers;

pub fn conversation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(conversation_handlers::list_conversations).post(conversation_handlers::create_conversation),
        )
        .route("/:id", get(conversation_handlers::get_conversation))
        .route(
            "/:id/messages",
            get(message_handlers::list_messages).post(message_handlers::send_message),
        )
        .route("/:id/read", put(conversation_handlers::mark_conversation_read))
        .route("/:id/unread", get(conversation_handlers::get_unread_count))
        .route("/:id/leave", post(conversation_handlers::leave_conversation))
        .route("/:id/mute", put(conversation_handlers::mute_conversation))
}
