use axum::{routing::{get, put}, Router};

use crate::state::AppState;

use super::message_handlers;

pub fn message_routes() -> Router<AppState> {
    Router::new()
        .route("/stream", get(message_handlers::message_stream))
        .route(
            "/:id",
            put(message_handlers::edit_message).delete(message_handlers::delete_message),
        )
}
