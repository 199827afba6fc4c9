use axum::{routing::{get, patch}, Router};

use crate::state::AppState;

use super::notification_handlers;

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(notification_handlers::get_notifications))
        .route("/:id/read", patch(notification_handlers::mark_notification_read))
}
