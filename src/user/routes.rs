use axum::{routing::get, Router};

use crate::state::AppState;

use super::user_handlers;

pub fn user_routes() -> Router<AppState> {
    Router::new().route(
        "/me",
        get(user_handlers::get_current_user).put(user_handlers::update_current_user),
    )
}
