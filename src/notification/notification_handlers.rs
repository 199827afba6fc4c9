use crate::{
    dto::{ApiResponse, Page, PageQuery, PageRequest},
    error::{AppError, Result},
    extract::{AppPath, AppQuery},
    middleware::AuthUser,
    notification::notification_models::Notification,
    state::AppState,
};
use axum::{extract::State, Json};
use uuid::Uuid;

/// Inbox notifications for the authenticated user, newest first
#[utoipa::path(
    get,
    path = "/api/v1/notifications",
    params(PageQuery),
    responses(
        (status = 200, description = "List of notifications"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn get_notifications(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<ApiResponse<Page<Notification>>>> {
    let page = PageRequest::from_query(&query, PageRequest::NOTIFICATIONS_DEFAULT);
    let rows = state
        .notification_repository
        .find_page_by_user(user_id, page)
        .await?;

    Ok(Json(ApiResponse::success(
        "Notifications retrieved",
        Page::from_overfetch(rows, page),
    )))
}

/// Mark notification as read
#[utoipa::path(
    patch,
    path = "/api/v1/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification marked as read", body = Notification),
        (status = 404, description = "Notification not found"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "notifications",
    security(("bearer_auth" = []))
)]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    AppPath(notification_id): AppPath<Uuid>,
) -> Result<Json<ApiResponse<Notification>>> {
    let notification = state
        .notification_repository
        .mark_as_read(notification_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))?;

    Ok(Json(ApiResponse::success("Notification marked as read", notification)))
}
