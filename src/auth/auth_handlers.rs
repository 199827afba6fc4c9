use crate::{
    dto::ApiResponse,
    error::Result,
    extract::AppJson,
    state::AppState,
};
use super::auth_dto::{AuthResponse, LoginRequest, RefreshTokenRequest, RefreshTokenResponse, RegisterRequest};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use validator::Validate;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Validation error"),
        (status = 409, description = "Username or email already taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let (user, tokens) = state
        .auth_service
        .register(
            &payload.username,
            &payload.email,
            &payload.password,
            payload.display_name.as_deref(),
        )
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            "User registered successfully",
            AuthResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                user: user.into(),
            },
        )),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let (user, tokens) = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;

    Ok(Json(ApiResponse::success(
        "Login successful",
        AuthResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            user: user.into(),
        },
    )))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Token refreshed successfully", body = RefreshTokenResponse),
        (status = 401, description = "Invalid or expired refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    let tokens = state
        .auth_service
        .refresh_access_token(&payload.refresh_token)
        .await?;

    Ok(Json(ApiResponse::success(
        "Token refreshed",
        RefreshTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        },
    )))
}

/// Logout (revoke refresh token)
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "Logged out successfully"),
        (status = 400, description = "Invalid input")
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse> {
    payload.validate()?;

    state.auth_service.logout(&payload.refresh_token).await?;
    Ok(Json(ApiResponse::message("Logged out")))
}
