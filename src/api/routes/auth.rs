//! Auth Routes
//!
//! - POST /api/auth/login - Exchange email/password for a token
//! - POST /api/auth/register - Create an account and return a token

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{AuthResponse, LoginRequest, RegisterRequest};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    if req.email.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    let user = state.users.authenticate(&req.email, &req.password).await?;
    let token = state.tokens.issue(&user)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(AuthResponse { token, user }))
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    if req.email.is_empty() || req.password.is_empty() || req.name.is_empty() {
        return Err(ApiError::Validation(
            "Email, password, and name are required".to_string(),
        ));
    }

    let user = state
        .users
        .register(&req.email, &req.password, &req.name)
        .await?;
    let token = state.tokens.issue(&user)?;

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}
