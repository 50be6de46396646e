use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
};
use serde::Deserialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::guard::{SESSION_GM_KEY, SESSION_USER_KEY};
use super::{ApiError, ApiResponse, AppState, MessageResponse, SessionGm, SessionUser, validation};
use crate::services::{GmLogin, UserLogin};

// ============================================================================
// Request Types
// ============================================================================

/// Login payload. Fields are optional so a missing field is reported as a
/// validation failure rather than a parse failure.
#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /user-login
/// Verify a player's credentials and open a player session
pub async fn user_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserLogin>>, ApiError> {
    let (username, password) = read_credentials(payload)?;
    validation::validate_username(&username)?;
    validation::validate_password(&password)?;

    let login = state.auth_service.user_login(&username, &password).await?;

    let identity = SessionUser {
        username: login.username.clone(),
        is_gm: false,
    };
    open_session(&session, &identity, None).await?;

    tracing::info!(username = %login.username, "User login successful");

    Ok(Json(ApiResponse::success_with_message(
        "Login successful",
        login,
    )))
}

/// POST /gm-login
/// Verify a Game Master's credentials and open a GM session
pub async fn gm_login(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<GmLogin>>, ApiError> {
    let (username, password) = read_credentials(payload)?;
    validation::validate_username(&username)?;
    validation::validate_password(&password)?;
    validation::validate_gm_username(&username)?;

    let login = state.auth_service.gm_login(&username, &password).await?;

    let identity = SessionUser {
        username: login.username.clone(),
        is_gm: true,
    };
    let gm = SessionGm {
        username: login.username.clone(),
        gm_level: login.gm_level,
        permissions: login.permissions.clone(),
    };
    open_session(&session, &identity, Some(&gm)).await?;

    tracing::info!(username = %login.username, gm_level = login.gm_level, "GM login successful");

    Ok(Json(ApiResponse::success_with_message(
        "GM login successful",
        login,
    )))
}

/// POST /logout
/// Drop the current session, player or GM
pub async fn logout(session: Session) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to clear session: {e}")))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

// ============================================================================
// Helpers
// ============================================================================

fn read_credentials(
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<(String, String), ApiError> {
    let Json(request) = payload.map_err(|rejection| match rejection {
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::UnsupportedMediaType("Content-Type must be application/json".to_string())
        }
        JsonRejection::JsonSyntaxError(_) => ApiError::validation("Invalid JSON in request body"),
        _ => ApiError::validation("Invalid request format"),
    })?;

    validation::require_credentials(request.username, request.password)
}

/// Rotate the session id and store the new identity. A GM login also
/// records the GM identity; a player login clears any stale one.
async fn open_session(
    session: &Session,
    user: &SessionUser,
    gm: Option<&SessionGm>,
) -> Result<(), ApiError> {
    session
        .cycle_id()
        .await
        .map_err(|e| ApiError::internal(format!("Failed to rotate session: {e}")))?;

    session
        .insert(SESSION_USER_KEY, user)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?;

    match gm {
        Some(gm) => session
            .insert(SESSION_GM_KEY, gm)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to create session: {e}")))?,
        None => {
            session
                .remove::<SessionGm>(SESSION_GM_KEY)
                .await
                .map_err(|e| ApiError::internal(format!("Session error: {e}")))?;
        }
    }

    Ok(())
}
