//! Account endpoints for the authenticated caller.
//!
//! - GET `/` - Profile
//! - PATCH `/` - Change display name
//! - DELETE `/` - Delete the account and all its sessions
//! - PATCH `/password` - Change password, revoking every session
//! - GET `/sessions` - List active sessions
//! - DELETE `/sessions/{id}` - Revoke a session (own session, or any as admin)

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::{StatusCode, header::SET_COOKIE},
    response::IntoResponse,
    routing::{delete, get, patch},
};
use serde::{Deserialize, Serialize};

use super::error::{ApiError, validate_uuid};
use crate::auth::{Auth, AuthService, clear_refresh_cookie};
use crate::impl_has_auth_backend;

#[derive(Clone)]
pub struct UsersState {
    pub auth: AuthService,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route(
            "/",
            get(get_profile).patch(update_profile).delete(delete_account),
        )
        .route("/password", patch(change_password))
        .route("/sessions", get(list_sessions))
        .route("/sessions/{id}", delete(revoke_session))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    display_name: String,
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileRequest {
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateProfileResponse {
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionInfo {
    id: String,
    ip: Option<String>,
    user_agent: Option<String>,
    /// Unix seconds
    created_at: i64,
    /// Unix seconds
    expires_at: i64,
}

#[derive(Serialize)]
struct ListSessionsResponse {
    sessions: Vec<SessionInfo>,
}

#[derive(Serialize)]
struct RevokeSessionResponse {
    revoked: bool,
}

async fn get_profile(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let profile = state.auth.profile(&user.uuid).await?;

    Ok(Json(ProfileResponse {
        display_name: profile.display_name,
        email: profile.email,
    }))
}

async fn update_profile(
    State(state): State<UsersState>,
    Auth(user): Auth,
    payload: Result<Json<UpdateProfileRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let display_name = payload.display_name.unwrap_or_default();
    let display_name = state
        .auth
        .update_display_name(&user.uuid, &display_name)
        .await?;

    Ok(Json(UpdateProfileResponse { display_name }))
}

async fn change_password(
    State(state): State<UsersState>,
    Auth(user): Auth,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let (Some(current), Some(new)) = (payload.current_password, payload.new_password) else {
        return Err(ApiError::bad_request("Fields must not be null"));
    };

    state.auth.change_password(&user.uuid, &current, &new).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_refresh_cookie(state.auth.config()))],
    ))
}

async fn delete_account(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.auth.delete_account(&user.uuid).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_refresh_cookie(state.auth.config()))],
    ))
}

async fn list_sessions(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state.auth.list_sessions(&user.uuid).await?;

    let sessions = sessions
        .into_iter()
        .map(|s| SessionInfo {
            id: s.uuid,
            ip: s.ip,
            user_agent: s.user_agent,
            created_at: s.created_at,
            expires_at: s.expires_at,
        })
        .collect();

    Ok(Json(ListSessionsResponse { sessions }))
}

async fn revoke_session(
    State(state): State<UsersState>,
    Auth(user): Auth,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    validate_uuid(&id)?;

    let revoked = state.auth.revoke_session(&user, &id).await?;

    Ok(Json(RevokeSessionResponse { revoked }))
}
