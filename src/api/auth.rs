//! Authentication endpoints.
//!
//! - POST `/register` - Create an account
//! - POST `/login` - Exchange credentials for an access token and refresh cookie
//! - POST `/refresh` - Rotate the refresh cookie and mint a new access token
//! - POST `/logout` - Revoke the refresh cookie's session and clear it

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::IntoResponse,
    routing::post,
};
use serde::Deserialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    AuthService, ClientInfo, REFRESH_COOKIE_NAME, clear_refresh_cookie, get_cookie,
    refresh_cookie,
};
use crate::impl_has_auth_backend;
use crate::rate_limit::{
    RateLimitConfig, RateLimitState, rate_limit_login, rate_limit_refresh, rate_limit_register,
};

#[derive(Clone)]
pub struct AuthState {
    pub auth: AuthService,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState, rate_limits: Arc<RateLimitConfig>) -> Router {
    let rate_limits = RateLimitState {
        limits: rate_limits,
        auth: state.auth.config().clone(),
    };

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_register,
        ));

    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            rate_limits.clone(),
            rate_limit_login,
        ));

    let refresh_router = Router::new()
        .route("/refresh", post(refresh))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(rate_limits, rate_limit_refresh));

    let logout_router = Router::new()
        .route("/logout", post(logout))
        .with_state(state);

    Router::new()
        .merge(register_router)
        .merge(login_router)
        .merge(refresh_router)
        .merge(logout_router)
}

const MISSING_FIELDS: &str = "Fields should not be empty.";

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest {
    email: Option<String>,
    password: Option<String>,
    display_name: Option<String>,
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

async fn register(
    State(state): State<AuthState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password), Some(display_name)) =
        (payload.email, payload.password, payload.display_name)
    else {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    };

    let user = state
        .auth
        .register(&email, &password, &display_name)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn login(
    State(state): State<AuthState>,
    ClientInfo(client): ClientInfo,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let (Some(email), Some(password)) = (payload.email, payload.password) else {
        return Err(ApiError::bad_request(MISSING_FIELDS));
    };

    let issued = state.auth.login(&email, &password, &client).await?;
    let cookie = refresh_cookie(&issued.refresh_token, state.auth.config());

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(issued.envelope)))
}

async fn refresh(
    State(state): State<AuthState>,
    ClientInfo(client): ClientInfo,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let raw_token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    let issued = state.auth.refresh(raw_token, &client).await?;
    let cookie = refresh_cookie(&issued.refresh_token, state.auth.config());

    Ok((StatusCode::OK, [(SET_COOKIE, cookie)], Json(issued.envelope)))
}

async fn logout(
    State(state): State<AuthState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let raw_token = get_cookie(&headers, REFRESH_COOKIE_NAME);

    state.auth.logout(raw_token).await?;

    Ok((
        StatusCode::NO_CONTENT,
        [(SET_COOKIE, clear_refresh_cookie(state.auth.config()))],
    ))
}
