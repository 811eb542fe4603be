mod auth;
mod error;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::auth::AuthService;
use crate::rate_limit::RateLimitConfig;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(auth: AuthService, rate_limits: Arc<RateLimitConfig>) -> Router {
    let auth_state = auth::AuthState { auth: auth.clone() };
    let users_state = users::UsersState { auth };

    Router::new()
        .nest("/auth", auth::router(auth_state, rate_limits))
        .nest("/user", users::router(users_state))
}
