pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod refresh_token;
pub mod validation;

use api::create_api_router;
use auth::AuthService;
use axum::Router;
use config::AuthConfig;
use db::Database;
use jwt::AccessTokenIssuer;
use rate_limit::RateLimitConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Token issuer/audience, TTLs and cookie settings
    pub auth: AuthConfig,
    /// RS256 signer and verifier for access tokens
    pub issuer: AccessTokenIssuer,
    pub rate_limits: RateLimitConfig,
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let auth = AuthService::new(
        config.db.clone(),
        config.issuer.clone(),
        config.auth.clone(),
    );

    let api_router = create_api_router(auth, Arc::new(config.rate_limits.clone()));

    Router::new().nest("/api", api_router)
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}
