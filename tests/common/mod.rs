#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    extract::ConnectInfo,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use coffeenotes::{
    ServerConfig,
    auth::AuthService,
    config::AuthConfig,
    create_app,
    db::Database,
    jwt::AccessTokenIssuer,
    rate_limit::RateLimitConfig,
};
use std::net::SocketAddr;
use tower::ServiceExt;

pub const PRIVATE_PEM: &[u8] = include_bytes!("../fixtures/jwt_private.pem");
pub const PUBLIC_PEM: &[u8] = include_bytes!("../fixtures/jwt_public.pem");

pub const PASSWORD: &str = "Strong@123";

pub fn test_auth_config() -> AuthConfig {
    AuthConfig::new("coffeenotes-test", "coffeenotes-api").with_secure_cookies(false)
}

pub fn test_issuer(config: &AuthConfig) -> AccessTokenIssuer {
    AccessTokenIssuer::from_rsa_pem(PRIVATE_PEM, PUBLIC_PEM, config)
        .expect("Failed to load test keys")
}

pub fn test_service(db: Database) -> AuthService {
    let config = test_auth_config();
    AuthService::new(db, test_issuer(&config), config)
}

pub fn server_config(db: Database, auth: AuthConfig, rate_limits: RateLimitConfig) -> ServerConfig {
    ServerConfig {
        db,
        issuer: test_issuer(&auth),
        auth,
        rate_limits,
    }
}

/// App over an in-memory database with rate limits that never trigger.
pub async fn test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = server_config(db.clone(), test_auth_config(), RateLimitConfig::permissive());
    (create_app(&config), db)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: serde_json::Value,
}

impl TestResponse {
    /// The single Set-Cookie header value, if any.
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }

    /// Raw refresh token carried by the Set-Cookie header.
    pub fn refresh_token(&self) -> Option<String> {
        let cookie = self.set_cookie()?;
        let first = cookie.split(';').next()?;
        let value = first.strip_prefix("refresh_token=")?;
        (!value.is_empty()).then(|| value.to_string())
    }

    pub fn access_token(&self) -> String {
        self.json["accessToken"]
            .as_str()
            .expect("No access token in response")
            .to_string()
    }
}

/// Builder for a request against the test app.
pub struct TestRequest {
    method: Method,
    uri: String,
    cookie: Option<String>,
    bearer: Option<String>,
    body: Option<serde_json::Value>,
    raw_body: Option<(&'static str, String)>,
    headers: Vec<(String, String)>,
    peer: SocketAddr,
}

impl TestRequest {
    pub fn new(method: Method, uri: &str) -> Self {
        Self {
            method,
            uri: uri.to_string(),
            cookie: None,
            bearer: None,
            body: None,
            raw_body: None,
            headers: Vec::new(),
            peer: SocketAddr::from(([127, 0, 0, 1], 40000)),
        }
    }

    pub fn post(uri: &str) -> Self {
        Self::new(Method::POST, uri)
    }

    pub fn get(uri: &str) -> Self {
        Self::new(Method::GET, uri)
    }

    pub fn patch(uri: &str) -> Self {
        Self::new(Method::PATCH, uri)
    }

    pub fn delete(uri: &str) -> Self {
        Self::new(Method::DELETE, uri)
    }

    pub fn refresh_cookie(mut self, token: &str) -> Self {
        self.cookie = Some(format!("refresh_token={}", token));
        self
    }

    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Send `body` verbatim with the given content type.
    pub fn raw(mut self, content_type: &'static str, body: &str) -> Self {
        self.raw_body = Some((content_type, body.to_string()));
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn peer(mut self, ip: [u8; 4]) -> Self {
        self.peer = SocketAddr::from((ip, 40000));
        self
    }

    pub async fn send(self, app: &Router) -> TestResponse {
        let mut builder = Request::builder()
            .method(self.method)
            .uri(&self.uri)
            .header(header::USER_AGENT, "coffeenotes-tests");

        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        if let Some(token) = &self.bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let body = match (&self.body, &self.raw_body) {
            (Some(json), _) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            (None, Some((content_type, raw))) => {
                builder = builder.header(header::CONTENT_TYPE, *content_type);
                Body::from(raw.clone())
            }
            (None, None) => Body::empty(),
        };

        let mut request = builder.body(body).unwrap();
        request.extensions_mut().insert(ConnectInfo(self.peer));

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null)
        };

        TestResponse {
            status,
            headers,
            json,
        }
    }
}

/// Register an account through the API.
pub async fn register(app: &Router, email: &str, password: &str, display_name: &str) -> TestResponse {
    TestRequest::post("/api/auth/register")
        .json(serde_json::json!({
            "email": email,
            "password": password,
            "displayName": display_name,
        }))
        .send(app)
        .await
}

/// Log in through the API.
pub async fn login(app: &Router, email: &str, password: &str) -> TestResponse {
    TestRequest::post("/api/auth/login")
        .json(serde_json::json!({ "email": email, "password": password }))
        .send(app)
        .await
}

/// Register and log in; returns `(access_token, refresh_token)`.
pub async fn register_and_login(app: &Router, email: &str) -> (String, String) {
    let response = register(app, email, PASSWORD, "Tester").await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = login(app, email, PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);

    let refresh = response.refresh_token().expect("No refresh cookie");
    (response.access_token(), refresh)
}
