mod common;

use axum::http::StatusCode;
use coffeenotes::{create_app, db::Database, rate_limit::RateLimitConfig};
use common::{
    PASSWORD, TestRequest, login, register, register_and_login, server_config, test_app,
    test_auth_config,
};
use serde_json::json;

#[tokio::test]
async fn test_full_session_lifecycle() {
    let (app, _db) = test_app().await;

    let response = register(&app, "A@B.com", PASSWORD, "Alice").await;
    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json["email"], "a@b.com");
    assert_eq!(response.json["displayName"], "Alice");
    assert_eq!(response.json["role"], "USER");
    assert!(response.json["id"].as_str().is_some());
    assert!(response.json.get("passwordHash").is_none());

    let response = login(&app, "a@b.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["tokenType"], "Bearer");
    assert_eq!(response.json["expiresIn"], 900);
    let first_refresh = response.refresh_token().unwrap();

    let response = TestRequest::post("/api/auth/refresh")
        .refresh_cookie(&first_refresh)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.json["accessToken"].as_str().is_some());
    let second_refresh = response.refresh_token().unwrap();
    assert_ne!(first_refresh, second_refresh);

    let response = TestRequest::post("/api/auth/logout")
        .refresh_cookie(&second_refresh)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.set_cookie().unwrap().contains("Max-Age=0"));

    let response = TestRequest::post("/api/auth/refresh")
        .refresh_cookie(&second_refresh)
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json["error"], "Invalid refresh token.");
}

#[tokio::test]
async fn test_refresh_cookie_attributes() {
    let (app, _db) = test_app().await;
    register(&app, "a@b.com", PASSWORD, "Alice").await;

    let response = login(&app, "a@b.com", PASSWORD).await;
    let cookie = response.set_cookie().unwrap();

    assert!(cookie.starts_with("refresh_token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Lax"));
    assert!(cookie.contains("Path=/api/auth"));
    assert!(cookie.contains("Max-Age=1209600"));
    assert!(!cookie.contains("Secure"));
    // The raw token never appears in the body.
    assert!(response.json.get("refreshToken").is_none());
}

#[tokio::test]
async fn test_secure_cookie_when_enabled() {
    let db = Database::open(":memory:").await.unwrap();
    let auth = test_auth_config().with_secure_cookies(true);
    let app = create_app(&server_config(db, auth, RateLimitConfig::permissive()));

    register(&app, "a@b.com", PASSWORD, "Alice").await;
    let response = login(&app, "a@b.com", PASSWORD).await;
    assert!(response.set_cookie().unwrap().ends_with("; Secure"));
}

#[tokio::test]
async fn test_login_failures_share_response() {
    let (app, _db) = test_app().await;
    register(&app, "a@b.com", PASSWORD, "Alice").await;

    let unknown = login(&app, "nobody@b.com", PASSWORD).await;
    let wrong = login(&app, "a@b.com", "Wrong@1234").await;

    assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown.json, wrong.json);
    assert_eq!(unknown.json["error"], "Invalid credentials.");
    assert!(unknown.set_cookie().is_none());
}

#[tokio::test]
async fn test_register_conflict_and_validation() {
    let (app, _db) = test_app().await;

    assert_eq!(
        register(&app, "a@b.com", PASSWORD, "Alice").await.status,
        StatusCode::CREATED
    );

    let response = register(&app, " A@B.COM", PASSWORD, "Alice").await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.json["error"], "Email already registered.");

    let response = register(&app, "c@d.com ", PASSWORD, "Alice").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Email not valid.");

    let response = register(&app, "not-an-email", PASSWORD, "Alice").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Email not valid.");

    let response = register(&app, "c@d.com", "nosymbol123A", "Alice").await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json["error"],
        "Password does not meet the requirements."
    );
}

#[tokio::test]
async fn test_missing_fields_rejected() {
    let (app, _db) = test_app().await;

    let response = TestRequest::post("/api/auth/register")
        .json(json!({ "email": "a@b.com", "password": PASSWORD }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Fields should not be empty.");

    let response = TestRequest::post("/api/auth/login")
        .json(json!({ "email": "a@b.com" }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json["error"], "Fields should not be empty.");
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let (app, _db) = test_app().await;

    let missing = TestRequest::post("/api/auth/refresh").send(&app).await;
    let forged = TestRequest::post("/api/auth/refresh")
        .refresh_cookie("forged-token")
        .send(&app)
        .await;

    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json, forged.json);
}

#[tokio::test]
async fn test_logout_without_cookie_still_clears() {
    let (app, _db) = test_app().await;

    let response = TestRequest::post("/api/auth/logout").send(&app).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.set_cookie().unwrap().starts_with("refresh_token=;"));
}

#[tokio::test]
async fn test_refreshed_access_token_is_accepted() {
    let (app, _db) = test_app().await;
    let (_access, refresh) = register_and_login(&app, "a@b.com").await;

    let response = TestRequest::post("/api/auth/refresh")
        .refresh_cookie(&refresh)
        .send(&app)
        .await;
    let access = response.access_token();

    let response = TestRequest::get("/api/user").bearer(&access).send(&app).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json["email"], "a@b.com");
}

#[tokio::test]
async fn test_register_rate_limited_per_ip() {
    let db = Database::open(":memory:").await.unwrap();
    let app = create_app(&server_config(
        db,
        test_auth_config(),
        RateLimitConfig::new(),
    ));

    for i in 0..3 {
        let response = register(&app, &format!("user{i}@b.com"), PASSWORD, "User").await;
        assert_eq!(response.status, StatusCode::CREATED);
    }

    let response = register(&app, "user3@b.com", PASSWORD, "User").await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    // Another client address has its own budget.
    let response = TestRequest::post("/api/auth/register")
        .peer([10, 0, 0, 9])
        .json(json!({
            "email": "other@b.com",
            "password": PASSWORD,
            "displayName": "Other",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let (app, _db) = test_app().await;

    let cases = [
        TestRequest::post("/api/auth/login").raw("application/json", "{not json"),
        TestRequest::post("/api/auth/login").raw("text/plain", "email=a@b.com"),
        TestRequest::post("/api/auth/register").json(json!({ "email": 42, "password": PASSWORD })),
        TestRequest::post("/api/auth/register"),
    ];

    for request in cases {
        let response = request.send(&app).await;
        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(response.json["error"], "Invalid request body.");
    }
}

#[tokio::test]
async fn test_ip_header_shared_by_rate_limits_and_sessions() {
    let db = Database::open(":memory:").await.unwrap();
    let auth = test_auth_config().with_ip_header(Some("x-forwarded-for".to_string()));
    let app = create_app(&server_config(db, auth, RateLimitConfig::permissive()));

    let response = TestRequest::post("/api/auth/register")
        .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
        .json(json!({
            "email": "a@b.com",
            "password": PASSWORD,
            "displayName": "Alice",
        }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::CREATED);

    let response = TestRequest::post("/api/auth/login")
        .header("x-forwarded-for", "203.0.113.7")
        .json(json!({ "email": "a@b.com", "password": PASSWORD }))
        .send(&app)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let access = response.access_token();

    let response = TestRequest::get("/api/user/sessions")
        .bearer(&access)
        .send(&app)
        .await;
    assert_eq!(response.json["sessions"][0]["ip"], "203.0.113.7");

    // With a header configured the socket address is never used.
    let response = login(&app, "a@b.com", PASSWORD).await;
    assert_eq!(response.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_rate_limited_by_forwarded_ip() {
    let db = Database::open(":memory:").await.unwrap();
    let auth = test_auth_config().with_ip_header(Some("x-forwarded-for".to_string()));
    let app = create_app(&server_config(db, auth, RateLimitConfig::new()));

    let register_from = |client: &'static str, email: String| {
        TestRequest::post("/api/auth/register")
            .header("x-forwarded-for", client)
            .json(json!({
                "email": email,
                "password": PASSWORD,
                "displayName": "User",
            }))
    };

    for i in 0..3 {
        let response = register_from("203.0.113.5", format!("user{i}@b.com")).send(&app).await;
        assert_eq!(response.status, StatusCode::CREATED);
    }
    let response = register_from("203.0.113.5", "user3@b.com".to_string()).send(&app).await;
    assert_eq!(response.status, StatusCode::TOO_MANY_REQUESTS);

    let response = register_from("203.0.113.6", "user4@b.com".to_string()).send(&app).await;
    assert_eq!(response.status, StatusCode::CREATED);
}
