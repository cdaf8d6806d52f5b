//! End-to-end API integration tests
//!
//! The first group runs without a database: every request is rejected before
//! any query is issued. Flows that persist data need a live Postgres and are
//! ignored unless `DATABASE_URL` is provided:
//!
//! ```text
//! DATABASE_URL=postgres://... cargo test -p portal-api -- --ignored
//! ```

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use portal_api::api::routes::build_router;
use portal_api::auth::jwt::create_token;
use portal_api::config::Config;
use portal_api::domain::account::AccountRole;
use portal_api::infrastructure::database;
use portal_api::state::AppState;
use serde_json::{json, Value};
use sqlx::postgres::PgPoolOptions;
use tower::util::ServiceExt; // for oneshot
use uuid::Uuid;

const SECRET: &str = "portal-integration-secret";

fn test_config() -> Config {
    Config {
        jwt_secret: SECRET.to_string(),
        ..Config::default()
    }
}

/// App over a pool that never connects; only for requests rejected up front
fn offline_app() -> Router {
    let config = test_config();
    let pool = PgPoolOptions::new()
        .connect_lazy(&config.database_url)
        .expect("valid database url");
    build_router(AppState::new(pool, config))
}

/// App over the database in `DATABASE_URL`, with `admin_email` bootstrapped
async fn setup_app(admin_email: &str) -> Router {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for integration tests");
    let pool = database::connect(&database_url, 2)
        .await
        .expect("Failed to connect to test database");
    database::migrate(&pool).await.expect("Failed to run migrations");

    let config = Config {
        database_url,
        admin_emails: vec![admin_email.to_string()],
        ..test_config()
    };
    build_router(AppState::new(pool, config))
}

async fn call(
    app: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let body = match body {
        Some(body) => {
            builder = builder.header("content-type", "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn unique_email(prefix: &str) -> String {
    format!("{}-{}@portal-test.io", prefix, Uuid::new_v4().simple())
}

/// Registers and logs in; returns `(account_id, token)`
async fn signed_in(app: &Router, email: &str, name: &str) -> (Uuid, String) {
    let password = "Str0ng!Passw0rd";
    let (status, body) = call(
        app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": email, "password": password, "full_name": name })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

    let (status, body) = call(
        app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);

    let id = body["account_id"].as_str().unwrap().parse().unwrap();
    (id, body["token"].as_str().unwrap().to_string())
}

fn member_token() -> String {
    create_token(Uuid::new_v4(), AccountRole::Member, SECRET, 1).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let app = offline_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"OK");
}

#[tokio::test]
async fn test_register_rejects_invalid_input_before_storage() {
    let app = offline_app();

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "not-an-email", "password": "Str0ng!Passw0rd", "full_name": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("email"));

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": "a@portal.io", "password": "weakpass", "full_name": "A" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Password must contain"));
}

#[tokio::test]
async fn test_protected_routes_require_valid_token() {
    let app = offline_app();

    let (status, body) = call(&app, "GET", "/api/accounts/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Missing authorization header");

    let (status, body) = call(&app, "GET", "/api/organizations", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid token"));

    let forged = create_token(Uuid::new_v4(), AccountRole::Admin, "another-secret", 1).unwrap();
    let (status, _) = call(&app, "GET", "/api/accounts", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_member_is_forbidden_from_admin_and_foreign_routes() {
    let app = offline_app();
    let token = member_token();

    let (status, body) = call(&app, "GET", "/api/accounts", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin role required");

    let uri = format!("/api/accounts/{}", Uuid::new_v4());
    let (status, _) = call(&app, "GET", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = call(&app, "DELETE", &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_organization_validates_before_storage() {
    let app = offline_app();
    let token = member_token();

    let (status, _) = call(
        &app,
        "POST",
        "/api/organizations",
        Some(&token),
        Some(json!({ "name": "Acme", "slug": "Not A Slug" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "POST",
        "/api/organizations",
        Some(&token),
        Some(json!({ "name": "Acme", "slug": "acme", "website": "javascript:alert(1)" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("javascript"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_register_login_and_profile_flow() {
    let admin_email = unique_email("admin");
    let app = setup_app(&admin_email).await;

    let (admin_id, admin_token) = signed_in(&app, &admin_email, "Root Admin").await;
    let member_email = unique_email("member");
    let (member_id, member_token) = signed_in(&app, &member_email, "Mia Member").await;

    // Duplicate registration
    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/register",
        None,
        Some(json!({ "email": member_email.to_uppercase(), "password": "Str0ng!Passw0rd", "full_name": "Dup" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Email already registered");

    // Wrong password
    let (status, _) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": member_email, "password": "Wr0ng!Passw0rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, me) = call(&app, "GET", "/api/accounts/me", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["role"], "admin");
    assert_eq!(me["id"], admin_id.to_string());
    assert!(me["last_login"].is_string());
    assert!(me.get("password_hash").is_none());

    // Self-service update
    let uri = format!("/api/accounts/{}", member_id);
    let (status, body) = call(
        &app,
        "PATCH",
        &uri,
        Some(&member_token),
        Some(json!({ "full_name": "  Mia M. Member " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["full_name"], "Mia M. Member");

    // A rejected update changes nothing, active flag included
    let (status, _) = call(
        &app,
        "PATCH",
        &uri,
        Some(&admin_token),
        Some(json!({ "email": admin_email, "is_active": false })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = call(&app, "GET", &uri, Some(&admin_token), None).await;
    assert_eq!(body["is_active"], true);
    assert_eq!(body["email"], member_email);

    // Only admins toggle the active flag
    let (status, _) = call(&app, "PATCH", &uri, Some(&member_token), Some(json!({ "is_active": false }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = call(&app, "PATCH", &uri, Some(&admin_token), Some(json!({ "is_active": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_active"], false);

    let (status, body) = call(
        &app,
        "POST",
        "/api/auth/login",
        None,
        Some(json!({ "email": member_email, "password": "Str0ng!Passw0rd" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Account is disabled");

    let (status, accounts) = call(&app, "GET", "/api/accounts?limit=200", Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(accounts.as_array().unwrap().iter().any(|a| a["id"] == member_id.to_string()));

    // Cleanup
    for id in [member_id, admin_id] {
        let uri = format!("/api/accounts/{}", id);
        let (status, _) = call(&app, "DELETE", &uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_organization_lifecycle_and_membership() {
    let admin_email = unique_email("admin");
    let app = setup_app(&admin_email).await;

    let (admin_id, admin_token) = signed_in(&app, &admin_email, "Root Admin").await;
    let (owner_id, owner_token) = signed_in(&app, &unique_email("owner"), "Olive Owner").await;
    let (member_id, member_token) = signed_in(&app, &unique_email("member"), "Mia Member").await;
    let (outsider_id, outsider_token) = signed_in(&app, &unique_email("outsider"), "Oscar Outsider").await;

    let slug = format!("acme-{}", &Uuid::new_v4().simple().to_string()[..8]);
    let (status, org) = call(
        &app,
        "POST",
        "/api/organizations",
        Some(&owner_token),
        Some(json!({ "name": "Acme Health", "slug": slug, "website": "HTTPS://Acme.ORG/about" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(org["owner_id"], owner_id.to_string());
    assert_eq!(org["website"], "https://acme.org/about");
    let org_id = org["id"].as_str().unwrap().to_string();

    // The creator joined the new organization
    let (_, me) = call(&app, "GET", "/api/accounts/me", Some(&owner_token), None).await;
    assert_eq!(me["organization_id"], org_id);

    let (status, _) = call(
        &app,
        "POST",
        "/api/organizations",
        Some(&member_token),
        Some(json!({ "name": "Copycat", "slug": slug })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Membership
    let members_uri = format!("/api/organizations/{}/members", org_id);
    let (status, _) = call(
        &app,
        "POST",
        &members_uri,
        Some(&member_token),
        Some(json!({ "account_id": member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, added) = call(
        &app,
        "POST",
        &members_uri,
        Some(&owner_token),
        Some(json!({ "account_id": member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(added["organization_id"], org_id);

    let (status, _) = call(
        &app,
        "POST",
        &members_uri,
        Some(&owner_token),
        Some(json!({ "account_id": member_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, members) = call(&app, "GET", &members_uri, Some(&member_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(members.as_array().unwrap().len(), 2);

    let (status, _) = call(&app, "GET", &members_uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // The owner stays in their organization
    let owner_uri = format!("{}/{}", members_uri, owner_id);
    let (status, _) = call(&app, "DELETE", &owner_uri, Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Lifecycle
    let org_uri = format!("/api/organizations/{}", org_id);
    let status_uri = format!("{}/status", org_uri);
    let (status, body) = call(&app, "POST", &status_uri, Some(&owner_token), Some(json!({ "status": "suspended" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "suspended");

    let (status, _) = call(&app, "POST", &status_uri, Some(&admin_token), Some(json!({ "status": "archived" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(&app, "PATCH", &org_uri, Some(&owner_token), Some(json!({ "name": "Renamed" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "POST", &status_uri, Some(&owner_token), Some(json!({ "status": "active" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Members may still leave an archived organization
    let member_uri = format!("{}/{}", members_uri, member_id);
    let (status, _) = call(&app, "DELETE", &member_uri, Some(&member_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    // Owners cannot be deleted while they own an organization
    let (status, _) = call(&app, "DELETE", &format!("/api/accounts/{}", owner_id), Some(&admin_token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = call(&app, "DELETE", &org_uri, Some(&outsider_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = call(&app, "DELETE", &org_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = call(&app, "GET", &org_uri, Some(&owner_token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, me) = call(&app, "GET", "/api/accounts/me", Some(&owner_token), None).await;
    assert!(me["organization_id"].is_null());

    // Cleanup
    for id in [member_id, owner_id, outsider_id, admin_id] {
        let uri = format!("/api/accounts/{}", id);
        let (status, _) = call(&app, "DELETE", &uri, Some(&admin_token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }
}
