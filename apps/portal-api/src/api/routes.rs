use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{accounts, auth, organizations};
use crate::state::AppState;

/// Build the portal router wired to the given state
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        // Health check
        .route("/health", get(auth::health_check))
        // Auth routes
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        // Account routes
        .route("/api/accounts/me", get(accounts::me))
        .route("/api/accounts", get(accounts::list_accounts))
        .route(
            "/api/accounts/:id",
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        )
        // Organization routes
        .route(
            "/api/organizations",
            get(organizations::list_organizations).post(organizations::create_organization),
        )
        .route(
            "/api/organizations/:id",
            get(organizations::get_organization)
                .patch(organizations::update_organization)
                .delete(organizations::delete_organization),
        )
        .route("/api/organizations/:id/status", post(organizations::change_status))
        .route(
            "/api/organizations/:id/members",
            get(organizations::list_members).post(organizations::add_member),
        )
        .route(
            "/api/organizations/:id/members/:account_id",
            delete(organizations::remove_member),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Shared state
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    layer.allow_origin(origins)
}
