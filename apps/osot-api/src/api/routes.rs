use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api::handlers::{accounts, admin, auth, orders, products, records, registrations};
use crate::domain::catalog::{InsuranceProvider, Product};
use crate::domain::education::{OtEducation, OtaEducation};
use crate::domain::membership::{
    MembershipCategory, MembershipEmployment, MembershipPractices, MembershipPreferences,
};
use crate::domain::order::Order;
use crate::domain::profile::{Address, Contact, Identity};
use crate::infrastructure::dataverse::Table;
use crate::state::AppState;

/// Build the complete application router wired to the given state
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);

    let router = Router::new()
        // Health check
        .route("/health", get(auth::health_check))
        // Auth routes
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        // Accounts
        .route("/api/accounts", get(accounts::list_accounts))
        .route(
            "/api/accounts/:id",
            get(accounts::get_account)
                .patch(accounts::update_account)
                .delete(accounts::delete_account),
        )
        // Registration workflow
        .route("/api/registrations", post(registrations::stage))
        .route("/api/registrations/:id", get(registrations::get_registration))
        .route(
            "/api/registrations/:id/verify-email",
            post(registrations::verify_email),
        )
        .route("/api/registrations/:id/approve", post(registrations::approve))
        .route("/api/registrations/:id/reject", post(registrations::reject))
        .route("/api/registrations/:id/retry", post(registrations::retry))
        // Commerce
        .route("/api/public/products", get(products::list_public_products))
        .route("/api/orders/checkout", post(orders::checkout))
        .route("/api/orders/:id/status", post(orders::update_status))
        // Administration
        .route("/api/admin/cache", delete(admin::clear_cache))
        .route("/api/admin/cache/:resource", delete(admin::clear_resource_cache))
        .route("/api/admin/registrations", get(admin::list_registrations));

    let router = [
        resource::<Address>(),
        resource::<Contact>(),
        resource::<Identity>(),
        resource::<OtEducation>(),
        resource::<OtaEducation>(),
        resource::<MembershipCategory>(),
        resource::<MembershipEmployment>(),
        resource::<MembershipPractices>(),
        resource::<MembershipPreferences>(),
        resource::<Product>(),
        resource::<InsuranceProvider>(),
        resource::<Order>(),
    ]
    .into_iter()
    .fold(router, |router, routes| router.merge(routes));

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Generic CRUD routes for one record type under `/api/<resource>`
fn resource<R: Table>() -> Router<AppState> {
    let collection = format!("/api/{}", R::RESOURCE);
    let item = format!("/api/{}/:id", R::RESOURCE);

    Router::new()
        .route(&collection, get(records::list::<R>).post(records::create::<R>))
        .route(
            &item,
            get(records::get::<R>)
                .patch(records::update::<R>)
                .delete(records::delete::<R>),
        )
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
