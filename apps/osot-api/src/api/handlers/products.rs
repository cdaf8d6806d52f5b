use axum::{extract::State, Json};
use chrono::Utc;

use crate::domain::catalog::{Product, ProductStatus};
use crate::domain::record::{FieldFilter, RecordQuery};
use crate::domain::repository::RecordRepository;
use crate::error::AppResult;
use crate::state::AppState;

/// Products on sale today, no authentication required
///
/// GET /api/public/products
pub async fn list_public_products(State(state): State<AppState>) -> AppResult<Json<Vec<Product>>> {
    let query = RecordQuery::new()
        .filter(FieldFilter::eq("status", ProductStatus::Available))
        .order_by("name", false);
    let today = Utc::now().date_naive();

    let products = state
        .repo::<Product>()
        .find(&query)
        .await?
        .into_iter()
        .filter(|product| product.is_available_on(today))
        .collect();

    Ok(Json(products))
}
