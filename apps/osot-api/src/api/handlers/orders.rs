use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::api::middleware::auth::AuthUser;
use crate::api::middleware::json::ApiJson;
use crate::domain::account::{Account, AccountGroup, AccountStatus};
use crate::domain::catalog::{Product, ProductPatch};
use crate::domain::order::{LineItem, Order, OrderDraft, OrderPatch, OrderStatus};
use crate::domain::record::{Record, Validate};
use crate::domain::repository::RecordRepository;
use crate::error::{AppError, AppResult, ErrorCode};
use crate::state::AppState;

const MAX_CHECKOUT_ITEMS: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: u32,
}

/// Request body for checkout
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
}

/// Request body for an order status change
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: OrderStatus,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

/// Whether the account pays member prices
fn pays_member_price(account: &Account) -> bool {
    account.status == AccountStatus::Active
        && matches!(account.group, AccountGroup::Ot | AccountGroup::Ota)
}

/// Sums quantities per product, keeping first-seen order
fn merge_items(items: &[CheckoutItem]) -> AppResult<Vec<(Uuid, u32)>> {
    let mut lines: Vec<(Uuid, u32)> = Vec::with_capacity(items.len());
    for item in items {
        if item.quantity == 0 {
            return Err(AppError::validation("quantity must be greater than zero"));
        }
        match lines.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, quantity)) => {
                *quantity = quantity
                    .checked_add(item.quantity)
                    .ok_or_else(|| AppError::validation("quantity is too large"))?;
            }
            None => lines.push((item.product_id, item.quantity)),
        }
    }
    Ok(lines)
}

/// Price catalog items and create a pending order for the caller
///
/// POST /api/orders/checkout
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<Order>)> {
    if req.items.is_empty() {
        return Err(AppError::validation("An order needs at least one item"));
    }
    if req.items.len() > MAX_CHECKOUT_ITEMS {
        return Err(AppError::validation(format!(
            "An order can have at most {} items",
            MAX_CHECKOUT_ITEMS
        )));
    }

    let account = state
        .repo::<Account>()
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| AppError::new(ErrorCode::AccountNotFound))?;
    let is_member = pays_member_price(&account);

    let products = state.repo::<Product>();
    let today = Utc::now().date_naive();
    let lines = merge_items(&req.items)?;
    let mut items = Vec::with_capacity(lines.len());
    let mut reserved = Vec::new();

    for (product_id, quantity) in lines {
        let product = products
            .find_by_id(product_id)
            .await?
            .ok_or_else(|| AppError::not_found(Product::RESOURCE, product_id))?;
        if !product.is_available_on(today) {
            return Err(AppError::validation(format!(
                "{} is not available",
                product.product_code
            )));
        }
        if let Some(left) = product.inventory {
            if i64::from(quantity) > i64::from(left) {
                return Err(AppError::validation(format!(
                    "Only {} of {} left",
                    left, product.product_code
                )));
            }
            reserved.push((product.id, left - quantity as i32));
        }
        items.push(LineItem::priced(&product, quantity, is_member));
    }

    let mut draft = OrderDraft::from_items(account.id, items);
    draft.validate()?;
    let order = state.repo::<Order>().create(&draft).await?;

    for (product_id, left) in reserved {
        let patch = ProductPatch {
            inventory: Some(left),
            ..Default::default()
        };
        if let Err(e) = products.update(product_id, &patch).await {
            tracing::warn!(product_id = %product_id, error = %e, "Failed to update inventory");
        }
    }

    tracing::info!(
        order_id = %order.id,
        account_id = %account.id,
        total = %order.total,
        "Order created"
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// Move an order to a new status
///
/// Owners may cancel their own draft or pending orders; every other
/// change is staff only.
///
/// POST /api/orders/:id/status
pub async fn update_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<StatusRequest>,
) -> AppResult<Json<Order>> {
    let repo = state.repo::<Order>();
    let order = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found(Order::RESOURCE, id))?;

    let owner_cancel = req.status == OrderStatus::Cancelled && order.account_id == Some(user.id);
    if !owner_cancel {
        user.require_staff()?;
    }

    if !order.status.can_transition_to(req.status) {
        return Err(AppError::with_detail(
            ErrorCode::InvalidStatusTransition,
            format!("Cannot move order from {} to {}", order.status, req.status),
        ));
    }

    let mut patch = OrderPatch::status(req.status);
    patch.payment_reference = req.payment_reference;
    patch.validate()?;

    let order = repo.update(id, &patch).await?;
    tracing::info!(order_id = %id, status = %order.status, by = %user.id, "Order status changed");
    Ok(Json(order))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(product_id: Uuid, quantity: u32) -> CheckoutItem {
        CheckoutItem { product_id, quantity }
    }

    #[test]
    fn merge_items_sums_repeated_products() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let lines = merge_items(&[item(a, 3), item(b, 1), item(a, 3)]).unwrap();
        assert_eq!(lines, vec![(a, 6), (b, 1)]);
    }

    #[test]
    fn merge_items_rejects_zero_and_overflow() {
        let a = Uuid::new_v4();
        assert!(merge_items(&[item(a, 0)]).is_err());
        assert!(merge_items(&[item(a, u32::MAX), item(a, 1)]).is_err());
    }
}
