use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::catalog::Product;
use super::record::{Access, Record, Validate};
use crate::error::{AppError, ErrorCode};
use crate::validation::{optional_text, required_text};

/// Largest accepted difference between a stored amount and its computed value
pub const TOTAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Lifecycle status of an order
///
/// # Status Transitions
/// ```text
/// Draft -> Pending -> Paid -> Refunded
///   |         |
///   +---------+--> Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Pending,
    Paid,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    /// Checks if a transition from current status to next status is valid
    ///
    /// # Example
    /// ```
    /// use osot_api::domain::order::OrderStatus;
    ///
    /// assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
    /// assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Cancelled));
    /// ```
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Draft, Pending)
                | (Draft, Cancelled)
                | (Pending, Paid)
                | (Pending, Cancelled)
                | (Paid, Refunded)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Draft => write!(f, "draft"),
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub item_subtotal: Decimal,
    pub tax: Decimal,
    pub item_total: Decimal,
}

/// Rounds a money amount to cents, halves away from zero
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() <= TOTAL_TOLERANCE
}

fn total_error(detail: String) -> AppError {
    AppError::with_detail(ErrorCode::InvalidOrderTotal, detail)
}

impl LineItem {
    /// Prices `quantity` units of a catalog product
    pub fn priced(product: &Product, quantity: u32, is_member: bool) -> Self {
        let unit_price = product.unit_price(is_member);
        let item_subtotal = round_money(unit_price * Decimal::from(quantity));
        let tax = round_money(item_subtotal * product.tax_rate / Decimal::ONE_HUNDRED);
        Self {
            product_id: Some(product.id),
            description: product.name.clone(),
            quantity,
            unit_price,
            item_subtotal,
            tax,
            item_total: item_subtotal + tax,
        }
    }

    fn check(&self, index: usize) -> Result<(), AppError> {
        if self.quantity == 0 {
            return Err(AppError::validation(format!(
                "items[{}].quantity must be greater than 0",
                index
            )));
        }
        if self.unit_price.is_sign_negative() || self.tax.is_sign_negative() {
            return Err(AppError::validation(format!(
                "items[{}] amounts cannot be negative",
                index
            )));
        }
        let expected = self.unit_price * Decimal::from(self.quantity);
        if !within_tolerance(expected, self.item_subtotal) {
            return Err(total_error(format!(
                "items[{}].item_subtotal {} does not match quantity x unit_price {}",
                index, self.item_subtotal, expected
            )));
        }
        if !within_tolerance(self.item_subtotal + self.tax, self.item_total) {
            return Err(total_error(format!(
                "items[{}].item_total {} does not match item_subtotal + tax",
                index, self.item_total
            )));
        }
        Ok(())
    }
}

/// Checks order arithmetic
///
/// # Rules
/// - At least one line item, each internally consistent
/// - `|sum(item_total) - total| <= 0.01`
/// - `|sum(item_subtotal) - subtotal| <= 0.01`
/// - `|subtotal + tax - total| <= 0.01`
/// - `subtotal <= total`
///
/// # Example
/// ```
/// use osot_api::domain::order::{check_order_totals, LineItem};
/// use rust_decimal::Decimal;
///
/// let item = LineItem {
///     product_id: None,
///     description: "Membership".to_string(),
///     quantity: 1,
///     unit_price: Decimal::new(10000, 2),
///     item_subtotal: Decimal::new(10000, 2),
///     tax: Decimal::new(1300, 2),
///     item_total: Decimal::new(11300, 2),
/// };
/// let ok = check_order_totals(&[item], Decimal::new(10000, 2), Decimal::new(1300, 2), Decimal::new(11301, 2));
/// assert!(ok.is_ok());
/// ```
pub fn check_order_totals(
    items: &[LineItem],
    subtotal: Decimal,
    tax: Decimal,
    total: Decimal,
) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::validation("An order needs at least one item"));
    }
    for (index, item) in items.iter().enumerate() {
        item.check(index)?;
    }
    if subtotal.is_sign_negative() || tax.is_sign_negative() {
        return Err(total_error("Order amounts cannot be negative".to_string()));
    }

    let items_total: Decimal = items.iter().map(|item| item.item_total).sum();
    if !within_tolerance(items_total, total) {
        return Err(total_error(format!(
            "total {} does not match the sum of line items {}",
            total, items_total
        )));
    }
    let items_subtotal: Decimal = items.iter().map(|item| item.item_subtotal).sum();
    if !within_tolerance(items_subtotal, subtotal) {
        return Err(total_error(format!(
            "subtotal {} does not match the sum of line items {}",
            subtotal, items_subtotal
        )));
    }
    if subtotal > total {
        return Err(total_error(format!(
            "subtotal {} exceeds total {}",
            subtotal, total
        )));
    }
    if !within_tolerance(subtotal + tax, total) {
        return Err(total_error(format!(
            "total {} does not match subtotal + tax",
            total
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    /// Assigned by the data platform
    pub order_number: Option<String>,
    pub account_id: Option<Uuid>,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub payment_reference: Option<String>,
    pub created_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDraft {
    #[serde(default)]
    pub account_id: Option<Uuid>,
    #[serde(default = "default_status")]
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub payment_reference: Option<String>,
}

fn default_status() -> OrderStatus {
    OrderStatus::Draft
}

impl OrderDraft {
    /// Builds a pending order from priced line items
    pub fn from_items(account_id: Uuid, items: Vec<LineItem>) -> Self {
        let subtotal = items.iter().map(|item| item.item_subtotal).sum();
        let tax = items.iter().map(|item| item.tax).sum();
        let total = items.iter().map(|item| item.item_total).sum();
        Self {
            account_id: Some(account_id),
            status: OrderStatus::Pending,
            items,
            subtotal,
            tax,
            total,
            payment_reference: None,
        }
    }
}

impl Validate for OrderDraft {
    fn validate(&mut self) -> Result<(), AppError> {
        if !matches!(self.status, OrderStatus::Draft | OrderStatus::Pending) {
            return Err(AppError::validation("New orders must be draft or pending"));
        }
        for (index, item) in self.items.iter_mut().enumerate() {
            item.description = required_text(&format!("items[{}].description", index), &item.description, 200)?;
        }
        self.payment_reference =
            optional_text("payment_reference", self.payment_reference.as_deref(), 100)?;
        check_order_totals(&self.items, self.subtotal, self.tax, self.total)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_reference: Option<String>,
    /// Set through the status endpoint only
    #[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

impl OrderPatch {
    pub fn status(status: OrderStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }
}

impl Validate for OrderPatch {
    fn validate(&mut self) -> Result<(), AppError> {
        if let Some(reference) = &self.payment_reference {
            self.payment_reference =
                optional_text("payment_reference", Some(reference.as_str()), 100)?;
        }
        Ok(())
    }
}

impl Record for Order {
    type Draft = OrderDraft;
    type Patch = OrderPatch;

    const RESOURCE: &'static str = "orders";
    const ACCESS: Access = Access::OwnedStaffWrite;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner(&self) -> Option<Uuid> {
        self.account_id
    }

    fn draft_owner(draft: &OrderDraft) -> Option<Uuid> {
        draft.account_id
    }

    fn assign_owner(draft: &mut OrderDraft, account_id: Uuid) {
        draft.account_id = Some(account_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ProductCategory, ProductStatus};
    use std::str::FromStr;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn item(qty: u32, unit: &str, tax: &str) -> LineItem {
        let unit_price = dec(unit);
        let item_subtotal = unit_price * Decimal::from(qty);
        let tax = dec(tax);
        LineItem {
            product_id: None,
            description: "Item".to_string(),
            quantity: qty,
            unit_price,
            item_subtotal,
            tax,
            item_total: item_subtotal + tax,
        }
    }

    fn product(tax_rate: &str) -> Product {
        Product {
            id: Uuid::new_v4(),
            product_code: "WS-1".to_string(),
            name: "Workshop".to_string(),
            description: None,
            category: ProductCategory::Event,
            status: ProductStatus::Available,
            general_price: dec("19.99"),
            member_price: Some(dec("14.99")),
            tax_rate: dec(tax_rate),
            inventory: None,
            start_date: None,
            end_date: None,
            image_url: None,
            created_on: None,
        }
    }

    #[test]
    fn tolerance_is_one_cent() {
        assert_eq!(TOTAL_TOLERANCE, dec("0.01"));
    }

    #[test]
    fn valid_transitions() {
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Pending));
        assert!(OrderStatus::Draft.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn invalid_transitions() {
        assert!(!OrderStatus::Draft.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Pending));
        assert!(!OrderStatus::Refunded.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn totals_within_a_cent_pass() {
        let items = vec![item(2, "10.00", "2.60"), item(1, "5.00", "0.65")];
        assert!(check_order_totals(&items, dec("25.00"), dec("3.25"), dec("28.25")).is_ok());
        assert!(check_order_totals(&items, dec("25.00"), dec("3.26"), dec("28.26")).is_ok());
    }

    #[test]
    fn total_off_by_more_than_a_cent_fails() {
        let items = vec![item(2, "10.00", "2.60")];
        let err = check_order_totals(&items, dec("20.00"), dec("2.62"), dec("22.62")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOrderTotal);
    }

    #[test]
    fn subtotal_above_total_fails() {
        let mut line = item(1, "10.00", "0.00");
        line.tax = dec("-0.01");
        line.item_total = dec("9.99");
        assert!(check_order_totals(&[line], dec("10.00"), dec("0"), dec("9.99")).is_err());

        let items = vec![item(1, "10.00", "0.00")];
        let err = check_order_totals(&items, dec("10.01"), dec("0"), dec("10.00")).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidOrderTotal);
    }

    #[test]
    fn empty_or_zero_quantity_orders_fail() {
        assert!(check_order_totals(&[], dec("0"), dec("0"), dec("0")).is_err());
        let mut line = item(1, "10.00", "0.00");
        line.quantity = 0;
        assert!(check_order_totals(&[line], dec("10"), dec("0"), dec("10")).is_err());
    }

    #[test]
    fn priced_line_rounds_tax_half_away_from_zero() {
        // 3 x 14.99 = 44.97; 13 % = 5.8461 -> 5.85
        let line = LineItem::priced(&product("13"), 3, true);
        assert_eq!(line.item_subtotal, dec("44.97"));
        assert_eq!(line.tax, dec("5.85"));
        assert_eq!(line.item_total, dec("50.82"));

        // 0.05 x 10 % = 0.005 -> 0.01
        let mut cheap = product("10");
        cheap.general_price = dec("0.05");
        let line = LineItem::priced(&cheap, 1, false);
        assert_eq!(line.tax, dec("0.01"));
    }

    #[test]
    fn draft_from_priced_items_validates() {
        let items = vec![
            LineItem::priced(&product("13"), 2, false),
            LineItem::priced(&product("5"), 1, true),
        ];
        let mut draft = OrderDraft::from_items(Uuid::new_v4(), items);
        assert_eq!(draft.status, OrderStatus::Pending);
        draft.validate().expect("consistent order");
    }

    #[test]
    fn new_orders_cannot_start_paid() {
        let mut draft = OrderDraft::from_items(Uuid::new_v4(), vec![item(1, "1.00", "0.00")]);
        draft.status = OrderStatus::Paid;
        assert!(draft.validate().is_err());
    }
}
