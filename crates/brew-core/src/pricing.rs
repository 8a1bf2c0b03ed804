//! # Pricing
//!
//! Assigns current catalog prices to order lines and totals them.
//!
//! Pricing runs on every create and every update, re-pricing all lines.
//! It never runs on close or on read: once an order is closed its
//! `total_cents` is history.

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MenuSnapshot, OrderItem, OrderItemDraft};

/// Lines with snapshot prices plus their total.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedOrder {
    pub items: Vec<OrderItem>,
    pub total: Money,
}

/// Prices each draft line at the snapshot's current price.
///
/// ## Errors
/// - [`CoreError::MenuItemNotFound`] if a line's menu item is not in the
///   snapshot. Validation normally catches this first.
/// - `OutOfRange` if a line total or the order total overflows
///
/// ## Example
/// ```rust
/// use brew_core::pricing::price_items;
/// use brew_core::types::{MenuItem, MenuSnapshot, OrderItemDraft};
///
/// let snapshot: MenuSnapshot = vec![MenuItem {
///     id: "latte".into(),
///     name: "Latte".into(),
///     description: "Espresso and milk".into(),
///     price_cents: 450,
///     ingredients: vec![],
/// }]
/// .into_iter()
/// .collect();
///
/// let priced = price_items(&[OrderItemDraft::new("latte", 2)], &snapshot).unwrap();
/// assert_eq!(priced.total.cents(), 900);
/// assert_eq!(priced.items[0].price_cents, 450);
/// ```
pub fn price_items(items: &[OrderItemDraft], snapshot: &MenuSnapshot) -> CoreResult<PricedOrder> {
    let mut priced = Vec::with_capacity(items.len());
    let mut total = Money::zero();

    for draft in items {
        let price = snapshot
            .price_of(&draft.menu_item_id)
            .ok_or_else(|| CoreError::MenuItemNotFound(draft.menu_item_id.clone()))?;

        total = price
            .checked_multiply_quantity(draft.quantity)
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| ValidationError::overflow("total"))?;
        priced.push(OrderItem {
            menu_item_id: draft.menu_item_id.clone(),
            quantity: draft.quantity,
            price_cents: price.cents(),
            customization: draft.customization.clone(),
        });
    }

    Ok(PricedOrder {
        items: priced,
        total,
    })
}
