//! # Recipe Requirements
//!
//! Turns order lines into per-ingredient stock requirements.
//!
//! ```text
//! 2 × latte  (espresso 1, milk 200)     espresso  2 + 1 = 3
//! 1 × mocha  (espresso 1, milk 150,  →  milk    400 + 150 = 550
//!             chocolate 30)             chocolate        30
//! ```
//!
//! Lines for the same ingredient are summed; output keeps the order in
//! which each ingredient first appears.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{MenuSnapshot, OrderItemDraft};

/// An amount of one ingredient required (or released) by an order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IngredientLine {
    pub ingredient_id: String,
    pub quantity: i64,
}

impl IngredientLine {
    pub fn new(ingredient_id: impl Into<String>, quantity: i64) -> Self {
        IngredientLine {
            ingredient_id: ingredient_id.into(),
            quantity,
        }
    }
}

/// A signed change to one ingredient's stock.
///
/// Negative deltas consume stock and are conditional on availability;
/// positive deltas return stock.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub ingredient_id: String,
    pub delta: i64,
}

impl StockAdjustment {
    #[inline]
    pub fn is_decrement(&self) -> bool {
        self.delta < 0
    }
}

/// Direction of a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaSign {
    /// Take stock out (reservation).
    Decrement,
    /// Put stock back (release / restock).
    Increment,
}

/// Converts requirement lines into adjustments in the given direction.
pub fn to_adjustments(lines: &[IngredientLine], sign: DeltaSign) -> Vec<StockAdjustment> {
    lines
        .iter()
        .map(|line| StockAdjustment {
            ingredient_id: line.ingredient_id.clone(),
            delta: match sign {
                DeltaSign::Decrement => -line.quantity,
                DeltaSign::Increment => line.quantity,
            },
        })
        .collect()
}

/// Sums recipe lines × ordered quantity per ingredient.
///
/// ## Errors
/// - [`CoreError::MenuItemNotFound`] if a line's menu item isn't in `snapshot`
/// - `OutOfRange` naming the ingredient whose requirement overflows
pub fn requirements_for(
    items: &[OrderItemDraft],
    snapshot: &MenuSnapshot,
) -> CoreResult<Vec<IngredientLine>> {
    let mut totals: Vec<IngredientLine> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let menu_item = snapshot
            .get(&item.menu_item_id)
            .ok_or_else(|| CoreError::MenuItemNotFound(item.menu_item_id.clone()))?;

        for recipe_line in &menu_item.ingredients {
            let overflow = || ValidationError::overflow(recipe_line.ingredient_id.clone());
            let needed = recipe_line
                .quantity
                .checked_mul(item.quantity)
                .ok_or_else(overflow)?;
            match index.get(&recipe_line.ingredient_id) {
                Some(&pos) => {
                    totals[pos].quantity = totals[pos]
                        .quantity
                        .checked_add(needed)
                        .ok_or_else(overflow)?;
                }
                None => {
                    index.insert(recipe_line.ingredient_id.clone(), totals.len());
                    totals.push(IngredientLine::new(recipe_line.ingredient_id.clone(), needed));
                }
            }
        }
    }

    Ok(totals)
}

/// Stock adjustments that move a reservation from `previous` to `next`.
///
/// Ingredients needed more by `next` get a negative delta (reserve more),
/// ingredients needed less get a positive delta (release surplus).
/// Unchanged ingredients are omitted.
///
/// ## Example
/// ```rust
/// use brew_core::recipe::{net_adjustments, IngredientLine};
///
/// let before = vec![IngredientLine::new("milk", 200)];
/// let after = vec![IngredientLine::new("milk", 400), IngredientLine::new("espresso", 2)];
///
/// let adj = net_adjustments(&before, &after);
/// assert_eq!(adj[0].ingredient_id, "milk");
/// assert_eq!(adj[0].delta, -200);
/// assert_eq!(adj[1].delta, -2);
/// ```
pub fn net_adjustments(previous: &[IngredientLine], next: &[IngredientLine]) -> Vec<StockAdjustment> {
    let mut order: Vec<&str> = Vec::new();
    let mut deltas: HashMap<&str, i64> = HashMap::new();

    for line in next {
        let entry = deltas.entry(line.ingredient_id.as_str()).or_insert_with(|| {
            order.push(line.ingredient_id.as_str());
            0
        });
        *entry -= line.quantity;
    }
    for line in previous {
        let entry = deltas.entry(line.ingredient_id.as_str()).or_insert_with(|| {
            order.push(line.ingredient_id.as_str());
            0
        });
        *entry += line.quantity;
    }

    order
        .into_iter()
        .filter_map(|id| {
            let delta = deltas.get(id).copied().unwrap_or(0);
            (delta != 0).then(|| StockAdjustment {
                ingredient_id: id.to_string(),
                delta,
            })
        })
        .collect()
}

/// Collapses adjustments so each ingredient appears once.
pub fn merge_adjustments(adjustments: &[StockAdjustment]) -> Vec<StockAdjustment> {
    let mut merged: Vec<StockAdjustment> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for adj in adjustments {
        match index.get(adj.ingredient_id.as_str()) {
            Some(&pos) => merged[pos].delta += adj.delta,
            None => {
                index.insert(adj.ingredient_id.as_str(), merged.len());
                merged.push(adj.clone());
            }
        }
    }

    merged.retain(|adj| adj.delta != 0);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MenuItem, RecipeLine};

    fn snapshot() -> MenuSnapshot {
        vec![
            MenuItem {
                id: "latte".to_string(),
                name: "Latte".to_string(),
                description: String::new(),
                price_cents: 450,
                ingredients: vec![RecipeLine::new("espresso", 1), RecipeLine::new("milk", 200)],
            },
            MenuItem {
                id: "mocha".to_string(),
                name: "Mocha".to_string(),
                description: String::new(),
                price_cents: 500,
                ingredients: vec![
                    RecipeLine::new("espresso", 1),
                    RecipeLine::new("milk", 150),
                    RecipeLine::new("chocolate", 30),
                ],
            },
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_requirements_sum_across_menu_items() {
        let items = vec![OrderItemDraft::new("latte", 2), OrderItemDraft::new("mocha", 1)];
        let reqs = requirements_for(&items, &snapshot()).unwrap();

        assert_eq!(
            reqs,
            vec![
                IngredientLine::new("espresso", 3),
                IngredientLine::new("milk", 550),
                IngredientLine::new("chocolate", 30),
            ]
        );
    }

    #[test]
    fn test_requirements_unknown_menu_item() {
        let items = vec![OrderItemDraft::new("chai", 1)];
        assert!(matches!(
            requirements_for(&items, &snapshot()),
            Err(CoreError::MenuItemNotFound(_))
        ));
    }

    #[test]
    fn test_requirements_overflow_names_ingredient() {
        let snapshot: MenuSnapshot = vec![MenuItem {
            id: "bottomless".to_string(),
            name: "Bottomless".to_string(),
            description: String::new(),
            price_cents: 100,
            ingredients: vec![RecipeLine::new("milk", i64::MAX / 2)],
        }]
        .into_iter()
        .collect();

        let err = requirements_for(&[OrderItemDraft::new("bottomless", 3)], &snapshot).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "milk"
        ));

        // Two lines that fit alone but not together
        let items = vec![
            OrderItemDraft::new("bottomless", 2),
            OrderItemDraft::new("bottomless", 1),
        ];
        assert!(requirements_for(&items, &snapshot).is_err());
    }

    #[test]
    fn test_net_adjustments_release_surplus() {
        let before = vec![IngredientLine::new("milk", 400), IngredientLine::new("espresso", 2)];
        let after = vec![IngredientLine::new("milk", 200)];

        let adj = net_adjustments(&before, &after);
        assert_eq!(adj.len(), 2);
        assert_eq!(adj[0].ingredient_id, "milk");
        assert_eq!(adj[0].delta, 200);
        assert_eq!(adj[1].ingredient_id, "espresso");
        assert_eq!(adj[1].delta, 2);
    }

    #[test]
    fn test_net_adjustments_unchanged_is_empty() {
        let lines = vec![IngredientLine::new("milk", 200)];
        assert!(net_adjustments(&lines, &lines).is_empty());
    }

    #[test]
    fn test_to_adjustments_and_merge() {
        let lines = vec![IngredientLine::new("milk", 200), IngredientLine::new("milk", 50)];
        let adj = to_adjustments(&lines, DeltaSign::Decrement);
        assert!(adj.iter().all(StockAdjustment::is_decrement));

        let merged = merge_adjustments(&adj);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].delta, -250);
    }
}
