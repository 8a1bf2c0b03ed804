//! # Batch Processing
//!
//! Runs the full create pipeline over a list of orders.
//!
//! ## Outcome Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Per-order outcome                                    │
//! │                                                                         │
//! │  create ok ───────────────► accepted { order_id, total }               │
//! │  InsufficientStock ───────► rejected { reason: insufficient_inventory } │
//! │                             (batch continues)                           │
//! │  anything else ───────────► stop                                        │
//! │                             every accepted order of this batch is      │
//! │                             removed and its stock released, newest     │
//! │                             first; BatchAborted { position, source }   │
//! │                                                                         │
//! │  after the last order, reading back stock for the summary can still    │
//! │  fail; that too rolls back every accepted order, with position equal   │
//! │  to the batch length                                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use brew_core::{Money, Order, OrderDraft, ValidationError};

use crate::error::{EngineError, EngineResult};
use crate::ledger::InventoryLedger;
use crate::lifecycle::OrderLifecycle;

/// Reason recorded for orders turned away for lack of stock.
pub const INSUFFICIENT_INVENTORY: &str = "insufficient_inventory";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessedStatus {
    Accepted,
    Rejected,
}

/// Outcome of one order in a batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedOrder {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    pub customer_name: String,
    pub status: ProcessedStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Stock consumed from one ingredient by the accepted orders of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryUsage {
    pub ingredient_id: String,
    pub name: String,
    pub quantity_used: i64,
    /// Quantity on hand right after the batch.
    pub remaining: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_orders: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub total_revenue: Money,
    pub inventory_updates: Vec<InventoryUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    pub processed_orders: Vec<ProcessedOrder>,
    pub summary: BatchSummary,
}

/// Applies order creation to many drafts with partial acceptance.
#[derive(Clone)]
pub struct BatchProcessor {
    lifecycle: OrderLifecycle,
    ledger: InventoryLedger,
    max_batch_size: usize,
}

impl BatchProcessor {
    pub fn new(lifecycle: OrderLifecycle, ledger: InventoryLedger, max_batch_size: usize) -> Self {
        BatchProcessor {
            lifecycle,
            ledger,
            max_batch_size,
        }
    }

    /// Processes `drafts` in order.
    ///
    /// ## Errors
    /// - `Validation` if the batch is larger than the configured maximum
    ///   (nothing processed)
    /// - `BatchAborted` on any failure other than a stock shortfall, after
    ///   every order accepted so far has been rolled back. This includes a
    ///   failure to read back stock for the summary.
    pub async fn process_batch(&self, drafts: Vec<OrderDraft>) -> EngineResult<BatchResult> {
        if drafts.len() > self.max_batch_size {
            return Err(ValidationError::OutOfRange {
                field: "orders".to_string(),
                min: 0,
                max: self.max_batch_size as i64,
            }
            .into());
        }

        let total_orders = drafts.len();
        let mut processed = Vec::with_capacity(total_orders);
        let mut accepted: Vec<Order> = Vec::new();
        let mut revenue = Money::zero();

        for (position, draft) in drafts.into_iter().enumerate() {
            let customer_name = draft.customer_name.clone();

            match self.lifecycle.create(draft).await {
                Ok(order) => {
                    revenue += order.total();
                    processed.push(ProcessedOrder {
                        order_id: Some(order.id.clone()),
                        customer_name,
                        status: ProcessedStatus::Accepted,
                        total: Some(order.total()),
                        reason: None,
                    });
                    accepted.push(order);
                }
                Err(e) if e.is_insufficient_stock() => {
                    warn!(position, customer = %customer_name, error = %e, "Batch order rejected");
                    processed.push(ProcessedOrder {
                        order_id: None,
                        customer_name,
                        status: ProcessedStatus::Rejected,
                        total: None,
                        reason: Some(INSUFFICIENT_INVENTORY.to_string()),
                    });
                }
                Err(e) => {
                    error!(position, error = %e, "Batch aborted, rolling back accepted orders");
                    self.roll_back(&accepted).await;
                    return Err(EngineError::BatchAborted {
                        position,
                        source: Box::new(e),
                    });
                }
            }
        }

        let inventory_updates = match self.usage(&accepted).await {
            Ok(updates) => updates,
            Err(e) => {
                error!(error = %e, "Batch summary failed, rolling back accepted orders");
                self.roll_back(&accepted).await;
                return Err(EngineError::BatchAborted {
                    position: total_orders,
                    source: Box::new(e),
                });
            }
        };
        let summary = BatchSummary {
            total_orders,
            accepted: accepted.len(),
            rejected: total_orders - accepted.len(),
            total_revenue: revenue,
            inventory_updates,
        };

        info!(
            total = summary.total_orders,
            accepted = summary.accepted,
            rejected = summary.rejected,
            revenue = %summary.total_revenue,
            "Batch processed"
        );

        Ok(BatchResult {
            processed_orders: processed,
            summary,
        })
    }

    async fn roll_back(&self, accepted: &[Order]) {
        for order in accepted.iter().rev() {
            if let Err(e) = self.lifecycle.discard(order).await {
                error!(order_id = %order.id, error = %e, "Failed to roll back batch order");
            }
        }
    }

    /// Per-ingredient consumption of the accepted orders, first-seen order.
    async fn usage(&self, accepted: &[Order]) -> EngineResult<Vec<InventoryUsage>> {
        let mut order: Vec<&str> = Vec::new();
        let mut used: HashMap<&str, i64> = HashMap::new();

        for line in accepted.iter().flat_map(|order| &order.reserved) {
            let entry = used.entry(line.ingredient_id.as_str()).or_insert_with(|| {
                order.push(line.ingredient_id.as_str());
                0
            });
            *entry += line.quantity;
        }

        let mut updates = Vec::with_capacity(order.len());
        for ingredient_id in order {
            let item = self.ledger.stock_of(ingredient_id).await?;
            updates.push(InventoryUsage {
                ingredient_id: item.ingredient_id,
                name: item.name,
                quantity_used: used.get(ingredient_id).copied().unwrap_or(0),
                remaining: item.quantity,
            });
        }
        Ok(updates)
    }
}
