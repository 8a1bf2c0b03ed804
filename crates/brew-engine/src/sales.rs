//! Sales aggregates over closed orders.

use std::sync::Arc;

use tracing::debug;

use brew_core::aggregation::{popular_items, total_sales};
use brew_core::{Money, OrderStatus, PopularItem};
use brew_db::OrderStore;

use crate::catalog::MenuCatalog;
use crate::error::EngineResult;

/// Read-only revenue and popularity figures.
#[derive(Clone)]
pub struct SalesAggregator {
    catalog: MenuCatalog,
    orders: Arc<dyn OrderStore>,
}

impl SalesAggregator {
    pub fn new(catalog: MenuCatalog, orders: Arc<dyn OrderStore>) -> Self {
        SalesAggregator { catalog, orders }
    }

    /// Closed-order volume valued at *current* menu prices.
    ///
    /// ## Errors
    /// `MenuItemNotFound` if any closed order references an item that has
    /// since left the menu.
    pub async fn total_sales(&self) -> EngineResult<Money> {
        let closed = self.orders.list_by_status(OrderStatus::Closed).await?;
        let ids: Vec<String> = closed
            .iter()
            .flat_map(|o| o.items.iter().map(|i| i.menu_item_id.clone()))
            .collect();
        let snapshot = self.catalog.snapshot_for(&ids).await?;

        let total = total_sales(&closed, &snapshot)?;
        debug!(orders = closed.len(), total = %total, "Total sales computed");
        Ok(total)
    }

    /// Units sold per menu item over closed orders, highest first.
    pub async fn popular_items(&self) -> EngineResult<Vec<PopularItem>> {
        let closed = self.orders.list_by_status(OrderStatus::Closed).await?;
        Ok(popular_items(&closed))
    }
}
