//! # Reports
//!
//! Order-volume reports read straight from the order store.
//!
//! Unlike [`SalesAggregator`](crate::sales::SalesAggregator) these count
//! every order regardless of status.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use brew_core::aggregation::{group_by_day, group_by_month};
use brew_core::validation::validate_month;
use brew_core::{PeriodReport, ValidationError};
use brew_db::{DateRange, OrderStore};

use crate::catalog::MenuCatalog;
use crate::error::EngineResult;

/// Units ordered of one menu item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderedItemCount {
    pub menu_item_id: String,
    /// Catalog name, when the item is still on the menu.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub quantity: i64,
}

#[derive(Clone)]
pub struct ReportService {
    catalog: MenuCatalog,
    orders: Arc<dyn OrderStore>,
}

impl ReportService {
    pub fn new(catalog: MenuCatalog, orders: Arc<dyn OrderStore>) -> Self {
        ReportService { catalog, orders }
    }

    /// Quantity per menu item over orders created in `[start, end]`.
    /// Either bound may be open.
    pub async fn ordered_item_counts(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> EngineResult<Vec<OrderedItemCount>> {
        if let (Some(start), Some(end)) = (start, end) {
            if start > end {
                return Err(ValidationError::InvalidFormat {
                    field: "start_date".to_string(),
                    reason: "must not be after end_date".to_string(),
                }
                .into());
            }
        }

        let counts = self
            .orders
            .ordered_item_counts(DateRange::new(start, end))
            .await?;
        let ids: Vec<String> = counts.iter().map(|c| c.menu_item_id.clone()).collect();
        let snapshot = self.catalog.snapshot_for(&ids).await?;

        Ok(counts
            .into_iter()
            .map(|c| OrderedItemCount {
                name: snapshot.get(&c.menu_item_id).map(|item| item.name.clone()),
                menu_item_id: c.menu_item_id,
                quantity: c.quantity,
            })
            .collect())
    }

    /// Orders per day of `month` in `year`. Days without orders are omitted.
    pub async fn orders_by_day(&self, year: i32, month: u32) -> EngineResult<PeriodReport> {
        validate_month(month)?;
        let start = month_start(year, month)?;
        let end = if month == 12 {
            month_start(year + 1, 1)?
        } else {
            month_start(year, month + 1)?
        };

        let timestamps = self
            .orders
            .created_timestamps(DateRange::new(Some(start), Some(end - Duration::nanoseconds(1))))
            .await?;
        Ok(group_by_day(&timestamps, year, month))
    }

    /// Orders per month of `year`. Months without orders are omitted.
    pub async fn orders_by_month(&self, year: i32) -> EngineResult<PeriodReport> {
        let start = month_start(year, 1)?;
        let end = month_start(year + 1, 1)?;

        let timestamps = self
            .orders
            .created_timestamps(DateRange::new(Some(start), Some(end - Duration::nanoseconds(1))))
            .await?;
        Ok(group_by_month(&timestamps, year))
    }
}

/// Reports cover calendar years 1 through 9999.
fn month_start(year: i32, month: u32) -> EngineResult<DateTime<Utc>> {
    let out_of_range = || ValidationError::OutOfRange {
        field: "year".to_string(),
        min: 1,
        max: 9999,
    };

    if !(1..=10_000).contains(&year) {
        return Err(out_of_range().into());
    }

    Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0)
        .single()
        .ok_or_else(|| out_of_range().into())
}
