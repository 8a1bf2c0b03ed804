//! # Aggregation
//!
//! Sales and popularity figures derived from historical orders, plus the
//! day/month bucketing behind period reports.
//!
//! Only closed orders count towards sales and popularity. Active orders are
//! still editable and would make the numbers move under the reader.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, Utc};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{MenuSnapshot, Order, Period, PeriodCount, PeriodReport, PopularItem};

/// Total sales over closed orders at *current* catalog prices.
///
/// Snapshot line prices are not used. The result is closed volume valued
/// on today's menu.
///
/// ## Errors
/// [`CoreError::MenuItemNotFound`] as soon as any closed order references an
/// item missing from `catalog`. One bad reference fails the whole aggregate.
/// `OutOfRange` if the total overflows.
pub fn total_sales(orders: &[Order], catalog: &MenuSnapshot) -> CoreResult<Money> {
    let mut total = Money::zero();

    for order in orders.iter().filter(|o| o.is_closed()) {
        for item in &order.items {
            let price = catalog
                .price_of(&item.menu_item_id)
                .ok_or_else(|| CoreError::MenuItemNotFound(item.menu_item_id.clone()))?;
            total = price
                .checked_multiply_quantity(item.quantity)
                .and_then(|line| total.checked_add(line))
                .ok_or_else(|| ValidationError::overflow("total_sales"))?;
        }
    }

    Ok(total)
}

/// Units sold per menu item over closed orders, most popular first.
///
/// Ties keep the order in which items were first seen.
///
/// ## Example
/// `{latte×3, mocha×1}` + `{latte×2}` → `[(latte, 5), (mocha, 1)]`
pub fn popular_items(orders: &[Order]) -> Vec<PopularItem> {
    let mut ranking: Vec<PopularItem> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for order in orders.iter().filter(|o| o.is_closed()) {
        for item in &order.items {
            match index.get(item.menu_item_id.as_str()) {
                Some(&pos) => ranking[pos].quantity += item.quantity,
                None => {
                    index.insert(item.menu_item_id.as_str(), ranking.len());
                    ranking.push(PopularItem {
                        menu_item_id: item.menu_item_id.clone(),
                        quantity: item.quantity,
                    });
                }
            }
        }
    }

    // sort_by is stable
    ranking.sort_by(|a, b| b.quantity.cmp(&a.quantity));
    ranking
}

/// Counts timestamps per day of the given month.
pub fn group_by_day(timestamps: &[DateTime<Utc>], year: i32, month: u32) -> PeriodReport {
    let mut buckets: BTreeMap<u32, i64> = BTreeMap::new();
    for ts in timestamps
        .iter()
        .filter(|ts| ts.year() == year && ts.month() == month)
    {
        *buckets.entry(ts.day()).or_insert(0) += 1;
    }

    PeriodReport {
        period: Period::Day,
        year,
        month: Some(month),
        counts: to_counts(buckets),
    }
}

/// Counts timestamps per month of the given year.
pub fn group_by_month(timestamps: &[DateTime<Utc>], year: i32) -> PeriodReport {
    let mut buckets: BTreeMap<u32, i64> = BTreeMap::new();
    for ts in timestamps.iter().filter(|ts| ts.year() == year) {
        *buckets.entry(ts.month()).or_insert(0) += 1;
    }

    PeriodReport {
        period: Period::Month,
        year,
        month: None,
        counts: to_counts(buckets),
    }
}

fn to_counts(buckets: BTreeMap<u32, i64>) -> Vec<PeriodCount> {
    buckets
        .into_iter()
        .map(|(key, orders)| PeriodCount { key, orders })
        .collect()
}
