//! # Order Repository
//!
//! Orders, their lines and their status history.
//!
//! ## Order Lifecycle (storage view)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CREATE                                                             │
//! │     └── create() → orders + order_items rows, status 'active',         │
//! │                    reservation as JSON in orders.reserved              │
//! │                                                                         │
//! │  2. EDIT (while active)                                                │
//! │     └── update_in_place() → guarded UPDATE, lines and reservation      │
//! │                               replaced                                 │
//! │                                                                         │
//! │  3a. CLOSE                                                             │
//! │     └── close() → status 'closed' + order_status_history row           │
//! │         (same transaction)                                             │
//! │                                                                         │
//! │  3b. DELETE (while active)                                             │
//! │     └── remove() → row gone, lines cascade                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every mutation of an existing order carries `AND status = 'active'` in its
//! WHERE clause. A zero row count means the order is missing or closed.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::debug;

use brew_core::{IngredientLine, Order, OrderItem, OrderStatus, OrderStatusChange};

use crate::error::{DbError, DbResult};
use crate::store::{
    decode_customization, encode_customization, rank_counts, DateRange, ItemCount, OrderStore,
};

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: String,
    customer_name: String,
    status: OrderStatus,
    total_cents: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    last_status_change: DateTime<Utc>,
    reserved: String,
}

#[derive(Debug, sqlx::FromRow)]
struct OrderItemRow {
    order_id: String,
    menu_item_id: String,
    quantity: i64,
    price_cents: i64,
    customization: Option<String>,
}

impl OrderRow {
    fn into_order(self, items: Vec<OrderItem>) -> DbResult<Order> {
        let reserved: Vec<IngredientLine> = serde_json::from_str(&self.reserved)?;
        Ok(Order {
            id: self.id,
            customer_name: self.customer_name,
            items,
            status: self.status,
            total_cents: self.total_cents,
            created_at: self.created_at,
            updated_at: self.updated_at,
            last_status_change: self.last_status_change,
            reserved,
        })
    }
}

impl OrderItemRow {
    fn into_item(self) -> DbResult<OrderItem> {
        Ok(OrderItem {
            menu_item_id: self.menu_item_id,
            quantity: self.quantity,
            price_cents: self.price_cents,
            customization: decode_customization(self.customization)?,
        })
    }
}

const ORDER_COLUMNS: &str =
    "id, customer_name, status, total_cents, created_at, updated_at, last_status_change, reserved";

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    async fn items_of(&self, order_id: &str) -> DbResult<Vec<OrderItem>> {
        let rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT order_id, menu_item_id, quantity, price_cents, customization
            FROM order_items
            WHERE order_id = ?1
            ORDER BY position
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(OrderItemRow::into_item).collect()
    }

    /// Attaches lines to a set of order rows with one extra query.
    async fn hydrate(&self, rows: Vec<OrderRow>, status: Option<OrderStatus>) -> DbResult<Vec<Order>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let item_rows: Vec<OrderItemRow> = sqlx::query_as(
            r#"
            SELECT oi.order_id, oi.menu_item_id, oi.quantity, oi.price_cents, oi.customization
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE (?1 IS NULL OR o.status = ?1)
            ORDER BY oi.order_id, oi.position
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        let mut lines: HashMap<String, Vec<OrderItem>> = HashMap::new();
        for row in item_rows {
            let order_id = row.order_id.clone();
            lines.entry(order_id).or_default().push(row.into_item()?);
        }

        rows.into_iter()
            .map(|row| {
                let items = lines.remove(&row.id).unwrap_or_default();
                row.into_order(items)
            })
            .collect()
    }

    async fn insert_items(
        tx: &mut Transaction<'_, Sqlite>,
        order_id: &str,
        items: &[OrderItem],
    ) -> DbResult<()> {
        for (position, item) in items.iter().enumerate() {
            let customization = encode_customization(&item.customization)?;
            sqlx::query(
                r#"
                INSERT INTO order_items (
                    order_id, position, menu_item_id, quantity, price_cents, customization
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            )
            .bind(order_id)
            .bind(position as i64)
            .bind(&item.menu_item_id)
            .bind(item.quantity)
            .bind(item.price_cents)
            .bind(customization)
            .execute(&mut **tx)
            .await?;
        }
        Ok(())
    }

    async fn begin(&self) -> DbResult<Transaction<'static, Sqlite>> {
        self.pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))
    }
}

async fn commit(tx: Transaction<'_, Sqlite>) -> DbResult<()> {
    tx.commit()
        .await
        .map_err(|e| DbError::TransactionFailed(e.to_string()))
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn create(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, total_cents = order.total_cents, "Inserting order");

        let reserved = serde_json::to_string(&order.reserved)?;
        let mut tx = self.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, customer_name, status, total_cents,
                created_at, updated_at, last_status_change, reserved
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .bind(order.last_status_change)
        .bind(reserved)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, order.id.as_str()),
            other => other,
        })?;

        Self::insert_items(&mut tx, &order.id, &order.items).await?;
        commit(tx).await
    }

    async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some(row) => {
                let items = self.items_of(&row.id).await?;
                row.into_order(items).map(Some)
            }
            None => Ok(None),
        }
    }

    async fn list_all(&self) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at, id"
        ))
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows, None).await
    }

    async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE status = ?1 ORDER BY created_at, id"
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(rows, Some(status)).await
    }

    async fn update_in_place(&self, order: &Order) -> DbResult<()> {
        debug!(id = %order.id, total_cents = order.total_cents, "Updating order");

        let reserved = serde_json::to_string(&order.reserved)?;
        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                customer_name = ?2,
                total_cents = ?3,
                updated_at = ?4,
                reserved = ?5
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&order.id)
        .bind(&order.customer_name)
        .bind(order.total_cents)
        .bind(order.updated_at)
        .bind(reserved)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (active)", order.id.as_str()));
        }

        sqlx::query("DELETE FROM order_items WHERE order_id = ?1")
            .bind(&order.id)
            .execute(&mut *tx)
            .await?;

        Self::insert_items(&mut tx, &order.id, &order.items).await?;
        commit(tx).await
    }

    async fn remove(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting order");

        let result = sqlx::query("DELETE FROM orders WHERE id = ?1 AND status = 'active'")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (active)", id));
        }

        Ok(())
    }

    async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM orders WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(found.is_some())
    }

    async fn close(&self, change: &OrderStatusChange) -> DbResult<()> {
        debug!(id = %change.order_id, "Closing order");

        let mut tx = self.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                updated_at = ?3,
                last_status_change = ?3
            WHERE id = ?1 AND status = 'active'
            "#,
        )
        .bind(&change.order_id)
        .bind(change.new_status)
        .bind(change.changed_at)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (active)", change.order_id.as_str()));
        }

        sqlx::query(
            r#"
            INSERT INTO order_status_history (
                id, order_id, old_status, new_status, notes, changed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&change.id)
        .bind(&change.order_id)
        .bind(change.old_status)
        .bind(change.new_status)
        .bind(&change.notes)
        .bind(change.changed_at)
        .execute(&mut *tx)
        .await?;

        commit(tx).await
    }

    async fn status_history(&self, order_id: &str) -> DbResult<Vec<OrderStatusChange>> {
        let changes: Vec<OrderStatusChange> = sqlx::query_as(
            r#"
            SELECT id, order_id, old_status, new_status, notes, changed_at
            FROM order_status_history
            WHERE order_id = ?1
            ORDER BY changed_at, rowid
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(changes)
    }

    async fn ordered_item_counts(&self, range: DateRange) -> DbResult<Vec<ItemCount>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT oi.menu_item_id, SUM(oi.quantity)
            FROM order_items oi
            JOIN orders o ON o.id = oi.order_id
            WHERE (?1 IS NULL OR julianday(o.created_at) >= julianday(?1))
              AND (?2 IS NULL OR julianday(o.created_at) <= julianday(?2))
            GROUP BY oi.menu_item_id
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        let mut counts: Vec<ItemCount> = rows
            .into_iter()
            .map(|(menu_item_id, quantity)| ItemCount {
                menu_item_id,
                quantity,
            })
            .collect();
        rank_counts(&mut counts);
        Ok(counts)
    }

    async fn created_timestamps(&self, range: DateRange) -> DbResult<Vec<DateTime<Utc>>> {
        let timestamps: Vec<DateTime<Utc>> = sqlx::query_scalar(
            r#"
            SELECT created_at
            FROM orders
            WHERE (?1 IS NULL OR julianday(created_at) >= julianday(?1))
              AND (?2 IS NULL OR julianday(created_at) <= julianday(?2))
            ORDER BY created_at
            "#,
        )
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.pool)
        .await?;

        Ok(timestamps)
    }
}
