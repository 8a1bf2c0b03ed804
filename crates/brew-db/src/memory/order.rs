use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use brew_core::{Order, OrderStatus, OrderStatusChange};

use crate::error::{DbError, DbResult};
use crate::store::{rank_counts, DateRange, ItemCount, OrderStore};

#[derive(Debug, Default)]
struct OrderState {
    /// Insertion order doubles as creation order.
    orders: Vec<Order>,
    history: Vec<OrderStatusChange>,
}

impl OrderState {
    fn active_mut(&mut self, id: &str) -> DbResult<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id && o.status == OrderStatus::Active)
            .ok_or_else(|| DbError::not_found("Order (active)", id))
    }
}

/// Orders and status history behind one read-write lock.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    state: RwLock<OrderState>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_creation(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    orders
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn create(&self, order: &Order) -> DbResult<()> {
        let mut state = self.state.write().await;
        if state.orders.iter().any(|o| o.id == order.id) {
            return Err(DbError::duplicate("orders.id", order.id.as_str()));
        }
        state.orders.push(order.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_all(&self) -> DbResult<Vec<Order>> {
        let state = self.state.read().await;
        Ok(sorted_by_creation(state.orders.clone()))
    }

    async fn list_by_status(&self, status: OrderStatus) -> DbResult<Vec<Order>> {
        let state = self.state.read().await;
        let matching = state
            .orders
            .iter()
            .filter(|o| o.status == status)
            .cloned()
            .collect();
        Ok(sorted_by_creation(matching))
    }

    async fn update_in_place(&self, order: &Order) -> DbResult<()> {
        let mut state = self.state.write().await;
        let stored = state.active_mut(&order.id)?;
        stored.customer_name = order.customer_name.clone();
        stored.items = order.items.clone();
        stored.total_cents = order.total_cents;
        stored.updated_at = order.updated_at;
        stored.reserved = order.reserved.clone();
        Ok(())
    }

    async fn remove(&self, id: &str) -> DbResult<()> {
        let mut state = self.state.write().await;
        state.active_mut(id)?;
        state.orders.retain(|o| o.id != id);
        state.history.retain(|c| c.order_id != id);
        Ok(())
    }

    async fn exists_by_id(&self, id: &str) -> DbResult<bool> {
        Ok(self.state.read().await.orders.iter().any(|o| o.id == id))
    }

    async fn close(&self, change: &OrderStatusChange) -> DbResult<()> {
        let mut state = self.state.write().await;
        let stored = state.active_mut(&change.order_id)?;
        stored.status = change.new_status;
        stored.updated_at = change.changed_at;
        stored.last_status_change = change.changed_at;
        state.history.push(change.clone());
        Ok(())
    }

    async fn status_history(&self, order_id: &str) -> DbResult<Vec<OrderStatusChange>> {
        let state = self.state.read().await;
        Ok(state
            .history
            .iter()
            .filter(|c| c.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn ordered_item_counts(&self, range: DateRange) -> DbResult<Vec<ItemCount>> {
        let state = self.state.read().await;
        let mut totals: HashMap<&str, i64> = HashMap::new();
        for order in state.orders.iter().filter(|o| range.contains(&o.created_at)) {
            for item in &order.items {
                *totals.entry(item.menu_item_id.as_str()).or_insert(0) += item.quantity;
            }
        }

        let mut counts: Vec<ItemCount> = totals
            .into_iter()
            .map(|(id, quantity)| ItemCount {
                menu_item_id: id.to_string(),
                quantity,
            })
            .collect();
        rank_counts(&mut counts);
        Ok(counts)
    }

    async fn created_timestamps(&self, range: DateRange) -> DbResult<Vec<DateTime<Utc>>> {
        let state = self.state.read().await;
        let mut stamps: Vec<DateTime<Utc>> = state
            .orders
            .iter()
            .map(|o| o.created_at)
            .filter(|ts| range.contains(ts))
            .collect();
        stamps.sort();
        Ok(stamps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brew_core::{IngredientLine, OrderItem};

    fn order(id: &str) -> Order {
        let now = Utc::now();
        Order {
            id: id.to_string(),
            customer_name: "Ada".to_string(),
            items: vec![OrderItem {
                menu_item_id: "latte".to_string(),
                quantity: 2,
                price_cents: 450,
                customization: None,
            }],
            status: OrderStatus::Active,
            total_cents: 900,
            created_at: now,
            updated_at: now,
            last_status_change: now,
            reserved: vec![IngredientLine::new("milk", 400)],
        }
    }

    #[tokio::test]
    async fn test_close_then_mutations_are_refused() {
        let store = InMemoryOrderStore::new();
        store.create(&order("o-1")).await.unwrap();

        store
            .close(&OrderStatusChange {
                id: "c-1".to_string(),
                order_id: "o-1".to_string(),
                old_status: OrderStatus::Active,
                new_status: OrderStatus::Closed,
                notes: None,
                changed_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(store.remove("o-1").await.is_err());
        assert!(store.update_in_place(&order("o-1")).await.is_err());
        assert_eq!(store.status_history("o-1").await.unwrap().len(), 1);
        assert_eq!(
            store.list_by_status(OrderStatus::Closed).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_duplicate_create_and_remove() {
        let store = InMemoryOrderStore::new();
        store.create(&order("o-1")).await.unwrap();
        assert!(matches!(
            store.create(&order("o-1")).await.unwrap_err(),
            DbError::UniqueViolation { .. }
        ));

        store.remove("o-1").await.unwrap();
        assert!(!store.exists_by_id("o-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_update_replaces_reservation() {
        let store = InMemoryOrderStore::new();
        let mut current = order("o-1");
        store.create(&current).await.unwrap();

        current.reserved = vec![IngredientLine::new("milk", 200), IngredientLine::new("espresso", 1)];
        store.update_in_place(&current).await.unwrap();

        let fetched = store.get_by_id("o-1").await.unwrap().unwrap();
        assert_eq!(fetched.reserved, current.reserved);
    }
}
