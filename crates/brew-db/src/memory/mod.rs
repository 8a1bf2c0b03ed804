//! # In-Memory Backend
//!
//! Store implementations over tokio locks. Used by tests and by the
//! `memory` storage backend.
//!
//! Each store guards its whole state with one lock, so an operation that
//! reads and then writes (the stock check-and-decrement) holds it for the
//! duration and can't interleave with another writer.

pub mod inventory;
pub mod menu;
pub mod order;

pub use inventory::InMemoryInventoryStore;
pub use menu::InMemoryMenuStore;
pub use order::InMemoryOrderStore;
