//! Inventory store capability used by the order workflow.
//!
//! The backing service offers plain record CRUD with no cross-record
//! transactions. [`InventoryStore`] is the seam the workflow depends on;
//! [`HttpInventoryStore`] talks to the REST backend and
//! [`InMemoryInventoryStore`] is a deterministic fake for tests and local runs.

pub mod error;
pub mod http;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use http::{HttpInventoryStore, HttpStoreConfig};
pub use memory::InMemoryInventoryStore;
pub use store::{CreatedOrder, InventoryStore};
