//! Domain layer for the point-of-sale order service.
//!
//! Pure types and rules with no I/O:
//! - [`Money`] for whole-unit currency arithmetic
//! - [`Item`] and name normalization
//! - [`StockValidator`] and [`TotalCalculator`]
//! - order lines, pending and persisted orders, and the [`OrderStatus`] machine

pub mod item;
pub mod money;
pub mod order;
pub mod stock;
pub mod total;

pub use item::{Item, NewItem, normalize_name};
pub use money::{Money, MoneyError};
pub use order::{Order, OrderError, OrderLine, OrderStatus, PendingOrder};
pub use stock::{StockError, StockValidator, parse_quantity};
pub use total::TotalCalculator;
