//! Domain models for the storefront.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`]. They serialize to the JSON the API returns.

pub mod account;
pub mod order;
pub mod product;

pub use account::Account;
pub use order::{NewOrder, Order, OrderItem, PaymentInfo, ShippingInfo};
pub use product::{NewProduct, Product, ProductChanges};
