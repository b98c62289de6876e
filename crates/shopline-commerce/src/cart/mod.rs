//! Shopping cart module.
//!
//! Contains types for the per-user cart and its line items.

mod cart;

pub use cart::{Cart, LineItem, MAX_QUANTITY_PER_ITEM};
