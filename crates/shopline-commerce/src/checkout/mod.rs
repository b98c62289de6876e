//! Checkout module.
//!
//! Contains types for addresses, shipping fees and orders.

mod address;
mod order;
mod shipping;

pub use address::Address;
pub use order::{CheckoutRequest, FinancialStatus, NewOrder, Order, OrderLine, OrderStatus};
pub use shipping::ShippingPolicy;
