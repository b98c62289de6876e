//! Inventory: locations, per-key stock records, cost lots and adjustments.

mod adjustment;
mod location;
mod stock;

pub use adjustment::{AdjustmentReason, InventoryAdjustment, NewAdjustment};
pub use location::{Location, LocationKind, LocationPatch, NewLocation};
pub use stock::{
    allocate_fifo, allocation_cost, apply_allocations, LotAllocation, LotSource, LotSourceKind,
    StockKey, StockLot, StockRecord,
};
