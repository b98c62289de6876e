//! Manual inventory adjustments and their audit trail.

use crate::error::CommerceError;
use crate::ids::{AdjustmentId, LocationId, LotId, ProductId, VariantId};
use crate::inventory::stock::{LotAllocation, LotSourceKind, StockKey};
use crate::money::Money;
use crate::util::now;
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// Reason for an inventory adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdjustmentReason {
    /// Returned by customer.
    Return,
    /// Restocked outside a purchase order.
    Restock,
    /// Manual correction after a count.
    Correction,
    /// Damaged goods written off.
    Damage,
    /// Lost or stolen.
    Shrinkage,
}

impl AdjustmentReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdjustmentReason::Return => "return",
            AdjustmentReason::Restock => "restock",
            AdjustmentReason::Correction => "correction",
            AdjustmentReason::Damage => "damage",
            AdjustmentReason::Shrinkage => "shrinkage",
        }
    }

    /// Lot source used when the adjustment adds stock.
    pub fn lot_source(&self) -> LotSourceKind {
        match self {
            AdjustmentReason::Return => LotSourceKind::Return,
            _ => LotSourceKind::Adjustment,
        }
    }
}

/// Request to adjust one stock key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAdjustment {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub location_id: LocationId,
    /// Signed change in units, never zero.
    pub change: i64,
    /// Cost of added units. Ignored for removals.
    #[serde(default)]
    pub unit_cost: Option<Money>,
    pub reason: AdjustmentReason,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewAdjustment {
    pub fn key(&self) -> StockKey {
        StockKey::new(
            self.product_id.clone(),
            self.variant_id.clone(),
            self.location_id.clone(),
        )
    }

    pub fn validate(&self) -> Result<(), CommerceError> {
        if self.change == 0 {
            return Err(CommerceError::InvalidQuantity(0));
        }
        if let Some(cost) = &self.unit_cost {
            if cost.is_negative() {
                return Err(CommerceError::ValidationError(
                    "unit cost cannot be negative".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// An inventory adjustment record (for audit trail).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryAdjustment {
    pub id: AdjustmentId,
    pub product_id: ProductId,
    /// Variant that was adjusted.
    pub variant_id: VariantId,
    pub location_id: LocationId,
    /// Change in quantity (positive or negative).
    pub change: i64,
    /// Reason for the adjustment.
    pub reason: AdjustmentReason,
    /// Reference ID (e.g., order number).
    pub reference: Option<String>,
    pub note: Option<String>,
    /// Lot created by a positive adjustment.
    pub lot_id: Option<LotId>,
    /// Lots consumed by a negative adjustment.
    pub allocations: Vec<LotAllocation>,
    /// Stock record quantity after the change.
    pub quantity_after: i64,
    pub created_by: Option<String>,
    pub created_at: i64,
}

impl Document for InventoryAdjustment {
    const COLLECTION: &'static str = "inventory_adjustments";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl InventoryAdjustment {
    pub fn record(input: &NewAdjustment, quantity_after: i64) -> Self {
        Self {
            id: AdjustmentId::generate(),
            product_id: input.product_id.clone(),
            variant_id: input.variant_id.clone(),
            location_id: input.location_id.clone(),
            change: input.change,
            reason: input.reason,
            reference: input.reference.clone(),
            note: input.note.clone(),
            lot_id: None,
            allocations: Vec::new(),
            quantity_after,
            created_by: None,
            created_at: now(),
        }
    }

    pub fn with_lot(mut self, lot_id: LotId) -> Self {
        self.lot_id = Some(lot_id);
        self
    }

    pub fn with_allocations(mut self, allocations: Vec<LotAllocation>) -> Self {
        self.allocations = allocations;
        self
    }

    pub fn by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(change: i64) -> NewAdjustment {
        NewAdjustment {
            product_id: ProductId::new("p1"),
            variant_id: VariantId::new("v1"),
            location_id: LocationId::new("l1"),
            change,
            unit_cost: None,
            reason: AdjustmentReason::Correction,
            reference: Some("COUNT-7".to_string()),
            note: None,
        }
    }

    #[test]
    fn test_zero_change_rejected() {
        assert!(input(0).validate().is_err());
        assert!(input(-2).validate().is_ok());
    }

    #[test]
    fn test_record_adjustment() {
        let adj = InventoryAdjustment::record(&input(4), 10)
            .with_lot(LotId::new("lot-1"))
            .by("admin@example.com");
        assert_eq!(adj.change, 4);
        assert_eq!(adj.quantity_after, 10);
        assert_eq!(adj.lot_id.as_ref().map(|l| l.as_str()), Some("lot-1"));
        assert_eq!(adj.reference.as_deref(), Some("COUNT-7"));
        assert_eq!(adj.created_by.as_deref(), Some("admin@example.com"));
    }

    #[test]
    fn test_return_reason_creates_return_lot() {
        assert_eq!(AdjustmentReason::Return.lot_source(), LotSourceKind::Return);
        assert_eq!(
            AdjustmentReason::Restock.lot_source(),
            LotSourceKind::Adjustment
        );
    }
}
