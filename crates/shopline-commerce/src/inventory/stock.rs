//! Stock records, cost lots and FIFO allocation.
//!
//! Every (product, variant, location) key has one [`StockRecord`] holding the
//! on-hand quantity and any number of [`StockLot`]s holding what that
//! quantity cost. The record quantity always equals the sum of `remaining`
//! over the key's lots.

use crate::error::CommerceError;
use crate::ids::{LocationId, LotId, ProductId, VariantId};
use crate::money::{Currency, Money};
use crate::util::{next_sequence, now, now_millis};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// The (product, variant, location) triple stock is tracked by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StockKey {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub location_id: LocationId,
}

impl StockKey {
    pub fn new(product_id: ProductId, variant_id: VariantId, location_id: LocationId) -> Self {
        Self {
            product_id,
            variant_id,
            location_id,
        }
    }

    /// Document id of the key's stock record.
    pub fn record_id(&self) -> String {
        format!(
            "{}:{}:{}",
            self.product_id, self.variant_id, self.location_id
        )
    }

    /// Same product and variant at another location.
    pub fn at(&self, location_id: LocationId) -> Self {
        Self {
            location_id,
            ..self.clone()
        }
    }
}

/// On-hand quantity for one stock key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRecord {
    /// `"{product}:{variant}:{location}"`.
    pub id: String,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub location_id: LocationId,
    pub quantity: i64,
    pub updated_at: i64,
}

impl Document for StockRecord {
    const COLLECTION: &'static str = "stock_records";

    fn id(&self) -> &str {
        &self.id
    }
}

impl StockRecord {
    /// An empty record for a key.
    pub fn empty(key: &StockKey) -> Self {
        Self {
            id: key.record_id(),
            product_id: key.product_id.clone(),
            variant_id: key.variant_id.clone(),
            location_id: key.location_id.clone(),
            quantity: 0,
            updated_at: now(),
        }
    }

    /// Add a signed change. The quantity never drops below zero.
    pub fn apply_delta(&mut self, delta: i64) -> Result<(), CommerceError> {
        let next = self
            .quantity
            .checked_add(delta)
            .ok_or(CommerceError::Overflow)?;
        if next < 0 {
            return Err(CommerceError::InsufficientInventory {
                variant_id: self.variant_id.to_string(),
                requested: -delta,
                available: self.quantity,
            });
        }
        self.quantity = next;
        self.updated_at = now();
        Ok(())
    }
}

/// Where a lot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotSourceKind {
    Purchase,
    Transfer,
    Adjustment,
    Return,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotSource {
    pub kind: LotSourceKind,
    /// Purchase number, transfer number, adjustment id or order number.
    pub reference: String,
}

impl LotSource {
    pub fn new(kind: LotSourceKind, reference: impl Into<String>) -> Self {
        Self {
            kind,
            reference: reference.into(),
        }
    }
}

/// A batch of units received at one location at one unit cost.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockLot {
    pub id: LotId,
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub location_id: LocationId,
    /// Units originally received.
    pub quantity: i64,
    /// Units not yet consumed.
    pub remaining: i64,
    pub unit_cost: Money,
    pub source: LotSource,
    /// Unix timestamp in milliseconds; FIFO order key.
    pub received_at: i64,
    /// Receive order; breaks `received_at` ties.
    #[serde(default)]
    pub seq: i64,
}

impl Document for StockLot {
    const COLLECTION: &'static str = "stock_lots";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl StockLot {
    /// Receive a new lot for a key.
    pub fn receive(
        key: &StockKey,
        quantity: i64,
        unit_cost: Money,
        source: LotSource,
    ) -> Result<Self, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if unit_cost.is_negative() {
            return Err(CommerceError::ValidationError(
                "unit cost cannot be negative".to_string(),
            ));
        }
        Ok(Self {
            id: LotId::generate(),
            product_id: key.product_id.clone(),
            variant_id: key.variant_id.clone(),
            location_id: key.location_id.clone(),
            quantity,
            remaining: quantity,
            unit_cost,
            source,
            received_at: now_millis(),
            seq: next_sequence(),
        })
    }

    /// Receive units moved out of another lot. The new lot keeps the age of
    /// the units it holds.
    pub fn transferred(
        key: &StockKey,
        allocation: &LotAllocation,
        source: LotSource,
    ) -> Result<Self, CommerceError> {
        let mut lot = Self::receive(key, allocation.quantity, allocation.unit_cost, source)?;
        if allocation.received_at > 0 {
            lot.received_at = allocation.received_at;
        }
        Ok(lot)
    }

    pub fn key(&self) -> StockKey {
        StockKey::new(
            self.product_id.clone(),
            self.variant_id.clone(),
            self.location_id.clone(),
        )
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Take units out of the lot.
    pub fn consume(&mut self, quantity: i64) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity > self.remaining {
            return Err(CommerceError::InsufficientInventory {
                variant_id: self.variant_id.to_string(),
                requested: quantity,
                available: self.remaining,
            });
        }
        self.remaining -= quantity;
        Ok(())
    }

    /// Put units back, e.g. when an order is cancelled.
    pub fn restore(&mut self, quantity: i64) -> Result<(), CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let next = self.remaining + quantity;
        if next > self.quantity {
            return Err(CommerceError::ValidationError(format!(
                "lot {} cannot hold {} units",
                self.id, next
            )));
        }
        self.remaining = next;
        Ok(())
    }
}

/// Units taken from one lot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LotAllocation {
    pub lot_id: LotId,
    pub quantity: i64,
    pub unit_cost: Money,
    /// When the lot's units were received.
    #[serde(default)]
    pub received_at: i64,
}

/// Plan a FIFO allocation of `quantity` units from `lots`.
///
/// Lots are consumed oldest first (`received_at`, then `seq`). Lots are only
/// read; apply the plan with [`apply_allocations`]. Fails with
/// `InsufficientInventory` when the lots hold fewer units than requested.
pub fn allocate_fifo(
    lots: &[StockLot],
    variant_id: &VariantId,
    quantity: i64,
) -> Result<Vec<LotAllocation>, CommerceError> {
    if quantity <= 0 {
        return Err(CommerceError::InvalidQuantity(quantity));
    }

    let mut ordered: Vec<&StockLot> = lots.iter().filter(|l| l.remaining > 0).collect();
    ordered.sort_by(|a, b| {
        a.received_at
            .cmp(&b.received_at)
            .then_with(|| a.seq.cmp(&b.seq))
    });

    let available: i64 = ordered.iter().map(|l| l.remaining).sum();
    if available < quantity {
        return Err(CommerceError::InsufficientInventory {
            variant_id: variant_id.to_string(),
            requested: quantity,
            available,
        });
    }

    let mut needed = quantity;
    let mut plan = Vec::new();
    for lot in ordered {
        if needed == 0 {
            break;
        }
        let take = needed.min(lot.remaining);
        plan.push(LotAllocation {
            lot_id: lot.id.clone(),
            quantity: take,
            unit_cost: lot.unit_cost,
            received_at: lot.received_at,
        });
        needed -= take;
    }
    Ok(plan)
}

/// Apply an allocation plan to the lots it was planned from.
///
/// Returns the lots that changed.
pub fn apply_allocations<'a>(
    lots: &'a mut [StockLot],
    plan: &[LotAllocation],
) -> Result<Vec<&'a StockLot>, CommerceError> {
    for allocation in plan {
        let lot = lots
            .iter_mut()
            .find(|l| l.id == allocation.lot_id)
            .ok_or_else(|| {
                CommerceError::ValidationError(format!("unknown lot {}", allocation.lot_id))
            })?;
        lot.consume(allocation.quantity)?;
    }
    Ok(lots
        .iter()
        .filter(|l| plan.iter().any(|a| a.lot_id == l.id))
        .collect())
}

/// Total cost of an allocation plan.
pub fn allocation_cost(plan: &[LotAllocation], currency: Currency) -> Result<Money, CommerceError> {
    plan.iter().try_fold(Money::zero(currency), |acc, a| {
        let line = a
            .unit_cost
            .try_multiply(a.quantity)
            .ok_or(CommerceError::Overflow)?;
        acc.try_add(&line).ok_or(CommerceError::Overflow)
    })
}
