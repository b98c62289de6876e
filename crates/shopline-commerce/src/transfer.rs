//! Stock transfers between locations.
//!
//! A transfer is executed the moment it is recorded: units leave the source
//! lots in FIFO order and arrive as new lots at the destination carrying the
//! same unit costs.

use crate::error::CommerceError;
use crate::ids::{LocationId, ProductId, TransferId, VariantId};
use crate::inventory::{allocation_cost, LotAllocation};
use crate::money::{Currency, Money};
use crate::util::{document_number, now};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLineInput {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTransfer {
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub lines: Vec<TransferLineInput>,
    #[serde(default)]
    pub note: Option<String>,
}

impl NewTransfer {
    /// Validate the request and merge lines for the same variant.
    pub fn normalized_lines(&self) -> Result<Vec<TransferLineInput>, CommerceError> {
        if self.from_location == self.to_location {
            return Err(CommerceError::ValidationError(
                "source and destination must differ".to_string(),
            ));
        }
        if self.lines.is_empty() {
            return Err(CommerceError::ValidationError(
                "a transfer needs at least one line".to_string(),
            ));
        }

        let mut merged: Vec<TransferLineInput> = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            if line.quantity <= 0 {
                return Err(CommerceError::InvalidQuantity(line.quantity));
            }
            match merged
                .iter_mut()
                .find(|m| m.product_id == line.product_id && m.variant_id == line.variant_id)
            {
                Some(existing) => {
                    existing.quantity = existing
                        .quantity
                        .checked_add(line.quantity)
                        .ok_or(CommerceError::Overflow)?;
                }
                None => merged.push(line.clone()),
            }
        }
        Ok(merged)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    /// Source lots the units came from.
    pub allocations: Vec<LotAllocation>,
    pub total_cost: Money,
}

impl TransferLine {
    pub fn new(
        input: TransferLineInput,
        allocations: Vec<LotAllocation>,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        let total_cost = allocation_cost(&allocations, currency)?;
        Ok(Self {
            product_id: input.product_id,
            variant_id: input.variant_id,
            quantity: input.quantity,
            allocations,
            total_cost,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transfer {
    pub id: TransferId,
    /// `TR-<ts>-<suffix>`.
    pub number: String,
    pub from_location: LocationId,
    pub to_location: LocationId,
    pub lines: Vec<TransferLine>,
    pub total_cost: Money,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

impl Document for Transfer {
    const COLLECTION: &'static str = "transfers";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Transfer {
    /// Start a transfer record; lines are added as they are executed.
    pub fn begin(input: &NewTransfer, created_by: impl Into<String>, currency: Currency) -> Self {
        Self {
            id: TransferId::generate(),
            number: document_number("TR"),
            from_location: input.from_location.clone(),
            to_location: input.to_location.clone(),
            lines: Vec::new(),
            total_cost: Money::zero(currency),
            note: input.note.clone(),
            created_by: created_by.into(),
            created_at: now(),
        }
    }

    pub fn push_line(&mut self, line: TransferLine) -> Result<(), CommerceError> {
        self.total_cost = self
            .total_cost
            .try_add(&line.total_cost)
            .ok_or(CommerceError::Overflow)?;
        self.lines.push(line);
        Ok(())
    }

    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::LotId;

    fn input(lines: Vec<(&str, i64)>) -> NewTransfer {
        NewTransfer {
            from_location: LocationId::new("a"),
            to_location: LocationId::new("b"),
            lines: lines
                .into_iter()
                .map(|(variant, quantity)| TransferLineInput {
                    product_id: ProductId::new("p"),
                    variant_id: VariantId::new(variant),
                    quantity,
                })
                .collect(),
            note: None,
        }
    }

    #[test]
    fn test_lines_merge_by_variant() {
        let lines = input(vec![("v1", 2), ("v2", 1), ("v1", 3)])
            .normalized_lines()
            .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].quantity, 5);
    }

    #[test]
    fn test_same_location_rejected() {
        let mut req = input(vec![("v1", 1)]);
        req.to_location = LocationId::new("a");
        assert!(req.normalized_lines().is_err());
    }

    #[test]
    fn test_bad_quantity_rejected() {
        assert!(matches!(
            input(vec![("v1", 0)]).normalized_lines(),
            Err(CommerceError::InvalidQuantity(0))
        ));
        assert!(input(vec![]).normalized_lines().is_err());
    }

    #[test]
    fn test_transfer_cost() {
        let req = input(vec![("v1", 3)]);
        let mut transfer = Transfer::begin(&req, "staff", Currency::BDT);
        let line = TransferLine::new(
            req.lines[0].clone(),
            vec![
                LotAllocation {
                    lot_id: LotId::new("l1"),
                    quantity: 2,
                    unit_cost: Money::new(100, Currency::BDT),
                    received_at: 10,
                },
                LotAllocation {
                    lot_id: LotId::new("l2"),
                    quantity: 1,
                    unit_cost: Money::new(150, Currency::BDT),
                    received_at: 20,
                },
            ],
            Currency::BDT,
        )
        .unwrap();
        transfer.push_line(line).unwrap();

        assert!(transfer.number.starts_with("TR-"));
        assert_eq!(transfer.total_cost.amount_cents, 350);
        assert_eq!(transfer.total_quantity(), 3);
    }
}
