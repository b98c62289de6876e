//! Purchase orders from suppliers.
//!
//! A purchase starts as a draft and can be edited freely. Receiving it
//! creates one cost lot per line at the purchase's location; after that the
//! document is frozen.

use crate::error::CommerceError;
use crate::ids::{LocationId, ProductId, PurchaseId, VariantId};
use crate::money::{Currency, Money};
use crate::util::{document_number, now, required};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    #[default]
    Draft,
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Draft => "draft",
            PurchaseStatus::Received => "received",
            PurchaseStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(PurchaseStatus::Draft),
            "received" => Some(PurchaseStatus::Received),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseLineInput {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub quantity: i64,
    pub unit_cost: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Purchase {
    pub id: PurchaseId,
    /// `PO-<ts>-<suffix>`.
    pub number: String,
    pub supplier: String,
    /// Where the goods arrive.
    pub location_id: LocationId,
    pub lines: Vec<PurchaseLine>,
    pub status: PurchaseStatus,
    pub total_cost: Money,
    pub note: Option<String>,
    pub created_by: String,
    pub created_at: i64,
    pub updated_at: i64,
    pub received_at: Option<i64>,
}

impl Document for Purchase {
    const COLLECTION: &'static str = "purchases";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPurchase {
    pub supplier: String,
    pub location_id: LocationId,
    pub lines: Vec<PurchaseLineInput>,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PurchasePatch {
    #[serde(default)]
    pub supplier: Option<String>,
    #[serde(default)]
    pub location_id: Option<LocationId>,
    #[serde(default)]
    pub lines: Option<Vec<PurchaseLineInput>>,
    #[serde(default)]
    pub note: Option<String>,
}

impl Purchase {
    /// Create a draft purchase.
    pub fn create(
        input: NewPurchase,
        created_by: impl Into<String>,
        currency: Currency,
    ) -> Result<Self, CommerceError> {
        let lines = build_lines(input.lines, currency)?;
        let total_cost = sum_lines(&lines, currency)?;
        let now = now();
        Ok(Self {
            id: PurchaseId::generate(),
            number: document_number("PO"),
            supplier: required("supplier", &input.supplier)?,
            location_id: input.location_id,
            lines,
            status: PurchaseStatus::Draft,
            total_cost,
            note: input.note,
            created_by: created_by.into(),
            created_at: now,
            updated_at: now,
            received_at: None,
        })
    }

    /// Edit a draft.
    pub fn apply(&mut self, patch: PurchasePatch, currency: Currency) -> Result<(), CommerceError> {
        self.ensure_draft("edit")?;
        if let Some(supplier) = patch.supplier {
            self.supplier = required("supplier", &supplier)?;
        }
        if let Some(location_id) = patch.location_id {
            self.location_id = location_id;
        }
        if let Some(lines) = patch.lines {
            self.lines = build_lines(lines, currency)?;
            self.total_cost = sum_lines(&self.lines, currency)?;
        }
        if let Some(note) = patch.note {
            self.note = Some(note);
        }
        self.updated_at = now();
        Ok(())
    }

    /// Mark the draft received. Lot creation is the caller's job.
    pub fn receive(&mut self) -> Result<(), CommerceError> {
        self.ensure_draft("receive")?;
        let now = now();
        self.status = PurchaseStatus::Received;
        self.received_at = Some(now);
        self.updated_at = now;
        Ok(())
    }

    pub fn cancel(&mut self) -> Result<(), CommerceError> {
        self.ensure_draft("cancel")?;
        self.status = PurchaseStatus::Cancelled;
        self.updated_at = now();
        Ok(())
    }

    fn ensure_draft(&self, action: &str) -> Result<(), CommerceError> {
        if self.status != PurchaseStatus::Draft {
            return Err(CommerceError::NotAllowed(format!(
                "cannot {} a {} purchase",
                action,
                self.status.as_str()
            )));
        }
        Ok(())
    }
}

fn build_lines(
    inputs: Vec<PurchaseLineInput>,
    currency: Currency,
) -> Result<Vec<PurchaseLine>, CommerceError> {
    if inputs.is_empty() {
        return Err(CommerceError::ValidationError(
            "a purchase needs at least one line".to_string(),
        ));
    }
    inputs
        .into_iter()
        .map(|input| {
            if input.quantity <= 0 {
                return Err(CommerceError::InvalidQuantity(input.quantity));
            }
            if input.unit_cost.currency != currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: currency.to_string(),
                    got: input.unit_cost.currency.to_string(),
                });
            }
            if input.unit_cost.is_negative() {
                return Err(CommerceError::ValidationError(
                    "unit cost cannot be negative".to_string(),
                ));
            }
            let total_cost = input
                .unit_cost
                .try_multiply(input.quantity)
                .ok_or(CommerceError::Overflow)?;
            Ok(PurchaseLine {
                product_id: input.product_id,
                variant_id: input.variant_id,
                quantity: input.quantity,
                unit_cost: input.unit_cost,
                total_cost,
            })
        })
        .collect()
}

fn sum_lines(lines: &[PurchaseLine], currency: Currency) -> Result<Money, CommerceError> {
    Money::try_sum(lines.iter().map(|l| &l.total_cost), currency).ok_or(CommerceError::Overflow)
}
