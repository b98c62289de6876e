//! Commerce error types.

use thiserror::Error;

/// Errors that can occur in e-commerce operations.
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Product not found.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Variant not found.
    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    /// Category not found.
    #[error("Category not found: {0}")]
    CategoryNotFound(String),

    /// Subcategory not found.
    #[error("Subcategory not found: {0}")]
    SubcategoryNotFound(String),

    /// Location not found.
    #[error("Location not found: {0}")]
    LocationNotFound(String),

    /// Order not found.
    #[error("Order not found: {0}")]
    OrderNotFound(String),

    /// Purchase not found.
    #[error("Purchase not found: {0}")]
    PurchaseNotFound(String),

    /// Transfer not found.
    #[error("Transfer not found: {0}")]
    TransferNotFound(String),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Banner not found.
    #[error("Banner not found: {0}")]
    BannerNotFound(String),

    /// Item not in cart.
    #[error("Item not in cart: {0}")]
    ItemNotInCart(String),

    /// Insufficient inventory.
    #[error("Insufficient inventory for {variant_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        variant_id: String,
        requested: i64,
        available: i64,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    /// Quantity exceeds maximum allowed.
    #[error("Quantity {0} exceeds maximum allowed ({1})")]
    QuantityExceedsLimit(i64, i64),

    /// Invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition { from: String, to: String },

    /// A uniquely keyed value is already taken.
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// The entity is still referenced elsewhere.
    #[error("{0} is still in use")]
    InUse(String),

    /// Operation not allowed in the entity's current state.
    #[error("Operation not allowed: {0}")]
    NotAllowed(String),

    /// Currency mismatch.
    #[error("Currency mismatch: expected {expected}, got {got}")]
    CurrencyMismatch { expected: String, got: String },

    /// Arithmetic overflow.
    #[error("Arithmetic overflow in money calculation")]
    Overflow,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] shopline_db::DbError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

impl CommerceError {
    /// Check if this error means "the thing doesn't exist".
    pub fn is_not_found(&self) -> bool {
        match self {
            CommerceError::ProductNotFound(_)
            | CommerceError::VariantNotFound(_)
            | CommerceError::CategoryNotFound(_)
            | CommerceError::SubcategoryNotFound(_)
            | CommerceError::LocationNotFound(_)
            | CommerceError::OrderNotFound(_)
            | CommerceError::PurchaseNotFound(_)
            | CommerceError::TransferNotFound(_)
            | CommerceError::PaymentNotFound(_)
            | CommerceError::BannerNotFound(_)
            | CommerceError::ItemNotInCart(_) => true,
            CommerceError::Database(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is a conflict with the current state of the data.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            CommerceError::InsufficientInventory { .. }
                | CommerceError::InvalidStatusTransition { .. }
                | CommerceError::Duplicate(_)
                | CommerceError::InUse(_)
                | CommerceError::NotAllowed(_)
                | CommerceError::Database(shopline_db::DbError::Duplicate { .. })
        )
    }

    /// Check if this error is caused by bad input.
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            CommerceError::InvalidQuantity(_)
                | CommerceError::QuantityExceedsLimit(..)
                | CommerceError::CurrencyMismatch { .. }
                | CommerceError::ValidationError(_)
        )
    }
}

impl From<serde_json::Error> for CommerceError {
    fn from(e: serde_json::Error) -> Self {
        CommerceError::SerializationError(e.to_string())
    }
}
