//! Shipping fee policy.

use crate::money::{Currency, Money};
use serde::{Deserialize, Serialize};

/// Flat-rate shipping with an optional free-shipping threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ShippingPolicy {
    /// Fee charged per order.
    pub flat_fee: Money,
    /// Subtotal at which shipping becomes free. Zero disables free shipping.
    pub free_threshold: Money,
}

impl ShippingPolicy {
    pub fn new(currency: Currency, flat_fee_cents: i64, free_threshold_cents: i64) -> Self {
        Self {
            flat_fee: Money::new(flat_fee_cents, currency),
            free_threshold: Money::new(free_threshold_cents, currency),
        }
    }

    /// Shipping fee for an order with the given subtotal.
    pub fn fee_for(&self, subtotal: &Money) -> Money {
        if self.qualifies_for_free(subtotal) {
            Money::zero(self.flat_fee.currency)
        } else {
            self.flat_fee
        }
    }

    pub fn qualifies_for_free(&self, subtotal: &Money) -> bool {
        self.free_threshold.amount_cents > 0
            && subtotal.amount_cents >= self.free_threshold.amount_cents
    }
}
