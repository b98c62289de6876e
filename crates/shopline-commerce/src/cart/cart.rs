//! Cart and line item types.

use crate::catalog::{Product, ProductVariant};
use crate::error::CommerceError;
use crate::ids::{LineItemId, ProductId, UserId, VariantId};
use crate::money::{Currency, Money};
use crate::util::now;
use serde::{Deserialize, Serialize};
use shopline_db::Document;
use std::collections::HashMap;

/// Maximum quantity allowed per line item.
pub const MAX_QUANTITY_PER_ITEM: i64 = 99;

/// A shopper's cart. There is one per user and its id is the user id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    pub id: UserId,
    /// Items in the cart.
    pub items: Vec<LineItem>,
    /// Sum of line totals. Derived, see [`Cart::recalculate`].
    pub subtotal: Money,
    /// Sum of line quantities. Derived.
    pub total_quantity: i64,
    /// Cart currency.
    pub currency: Currency,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Document for Cart {
    const COLLECTION: &'static str = "carts";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Cart {
    /// Create an empty cart for a user.
    pub fn new(user_id: UserId, currency: Currency) -> Self {
        Self {
            id: user_id,
            items: Vec::new(),
            subtotal: Money::zero(currency),
            total_quantity: 0,
            currency,
            updated_at: now(),
        }
    }

    /// Quantity the variant's line would have after adding `quantity` units.
    ///
    /// Returns an error if:
    /// - Quantity is not positive
    /// - The result would exceed MAX_QUANTITY_PER_ITEM
    pub fn quantity_after_add(
        &self,
        variant_id: &VariantId,
        quantity: i64,
    ) -> Result<i64, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        let current = self
            .get_item_by_variant(variant_id)
            .map(|i| i.quantity)
            .unwrap_or(0);
        let total = current
            .checked_add(quantity)
            .ok_or(CommerceError::Overflow)?;
        check_limit(total)?;
        Ok(total)
    }

    /// Add an item to the cart, merging with an existing line for the same
    /// variant. `preorder` marks the resulting line.
    pub fn add_item(
        &mut self,
        product: &Product,
        variant: &ProductVariant,
        quantity: i64,
        preorder: bool,
    ) -> Result<LineItemId, CommerceError> {
        let total = self.quantity_after_add(&variant.id, quantity)?;

        if let Some(existing) = self.items.iter_mut().find(|i| i.variant_id == variant.id) {
            existing.quantity = total;
            existing.preorder = preorder;
            existing.update_total()?;
            let id = existing.id.clone();
            self.recalculate()?;
            return Ok(id);
        }

        let item = LineItem::new(product, variant, quantity, preorder)?;
        let id = item.id.clone();
        self.items.push(item);
        self.recalculate()?;
        Ok(id)
    }

    /// Set a line's quantity. Zero removes the line.
    pub fn set_quantity(
        &mut self,
        line_item_id: &LineItemId,
        quantity: i64,
        preorder: bool,
    ) -> Result<(), CommerceError> {
        if quantity < 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        if quantity == 0 {
            return self.remove_item(line_item_id);
        }
        check_limit(quantity)?;

        let item = self
            .items
            .iter_mut()
            .find(|i| &i.id == line_item_id)
            .ok_or_else(|| CommerceError::ItemNotInCart(line_item_id.to_string()))?;
        item.quantity = quantity;
        item.preorder = preorder;
        item.update_total()?;
        self.recalculate()
    }

    /// Remove an item from the cart.
    pub fn remove_item(&mut self, line_item_id: &LineItemId) -> Result<(), CommerceError> {
        let len_before = self.items.len();
        self.items.retain(|i| &i.id != line_item_id);
        if self.items.len() == len_before {
            return Err(CommerceError::ItemNotInCart(line_item_id.to_string()));
        }
        self.recalculate()
    }

    /// Clear all items from the cart.
    pub fn clear(&mut self) {
        self.items.clear();
        self.subtotal = Money::zero(self.currency);
        self.total_quantity = 0;
        self.updated_at = now();
    }

    /// Refresh every line from the current catalog.
    ///
    /// Prices, names and SKUs are copied from `products`. Lines whose product
    /// or variant is gone, or whose product is not active, are dropped and
    /// their ids returned.
    pub fn reprice(
        &mut self,
        products: &HashMap<ProductId, Product>,
    ) -> Result<Vec<LineItemId>, CommerceError> {
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());

        for mut item in std::mem::take(&mut self.items) {
            let current = products
                .get(&item.product_id)
                .filter(|p| p.is_available())
                .and_then(|p| p.variant(&item.variant_id).map(|v| (p, v)));
            match current {
                Some((product, variant)) => {
                    item.refresh(product, variant)?;
                    kept.push(item);
                }
                None => dropped.push(item.id),
            }
        }

        self.items = kept;
        self.recalculate()?;
        Ok(dropped)
    }

    /// Recompute the derived totals.
    pub fn recalculate(&mut self) -> Result<(), CommerceError> {
        for item in &self.items {
            if item.unit_price.currency != self.currency {
                return Err(CommerceError::CurrencyMismatch {
                    expected: self.currency.to_string(),
                    got: item.unit_price.currency.to_string(),
                });
            }
        }
        self.subtotal = Money::try_sum(self.items.iter().map(|i| &i.total_price), self.currency)
            .ok_or(CommerceError::Overflow)?;
        self.total_quantity = self.items.iter().map(|i| i.quantity).sum();
        self.updated_at = now();
        Ok(())
    }

    /// Check if cart is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get an item by ID.
    pub fn get_item(&self, line_item_id: &LineItemId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == line_item_id)
    }

    /// Get an item by variant ID.
    pub fn get_item_by_variant(&self, variant_id: &VariantId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.variant_id == variant_id)
    }

    /// Distinct products referenced by the cart.
    pub fn product_ids(&self) -> Vec<ProductId> {
        let mut ids: Vec<ProductId> = Vec::new();
        for item in &self.items {
            if !ids.contains(&item.product_id) {
                ids.push(item.product_id.clone());
            }
        }
        ids
    }
}

fn check_limit(quantity: i64) -> Result<(), CommerceError> {
    if quantity > MAX_QUANTITY_PER_ITEM {
        return Err(CommerceError::QuantityExceedsLimit(
            quantity,
            MAX_QUANTITY_PER_ITEM,
        ));
    }
    Ok(())
}

/// A line item in the cart.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Unique line item identifier.
    pub id: LineItemId,
    /// Product ID.
    pub product_id: ProductId,
    /// Variant being purchased.
    pub variant_id: VariantId,
    /// Product name (denormalized for display).
    pub product_name: String,
    /// Variant name (e.g., "Large / Blue").
    pub variant_name: String,
    pub sku: String,
    pub image: Option<String>,
    /// Quantity.
    pub quantity: i64,
    /// Unit price.
    pub unit_price: Money,
    /// Total price (unit_price * quantity).
    pub total_price: Money,
    /// Ordered beyond available stock.
    pub preorder: bool,
}

impl LineItem {
    /// Create a new line item.
    pub fn new(
        product: &Product,
        variant: &ProductVariant,
        quantity: i64,
        preorder: bool,
    ) -> Result<Self, CommerceError> {
        if quantity <= 0 {
            return Err(CommerceError::InvalidQuantity(quantity));
        }
        check_limit(quantity)?;
        let total_price = variant
            .price
            .try_multiply(quantity)
            .ok_or(CommerceError::Overflow)?;
        Ok(Self {
            id: LineItemId::generate(),
            product_id: product.id.clone(),
            variant_id: variant.id.clone(),
            product_name: product.name.clone(),
            variant_name: variant.name(),
            sku: variant.sku.clone(),
            image: product.cover_image().map(str::to_string),
            quantity,
            unit_price: variant.price,
            total_price,
            preorder,
        })
    }

    /// Update the total price based on quantity.
    pub fn update_total(&mut self) -> Result<(), CommerceError> {
        self.total_price = self
            .unit_price
            .try_multiply(self.quantity)
            .ok_or(CommerceError::Overflow)?;
        Ok(())
    }

    fn refresh(&mut self, product: &Product, variant: &ProductVariant) -> Result<(), CommerceError> {
        self.product_name = product.name.clone();
        self.variant_name = variant.name();
        self.sku = variant.sku.clone();
        self.image = product.cover_image().map(str::to_string);
        self.unit_price = variant.price;
        self.update_total()
    }
}
