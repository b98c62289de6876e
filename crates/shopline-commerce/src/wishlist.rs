//! Per-user wishlist.

use crate::ids::{ProductId, UserId};
use crate::util::now;
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// Saved products in insertion order, without duplicates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Wishlist {
    /// Same as the owner's user id.
    pub id: UserId,
    pub product_ids: Vec<ProductId>,
    pub updated_at: i64,
}

impl Document for Wishlist {
    const COLLECTION: &'static str = "wishlists";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Wishlist {
    pub fn new(user_id: UserId) -> Self {
        Self {
            id: user_id,
            product_ids: Vec::new(),
            updated_at: now(),
        }
    }

    /// Add a product. Returns false if it was already there.
    pub fn add(&mut self, product_id: ProductId) -> bool {
        if self.contains(&product_id) {
            return false;
        }
        self.product_ids.push(product_id);
        self.updated_at = now();
        true
    }

    /// Remove a product. Returns false if it was not there.
    pub fn remove(&mut self, product_id: &ProductId) -> bool {
        let len_before = self.product_ids.len();
        self.product_ids.retain(|p| p != product_id);
        let removed = self.product_ids.len() < len_before;
        if removed {
            self.updated_at = now();
        }
        removed
    }

    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.product_ids.contains(product_id)
    }

    pub fn len(&self) -> usize {
        self.product_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.product_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_is_idempotent() {
        let mut list = Wishlist::new(UserId::new("u"));
        assert!(list.add(ProductId::new("a")));
        assert!(list.add(ProductId::new("b")));
        assert!(!list.add(ProductId::new("a")));
        assert_eq!(
            list.product_ids,
            vec![ProductId::new("a"), ProductId::new("b")]
        );
    }

    #[test]
    fn test_remove() {
        let mut list = Wishlist::new(UserId::new("u"));
        list.add(ProductId::new("a"));
        assert!(list.remove(&ProductId::new("a")));
        assert!(!list.remove(&ProductId::new("a")));
        assert!(list.is_empty());
    }
}
