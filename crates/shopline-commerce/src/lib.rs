//! E-commerce domain types and logic for Shopline.
//!
//! This crate holds the documents the store persists and the rules that
//! govern them. It performs no I/O beyond implementing
//! [`shopline_db::Document`] for each persisted type.
//!
//! - **Catalog**: categories, subcategories, products and variants
//! - **Inventory**: locations, stock records, cost lots, FIFO allocation
//! - **Purchasing**: supplier purchase orders and inter-location transfers
//! - **Cart / Wishlist**: per-user shopping state
//! - **Checkout**: orders, shipping fees, payments
//! - **Storefront**: banners and featured products
//!
//! # Example
//!
//! ```rust,ignore
//! use shopline_commerce::prelude::*;
//!
//! let product = Product::create(new_product, Currency::BDT)?;
//! let mut cart = Cart::new(user_id, Currency::BDT);
//! cart.add_item(&product, &product.variants[0], 1, false)?;
//! println!("Subtotal: {}", cart.subtotal);
//! ```

pub mod error;
pub mod ids;
pub mod money;
pub mod util;

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod inventory;
pub mod payment;
pub mod purchase;
pub mod storefront;
pub mod transfer;
pub mod wishlist;

pub use error::CommerceError;
pub use ids::*;
pub use money::{Currency, Money};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::CommerceError;
    pub use crate::ids::*;
    pub use crate::money::{Currency, Money};

    // Catalog
    pub use crate::catalog::{
        Category, CategoryPatch, NewCategory, NewProduct, NewSubcategory, Product, ProductPatch,
        ProductStatus, ProductSummary, ProductVariant, Subcategory, SubcategoryPatch,
        VariantInput, VariantOption,
    };

    // Inventory
    pub use crate::inventory::{
        allocate_fifo, AdjustmentReason, InventoryAdjustment, Location, LocationKind,
        LotAllocation, LotSource, LotSourceKind, NewAdjustment, StockKey, StockLot, StockRecord,
    };
    pub use crate::purchase::{NewPurchase, Purchase, PurchasePatch, PurchaseStatus};
    pub use crate::transfer::{NewTransfer, Transfer, TransferLine};

    // Cart
    pub use crate::cart::{Cart, LineItem, MAX_QUANTITY_PER_ITEM};
    pub use crate::wishlist::Wishlist;

    // Checkout
    pub use crate::checkout::{
        Address, CheckoutRequest, FinancialStatus, NewOrder, Order, OrderLine, OrderStatus,
        ShippingPolicy,
    };
    pub use crate::payment::{
        GatewaySession, GatewayVerdict, Payment, PaymentMethod, PaymentStatus,
    };

    // Storefront
    pub use crate::storefront::{Banner, BannerPatch, NewBanner, Storefront, STOREFRONT_ID};
}
