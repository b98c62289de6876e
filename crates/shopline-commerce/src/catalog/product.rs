//! Product and variant types.

use crate::catalog::category::resolve_slug;
use crate::error::CommerceError;
use crate::ids::{CategoryId, ProductId, SubcategoryId, VariantId};
use crate::money::{Currency, Money};
use crate::util::{now, required, slugify, validate_slug};
use serde::{Deserialize, Serialize};
use shopline_db::Document;
use std::collections::HashSet;

/// Product status in the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    /// Product is in draft mode, not visible to customers.
    Draft,
    /// Product is active and visible.
    #[default]
    Active,
    /// Product is archived, not visible but data preserved.
    Archived,
}

impl ProductStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductStatus::Draft => "draft",
            ProductStatus::Active => "active",
            ProductStatus::Archived => "archived",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "draft" => Some(ProductStatus::Draft),
            "active" => Some(ProductStatus::Active),
            "archived" => Some(ProductStatus::Archived),
            _ => None,
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    /// Unique product identifier.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// URL-friendly slug (unique).
    pub slug: String,
    /// Full description (may contain HTML/markdown).
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub subcategory_id: Option<SubcategoryId>,
    pub brand: Option<String>,
    /// Image URLs, first one is the cover.
    pub images: Vec<String>,
    /// Tags for filtering/search.
    pub tags: Vec<String>,
    /// Product visibility status.
    pub status: ProductStatus,
    /// Accept orders beyond available stock.
    pub allow_preorder: bool,
    pub variants: Vec<ProductVariant>,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Document for Product {
    const COLLECTION: &'static str = "products";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// A product variant (e.g., size/color combination).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductVariant {
    /// Unique variant identifier.
    pub id: VariantId,
    /// Stock keeping unit for this variant (unique across the catalog).
    pub sku: String,
    /// Options that define this variant.
    pub options: Vec<VariantOption>,
    /// Price of this variant.
    pub price: Money,
    /// Compare-at price (original price for showing discounts).
    pub compare_at_price: Option<Money>,
}

impl ProductVariant {
    /// Check if this variant is on sale (has compare_at_price).
    pub fn is_on_sale(&self) -> bool {
        self.compare_at_price
            .map(|cap| cap.amount_cents > self.price.amount_cents)
            .unwrap_or(false)
    }

    /// Calculate the discount percentage if on sale.
    pub fn discount_percentage(&self) -> Option<f64> {
        self.compare_at_price.and_then(|cap| {
            if cap.amount_cents > self.price.amount_cents {
                let savings = cap.amount_cents - self.price.amount_cents;
                Some((savings as f64 / cap.amount_cents as f64) * 100.0)
            } else {
                None
            }
        })
    }

    /// Build the variant name from options.
    pub fn name(&self) -> String {
        if self.options.is_empty() {
            "Default".to_string()
        } else {
            self.options
                .iter()
                .map(|o| o.value.as_str())
                .collect::<Vec<_>>()
                .join(" / ")
        }
    }
}

/// A variant option (e.g., Size: Large).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VariantOption {
    /// Option name (e.g., "Size", "Color").
    pub name: String,
    /// Option value (e.g., "Large", "Blue").
    pub value: String,
}

impl VariantOption {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Variant input. An `id` matching an existing variant keeps that variant's id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantInput {
    #[serde(default)]
    pub id: Option<VariantId>,
    pub sku: String,
    #[serde(default)]
    pub options: Vec<VariantOption>,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
}

/// Input for creating a product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub allow_preorder: bool,
    pub variants: Vec<VariantInput>,
}

/// Partial update of a product. `variants`, when present, replaces the list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub subcategory_id: Option<SubcategoryId>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub status: Option<ProductStatus>,
    #[serde(default)]
    pub allow_preorder: Option<bool>,
    #[serde(default)]
    pub variants: Option<Vec<VariantInput>>,
}

impl Product {
    /// Create a product from input, validating variants against the store currency.
    pub fn create(input: NewProduct, currency: Currency) -> Result<Self, CommerceError> {
        let name = required("name", &input.name)?;
        let slug = resolve_slug(&name, input.slug.as_deref())?;
        let variants = build_variants(input.variants, &[], currency)?;
        let now = now();
        Ok(Self {
            id: ProductId::generate(),
            name,
            slug,
            description: input.description,
            category_id: input.category_id,
            subcategory_id: input.subcategory_id,
            brand: input.brand,
            images: input.images,
            tags: normalize_tags(input.tags),
            status: input.status.unwrap_or_default(),
            allow_preorder: input.allow_preorder,
            variants,
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: ProductPatch, currency: Currency) -> Result<(), CommerceError> {
        if let Some(name) = patch.name {
            self.name = required("name", &name)?;
            if patch.slug.is_none() {
                self.slug = slugify(&self.name)?;
            }
        }
        if let Some(slug) = patch.slug {
            validate_slug(&slug)?;
            self.slug = slug;
        }
        if let Some(description) = patch.description {
            self.description = Some(description);
        }
        if let Some(category_id) = patch.category_id {
            if category_id != self.category_id && patch.subcategory_id.is_none() {
                self.subcategory_id = None;
            }
            self.category_id = category_id;
        }
        if let Some(subcategory_id) = patch.subcategory_id {
            self.subcategory_id = Some(subcategory_id);
        }
        if let Some(brand) = patch.brand {
            self.brand = Some(brand);
        }
        if let Some(images) = patch.images {
            self.images = images;
        }
        if let Some(tags) = patch.tags {
            self.tags = normalize_tags(tags);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(allow_preorder) = patch.allow_preorder {
            self.allow_preorder = allow_preorder;
        }
        if let Some(variants) = patch.variants {
            self.variants = build_variants(variants, &self.variants, currency)?;
        }
        self.updated_at = now();
        Ok(())
    }

    /// Check if the product is available for purchase.
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Active
    }

    /// Find a variant by id.
    pub fn variant(&self, id: &VariantId) -> Option<&ProductVariant> {
        self.variants.iter().find(|v| &v.id == id)
    }

    /// Find a variant by id or fail.
    pub fn require_variant(&self, id: &VariantId) -> Result<&ProductVariant, CommerceError> {
        self.variant(id)
            .ok_or_else(|| CommerceError::VariantNotFound(id.to_string()))
    }

    /// The variant a shopper gets when no variant is chosen.
    pub fn first_variant(&self) -> Option<&ProductVariant> {
        self.variants.first()
    }

    /// Lowest and highest variant price.
    pub fn price_range(&self) -> Option<(Money, Money)> {
        let min = self.variants.iter().map(|v| v.price).min_by_key(|m| m.amount_cents)?;
        let max = self.variants.iter().map(|v| v.price).max_by_key(|m| m.amount_cents)?;
        Some((min, max))
    }

    /// Cover image, if any.
    pub fn cover_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    pub fn skus(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|v| v.sku.as_str())
    }

    /// Compact view used in listings, wishlists and featured products.
    pub fn summary(&self) -> ProductSummary {
        let (price, max_price) = match self.price_range() {
            Some((min, max)) => (Some(min), Some(max)),
            None => (None, None),
        };
        ProductSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            slug: self.slug.clone(),
            image: self.cover_image().map(str::to_string),
            price,
            max_price,
            compare_at_price: self.first_variant().and_then(|v| v.compare_at_price),
            allow_preorder: self.allow_preorder,
            status: self.status,
        }
    }
}

/// Listing view of a product.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductSummary {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub price: Option<Money>,
    pub max_price: Option<Money>,
    pub compare_at_price: Option<Money>,
    pub allow_preorder: bool,
    pub status: ProductStatus,
}

/// Validate variant inputs and turn them into variants.
fn build_variants(
    inputs: Vec<VariantInput>,
    existing: &[ProductVariant],
    currency: Currency,
) -> Result<Vec<ProductVariant>, CommerceError> {
    if inputs.is_empty() {
        return Err(CommerceError::ValidationError(
            "a product needs at least one variant".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut variants = Vec::with_capacity(inputs.len());
    for input in inputs {
        let sku = required("sku", &input.sku)?;
        if !seen.insert(sku.clone()) {
            return Err(CommerceError::Duplicate(format!("sku {}", sku)));
        }
        check_price(&input.price, currency)?;
        if let Some(cap) = &input.compare_at_price {
            check_price(cap, currency)?;
        }

        let id = match input.id {
            Some(id) if existing.iter().any(|v| v.id == id) => id,
            Some(id) => return Err(CommerceError::VariantNotFound(id.to_string())),
            None => VariantId::generate(),
        };
        variants.push(ProductVariant {
            id,
            sku,
            options: input.options,
            price: input.price,
            compare_at_price: input.compare_at_price,
        });
    }
    Ok(variants)
}

fn check_price(price: &Money, currency: Currency) -> Result<(), CommerceError> {
    if price.currency != currency {
        return Err(CommerceError::CurrencyMismatch {
            expected: currency.to_string(),
            got: price.currency.to_string(),
        });
    }
    if price.is_negative() {
        return Err(CommerceError::ValidationError(
            "price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}
