//! Product catalog module.
//!
//! Contains types for categories, subcategories, products and variants.

mod category;
mod product;
mod subcategory;

pub use category::{Category, CategoryPatch, NewCategory};
pub use product::{
    NewProduct, Product, ProductPatch, ProductStatus, ProductSummary, ProductVariant,
    VariantInput, VariantOption,
};
pub use subcategory::{NewSubcategory, Subcategory, SubcategoryPatch};
