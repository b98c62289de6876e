//! Subcategories nested under a category.

use crate::catalog::category::resolve_slug;
use crate::error::CommerceError;
use crate::ids::{CategoryId, SubcategoryId};
use crate::util::{now, required, slugify, validate_slug};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// A subcategory belonging to exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Subcategory {
    pub id: SubcategoryId,
    /// Parent category.
    pub category_id: CategoryId,
    pub name: String,
    /// URL-friendly slug (unique among subcategories).
    pub slug: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub position: i32,
    pub active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Document for Subcategory {
    const COLLECTION: &'static str = "subcategories";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Input for creating a subcategory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSubcategory {
    pub category_id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

/// Partial update of a subcategory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubcategoryPatch {
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl Subcategory {
    /// Create a subcategory. The caller checks that the category exists.
    pub fn create(input: NewSubcategory) -> Result<Self, CommerceError> {
        let name = required("name", &input.name)?;
        let slug = resolve_slug(&name, input.slug.as_deref())?;
        let now = now();
        Ok(Self {
            id: SubcategoryId::generate(),
            category_id: input.category_id,
            name,
            slug,
            description: input.description,
            image_url: input.image_url,
            position: input.position.unwrap_or(0),
            active: input.active.unwrap_or(true),
            created_at: now,
            updated_at: now,
        })
    }

    /// Apply a partial update.
    pub fn apply(&mut self, patch: SubcategoryPatch) -> Result<(), CommerceError> {
        if let Some(category_id) = patch.category_id {
            self.category_id = category_id;
        }
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
        if let Some(image_url) = patch.image_url {
            self.image_url = Some(image_url);
        }
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(active) = patch.active {
            self.active = active;
        }
        self.updated_at = now();
        Ok(())
    }
}
