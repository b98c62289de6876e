//! Category types for product organization.

use crate::error::CommerceError;
use crate::ids::CategoryId;
use crate::util::{now, required, slugify, validate_slug};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// A top-level product category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Category name.
    pub name: String,
    /// URL-friendly slug (unique).
    pub slug: String,
    /// Category description.
    pub description: Option<String>,
    /// Category image URL.
    pub image_url: Option<String>,
    /// Sort order position.
    pub position: i32,
    /// Whether the category is shown on the storefront.
    pub active: bool,
    /// Unix timestamp of creation.
    pub created_at: i64,
    /// Unix timestamp of last update.
    pub updated_at: i64,
}

impl Document for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> &str {
        self.id.as_str()
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCategory {
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

/// Partial update of a category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
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

impl Category {
    /// Create a category from validated input.
    pub fn create(input: NewCategory) -> Result<Self, CommerceError> {
        let name = required("name", &input.name)?;
        let slug = resolve_slug(&name, input.slug.as_deref())?;
        let now = now();
        Ok(Self {
            id: CategoryId::generate(),
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
    ///
    /// Renaming re-derives the slug unless the patch sets one explicitly.
    pub fn apply(&mut self, patch: CategoryPatch) -> Result<(), CommerceError> {
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

/// Use the given slug if any, otherwise derive one from the name.
pub(crate) fn resolve_slug(name: &str, slug: Option<&str>) -> Result<String, CommerceError> {
    match slug {
        Some(slug) => {
            validate_slug(slug)?;
            Ok(slug.to_string())
        }
        None => slugify(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_category_derives_slug() {
        let cat = Category::create(NewCategory {
            name: "  Home & Living ".to_string(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cat.name, "Home & Living");
        assert_eq!(cat.slug, "home-living");
        assert!(cat.active);
    }

    #[test]
    fn test_create_category_requires_name() {
        let result = Category::create(NewCategory {
            name: "   ".to_string(),
            ..Default::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_rename_rederives_slug() {
        let mut cat = Category::create(NewCategory {
            name: "Phones".to_string(),
            ..Default::default()
        })
        .unwrap();

        cat.apply(CategoryPatch {
            name: Some("Mobile Phones".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cat.slug, "mobile-phones");

        cat.apply(CategoryPatch {
            name: Some("Smart Phones".to_string()),
            slug: Some("smartphones".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(cat.slug, "smartphones");
    }

    #[test]
    fn test_explicit_slug_validated() {
        let result = Category::create(NewCategory {
            name: "Phones".to_string(),
            slug: Some("Bad Slug".to_string()),
            ..Default::default()
        });
        assert!(result.is_err());
    }
}
