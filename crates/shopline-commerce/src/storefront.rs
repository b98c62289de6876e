//! Storefront banners and featured products.
//!
//! Both live on a single document edited with push/pull operations.

use crate::error::CommerceError;
use crate::ids::{BannerId, ProductId};
use crate::util::{now, required};
use serde::{Deserialize, Serialize};
use shopline_db::Document;

/// Id of the singleton storefront document.
pub const STOREFRONT_ID: &str = "storefront";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Banner {
    pub id: BannerId,
    pub title: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    /// Where a click goes.
    pub link: Option<String>,
    pub position: i32,
    pub active: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewBanner {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub image_url: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BannerPatch {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub position: Option<i32>,
    #[serde(default)]
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Storefront {
    pub id: String,
    pub banners: Vec<Banner>,
    /// Featured products in display order.
    pub featured_products: Vec<ProductId>,
    pub updated_at: i64,
}

impl Document for Storefront {
    const COLLECTION: &'static str = "storefront";

    fn id(&self) -> &str {
        &self.id
    }
}

impl Default for Storefront {
    fn default() -> Self {
        Self {
            id: STOREFRONT_ID.to_string(),
            banners: Vec::new(),
            featured_products: Vec::new(),
            updated_at: now(),
        }
    }
}

impl Storefront {
    /// Append a banner. Without a position it goes after the last one.
    pub fn push_banner(&mut self, input: NewBanner) -> Result<&Banner, CommerceError> {
        let position = input.position.unwrap_or_else(|| {
            self.banners
                .iter()
                .map(|b| b.position + 1)
                .max()
                .unwrap_or(0)
        });
        self.banners.push(Banner {
            id: BannerId::generate(),
            title: required("title", &input.title)?,
            subtitle: input.subtitle,
            image_url: required("image_url", &input.image_url)?,
            link: input.link,
            position,
            active: input.active.unwrap_or(true),
        });
        self.updated_at = now();
        self.banners
            .last()
            .ok_or_else(|| CommerceError::BannerNotFound("new banner".to_string()))
    }

    pub fn update_banner(
        &mut self,
        id: &BannerId,
        patch: BannerPatch,
    ) -> Result<&Banner, CommerceError> {
        let banner = self
            .banners
            .iter_mut()
            .find(|b| &b.id == id)
            .ok_or_else(|| CommerceError::BannerNotFound(id.to_string()))?;
        if let Some(title) = patch.title {
            banner.title = required("title", &title)?;
        }
        if let Some(subtitle) = patch.subtitle {
            banner.subtitle = Some(subtitle);
        }
        if let Some(image_url) = patch.image_url {
            banner.image_url = required("image_url", &image_url)?;
        }
        if let Some(link) = patch.link {
            banner.link = Some(link);
        }
        if let Some(position) = patch.position {
            banner.position = position;
        }
        if let Some(active) = patch.active {
            banner.active = active;
        }
        self.updated_at = now();
        Ok(banner)
    }

    pub fn pull_banner(&mut self, id: &BannerId) -> Result<(), CommerceError> {
        let len_before = self.banners.len();
        self.banners.retain(|b| &b.id != id);
        if self.banners.len() == len_before {
            return Err(CommerceError::BannerNotFound(id.to_string()));
        }
        self.updated_at = now();
        Ok(())
    }

    /// Feature a product. Returns false if it already was.
    pub fn push_featured(&mut self, product_id: ProductId) -> bool {
        if self.featured_products.contains(&product_id) {
            return false;
        }
        self.featured_products.push(product_id);
        self.updated_at = now();
        true
    }

    pub fn pull_featured(&mut self, product_id: &ProductId) -> bool {
        let len_before = self.featured_products.len();
        self.featured_products.retain(|p| p != product_id);
        let removed = self.featured_products.len() < len_before;
        if removed {
            self.updated_at = now();
        }
        removed
    }

    /// Active banners sorted by position.
    pub fn active_banners(&self) -> Vec<&Banner> {
        let mut banners: Vec<&Banner> = self.banners.iter().filter(|b| b.active).collect();
        banners.sort_by_key(|b| b.position);
        banners
    }
}
