//! Categories, subcategories and products.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use shopline_commerce::catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, NewSubcategory, Product, ProductPatch,
    ProductStatus, ProductSummary, Subcategory, SubcategoryPatch,
};
use shopline_commerce::checkout::Order;
use shopline_commerce::ids::{is_valid_id, CategoryId, ProductId, SubcategoryId, VariantId};
use shopline_commerce::inventory::StockKey;
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore, Filter, Page, PageRequest, Query, Sort};
use tracing::info;

use super::inventory::{available_quantity, find_default_location};
use super::load;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

pub async fn create_category(state: &AppState, input: NewCategory) -> Result<Category, AppError> {
    let category = Category::create(input)?;
    let mut tx = state.db.begin().await?;
    ensure_unique_slug::<Category>(&mut tx, &category.slug, category.id.as_str()).await?;
    tx.insert(&category).await?;
    tx.commit().await?;

    info!(category_id = %category.id, slug = %category.slug, "category created");
    Ok(category)
}

/// Look a category up by id, then by slug.
pub async fn get_category(conn: &mut Connection, id_or_slug: &str) -> Result<Category, AppError> {
    if is_valid_id(id_or_slug) {
        if let Some(category) = conn.get::<Category>(id_or_slug).await? {
            return Ok(category);
        }
    }
    conn.find_one::<Category>(&Filter::new().eq("slug", id_or_slug))
        .await?
        .ok_or_else(|| CommerceError::CategoryNotFound(id_or_slug.to_string()).into())
}

pub async fn list_categories(
    conn: &mut Connection,
    active: Option<bool>,
    request: PageRequest,
) -> Result<Page<Category>, AppError> {
    let filter = Filter::new().eq_opt("active", active);
    Ok(conn.page(&filter, &Sort::asc("position"), request).await?)
}

pub async fn update_category(
    state: &AppState,
    id: &CategoryId,
    patch: CategoryPatch,
) -> Result<Category, AppError> {
    let mut tx = state.db.begin().await?;
    let mut category: Category = load(&mut tx, id.as_str(), CommerceError::CategoryNotFound).await?;
    category.apply(patch)?;
    ensure_unique_slug::<Category>(&mut tx, &category.slug, category.id.as_str()).await?;
    tx.update(&category).await?;
    tx.commit().await?;
    Ok(category)
}

/// Delete a category nothing refers to.
pub async fn delete_category(state: &AppState, id: &CategoryId) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    load::<Category>(&mut tx, id.as_str(), CommerceError::CategoryNotFound).await?;

    let by_category = Filter::new().eq("category_id", id);
    if tx.count::<Subcategory>(&by_category).await? > 0
        || tx.count::<Product>(&by_category).await? > 0
    {
        return Err(CommerceError::InUse(format!("category {}", id)).into());
    }

    tx.delete::<Category>(id.as_str()).await?;
    tx.commit().await?;
    info!(category_id = %id, "category deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Subcategories
// ---------------------------------------------------------------------------

pub async fn create_subcategory(
    state: &AppState,
    input: NewSubcategory,
) -> Result<Subcategory, AppError> {
    let mut tx = state.db.begin().await?;
    load::<Category>(&mut tx, input.category_id.as_str(), CommerceError::CategoryNotFound).await?;
    let subcategory = Subcategory::create(input)?;
    ensure_unique_slug::<Subcategory>(&mut tx, &subcategory.slug, subcategory.id.as_str()).await?;
    tx.insert(&subcategory).await?;
    tx.commit().await?;

    info!(subcategory_id = %subcategory.id, category_id = %subcategory.category_id, "subcategory created");
    Ok(subcategory)
}

pub async fn get_subcategory(
    conn: &mut Connection,
    id: &SubcategoryId,
) -> Result<Subcategory, AppError> {
    load(conn, id.as_str(), CommerceError::SubcategoryNotFound).await
}

pub async fn list_subcategories(
    conn: &mut Connection,
    category_id: Option<&CategoryId>,
    active: Option<bool>,
    request: PageRequest,
) -> Result<Page<Subcategory>, AppError> {
    let filter = Filter::new()
        .eq_opt("category_id", category_id)
        .eq_opt("active", active);
    Ok(conn.page(&filter, &Sort::asc("position"), request).await?)
}

pub async fn update_subcategory(
    state: &AppState,
    id: &SubcategoryId,
    patch: SubcategoryPatch,
) -> Result<Subcategory, AppError> {
    let mut tx = state.db.begin().await?;
    let mut subcategory: Subcategory =
        load(&mut tx, id.as_str(), CommerceError::SubcategoryNotFound).await?;
    if let Some(category_id) = &patch.category_id {
        load::<Category>(&mut tx, category_id.as_str(), CommerceError::CategoryNotFound).await?;
    }
    subcategory.apply(patch)?;
    ensure_unique_slug::<Subcategory>(&mut tx, &subcategory.slug, subcategory.id.as_str()).await?;
    tx.update(&subcategory).await?;
    tx.commit().await?;
    Ok(subcategory)
}

pub async fn delete_subcategory(state: &AppState, id: &SubcategoryId) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    load::<Subcategory>(&mut tx, id.as_str(), CommerceError::SubcategoryNotFound).await?;
    if tx
        .count::<Product>(&Filter::new().eq("subcategory_id", id))
        .await?
        > 0
    {
        return Err(CommerceError::InUse(format!("subcategory {}", id)).into());
    }
    tx.delete::<Subcategory>(id.as_str()).await?;
    tx.commit().await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

/// Product listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    Oldest,
    NameAsc,
    NameDesc,
}

impl ProductSort {
    fn to_sort(self) -> Sort {
        match self {
            ProductSort::Newest => Sort::Newest,
            ProductSort::Oldest => Sort::Oldest,
            ProductSort::NameAsc => Sort::asc("name"),
            ProductSort::NameDesc => Sort::desc("name"),
        }
    }
}

/// Product list filters, straight from the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductQuery {
    pub category_id: Option<CategoryId>,
    pub subcategory_id: Option<SubcategoryId>,
    pub status: Option<ProductStatus>,
    /// Case-insensitive name substring.
    pub q: Option<String>,
    pub sort: Option<ProductSort>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ProductQuery {
    fn filter(&self, public: bool) -> Filter {
        let status = if public {
            Some(ProductStatus::Active)
        } else {
            self.status
        };
        let mut filter = Filter::new()
            .eq_opt("category_id", self.category_id.as_ref())
            .eq_opt("subcategory_id", self.subcategory_id.as_ref())
            .eq_opt("status", status.map(|s| s.as_str()));
        if let Some(q) = self.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            filter = filter.contains("name", q);
        }
        filter
    }
}

/// On-hand units of one variant at the default location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantStock {
    pub variant_id: VariantId,
    pub sku: String,
    pub available: i64,
    pub in_stock: bool,
}

/// Product detail response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductDetail {
    #[serde(flatten)]
    pub product: Product,
    pub stock: Vec<VariantStock>,
}

/// What deleting a product did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductRemoval {
    Deleted,
    /// Orders refer to it, so it was archived instead.
    Archived,
}

pub async fn create_product(state: &AppState, input: NewProduct) -> Result<Product, AppError> {
    let product = Product::create(input, state.currency)?;
    let mut tx = state.db.begin().await?;
    check_product(&mut tx, &product).await?;
    tx.insert(&product).await?;
    tx.commit().await?;

    info!(product_id = %product.id, slug = %product.slug, variants = product.variants.len(), "product created");
    Ok(product)
}

/// Look a product up by id, then by slug.
pub async fn find_product(conn: &mut Connection, id_or_slug: &str) -> Result<Product, AppError> {
    if is_valid_id(id_or_slug) {
        if let Some(product) = conn.get::<Product>(id_or_slug).await? {
            return Ok(product);
        }
    }
    conn.find_one::<Product>(&Filter::new().eq("slug", id_or_slug))
        .await?
        .ok_or_else(|| CommerceError::ProductNotFound(id_or_slug.to_string()).into())
}

/// Product with per-variant stock at the default location.
///
/// Public callers only see active products.
pub async fn get_product(
    conn: &mut Connection,
    id_or_slug: &str,
    public: bool,
) -> Result<ProductDetail, AppError> {
    let product = find_product(conn, id_or_slug).await?;
    if public && !product.is_available() {
        return Err(CommerceError::ProductNotFound(id_or_slug.to_string()).into());
    }

    let default_location = find_default_location(conn).await?;
    let mut stock = Vec::with_capacity(product.variants.len());
    for variant in &product.variants {
        let available = match &default_location {
            Some(location) => {
                let key = StockKey::new(
                    product.id.clone(),
                    variant.id.clone(),
                    location.id.clone(),
                );
                available_quantity(conn, &key).await?
            }
            None => 0,
        };
        stock.push(VariantStock {
            variant_id: variant.id.clone(),
            sku: variant.sku.clone(),
            available,
            in_stock: available > 0,
        });
    }

    Ok(ProductDetail { product, stock })
}

pub async fn list_products(
    conn: &mut Connection,
    query: &ProductQuery,
    public: bool,
) -> Result<Page<ProductSummary>, AppError> {
    let request = PageRequest::from_params(query.page, query.limit);
    let sort = query.sort.unwrap_or_default().to_sort();
    let page: Page<Product> = conn.page(&query.filter(public), &sort, request).await?;
    Ok(page.map(|p| p.summary()))
}

pub async fn update_product(
    state: &AppState,
    id: &ProductId,
    patch: ProductPatch,
) -> Result<Product, AppError> {
    let mut tx = state.db.begin().await?;
    let mut product: Product = load(&mut tx, id.as_str(), CommerceError::ProductNotFound).await?;
    product.apply(patch, state.currency)?;
    check_product(&mut tx, &product).await?;
    tx.update(&product).await?;
    tx.commit().await?;

    info!(product_id = %product.id, status = product.status.as_str(), "product updated");
    Ok(product)
}

/// Delete a product, or archive it when orders refer to it.
pub async fn delete_product(state: &AppState, id: &ProductId) -> Result<ProductRemoval, AppError> {
    let mut tx = state.db.begin().await?;
    let mut product: Product = load(&mut tx, id.as_str(), CommerceError::ProductNotFound).await?;

    let ordered = tx
        .count::<Order>(&Filter::new().element_eq("lines", "product_id", id))
        .await?;
    let outcome = if ordered > 0 {
        product.apply(
            ProductPatch {
                status: Some(ProductStatus::Archived),
                ..Default::default()
            },
            state.currency,
        )?;
        tx.update(&product).await?;
        ProductRemoval::Archived
    } else {
        tx.delete::<Product>(id.as_str()).await?;
        ProductRemoval::Deleted
    };
    tx.commit().await?;

    info!(product_id = %id, outcome = ?outcome, "product removed");
    Ok(outcome)
}

/// Products keyed by id. Missing ids are simply absent.
pub(crate) async fn products_by_id(
    conn: &mut Connection,
    ids: &[ProductId],
) -> Result<HashMap<ProductId, Product>, AppError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let products: Vec<Product> = conn
        .find(&Query::filter(Filter::new().is_in("id", ids)))
        .await?;
    Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
}

/// Summaries of the active products among `ids`, in the given order.
pub(crate) async fn active_summaries(
    conn: &mut Connection,
    ids: &[ProductId],
) -> Result<Vec<ProductSummary>, AppError> {
    let products = products_by_id(conn, ids).await?;
    Ok(ids
        .iter()
        .filter_map(|id| products.get(id))
        .filter(|p| p.is_available())
        .map(Product::summary)
        .collect())
}

/// Check a product's references and unique keys before saving it.
async fn check_product(conn: &mut Connection, product: &Product) -> Result<(), AppError> {
    load::<Category>(conn, product.category_id.as_str(), CommerceError::CategoryNotFound).await?;
    if let Some(subcategory_id) = &product.subcategory_id {
        let subcategory: Subcategory =
            load(conn, subcategory_id.as_str(), CommerceError::SubcategoryNotFound).await?;
        if subcategory.category_id != product.category_id {
            return Err(CommerceError::ValidationError(format!(
                "subcategory {} does not belong to category {}",
                subcategory_id, product.category_id
            ))
            .into());
        }
    }

    ensure_unique_slug::<Product>(conn, &product.slug, product.id.as_str()).await?;

    for sku in product.skus() {
        let taken = conn
            .count::<Product>(
                &Filter::new()
                    .element_eq("variants", "sku", sku)
                    .ne("id", &product.id),
            )
            .await?;
        if taken > 0 {
            return Err(CommerceError::Duplicate(format!("sku {}", sku)).into());
        }
    }
    Ok(())
}

/// Fail if another document of the collection already uses `slug`.
async fn ensure_unique_slug<T: shopline_db::Document>(
    conn: &mut Connection,
    slug: &str,
    own_id: &str,
) -> Result<(), AppError> {
    let taken = conn
        .count::<T>(&Filter::new().eq("slug", slug).ne("id", own_id))
        .await?;
    if taken > 0 {
        return Err(CommerceError::Duplicate(format!("slug {}", slug)).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{bdt, location, product, state, stock};
    use shopline_commerce::catalog::VariantInput;

    fn new_product(category_id: &CategoryId, name: &str, sku: &str) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            slug: None,
            description: None,
            category_id: category_id.clone(),
            subcategory_id: None,
            brand: None,
            images: Vec::new(),
            tags: Vec::new(),
            status: None,
            allow_preorder: false,
            variants: vec![VariantInput {
                id: None,
                sku: sku.to_string(),
                options: Vec::new(),
                price: bdt(50_000),
                compare_at_price: None,
            }],
        }
    }

    async fn category(state: &AppState, name: &str) -> Category {
        create_category(
            state,
            NewCategory {
                name: name.to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_category_slug_is_unique() {
        let state = state().await;
        let shirts = category(&state, "Shirts").await;
        assert_eq!(shirts.slug, "shirts");

        let err = create_category(
            &state,
            NewCategory {
                name: "SHIRTS".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let mut conn = state.db.acquire().await.unwrap();
        assert_eq!(get_category(&mut conn, "shirts").await.unwrap().id, shirts.id);
        assert_eq!(
            get_category(&mut conn, shirts.id.as_str()).await.unwrap().slug,
            "shirts"
        );
    }

    #[tokio::test]
    async fn test_category_in_use_cannot_be_deleted() {
        let state = state().await;
        let cat = category(&state, "Panjabi").await;
        let sub = create_subcategory(
            &state,
            NewSubcategory {
                category_id: cat.id.clone(),
                name: "Cotton".to_string(),
                slug: None,
                description: None,
                image_url: None,
                position: None,
                active: None,
            },
        )
        .await
        .unwrap();

        let err = delete_category(&state, &cat.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        delete_subcategory(&state, &sub.id).await.unwrap();
        delete_category(&state, &cat.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_subcategory_needs_existing_category() {
        let state = state().await;
        let err = create_subcategory(
            &state,
            NewSubcategory {
                category_id: CategoryId::generate(),
                name: "Orphan".to_string(),
                slug: None,
                description: None,
                image_url: None,
                position: None,
                active: None,
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_sku_unique_across_products() {
        let state = state().await;
        let cat = category(&state, "Shoes").await;
        create_product(&state, new_product(&cat.id, "Runner", "SH-1"))
            .await
            .unwrap();

        let err = create_product(&state, new_product(&cat.id, "Walker", "SH-1"))
            .await
            .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_subcategory_must_match_category() {
        let state = state().await;
        let men = category(&state, "Men").await;
        let women = category(&state, "Women").await;
        let sub = create_subcategory(
            &state,
            NewSubcategory {
                category_id: women.id.clone(),
                name: "Sarees".to_string(),
                slug: None,
                description: None,
                image_url: None,
                position: None,
                active: None,
            },
        )
        .await
        .unwrap();

        let mut input = new_product(&men.id, "Kurta", "K-1");
        input.subcategory_id = Some(sub.id);
        let err = create_product(&state, input).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_filters_and_public_visibility() {
        let state = state().await;
        let cat = category(&state, "Bags").await;
        create_product(&state, new_product(&cat.id, "Leather Tote", "B-1"))
            .await
            .unwrap();
        let mut draft = new_product(&cat.id, "Canvas Tote", "B-2");
        draft.status = Some(ProductStatus::Draft);
        let draft = create_product(&state, draft).await.unwrap();
        create_product(&state, new_product(&cat.id, "Backpack", "B-3"))
            .await
            .unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let query = ProductQuery {
            q: Some("tote".to_string()),
            sort: Some(ProductSort::NameAsc),
            ..Default::default()
        };

        let public = list_products(&mut conn, &query, true).await.unwrap();
        assert_eq!(public.items.len(), 1);
        assert_eq!(public.items[0].name, "Leather Tote");

        let admin = list_products(&mut conn, &query, false).await.unwrap();
        let names: Vec<&str> = admin.items.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Canvas Tote", "Leather Tote"]);

        assert!(get_product(&mut conn, draft.id.as_str(), true).await.is_err());
        assert!(get_product(&mut conn, &draft.slug, false).await.is_ok());
    }

    #[tokio::test]
    async fn test_detail_reports_default_location_stock() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let other = location(&state, "OUTLET", false).await;
        let shirt = product(&state, "Shirt", &["S-1", "S-2"]).await;
        stock(&state, &shirt, 0, &main, 4, 300).await;
        stock(&state, &shirt, 1, &other, 9, 300).await;

        let mut conn = state.db.acquire().await.unwrap();
        let detail = get_product(&mut conn, &shirt.slug, true).await.unwrap();
        assert_eq!(detail.stock[0].available, 4);
        assert!(detail.stock[0].in_stock);
        assert_eq!(detail.stock[1].available, 0);
        assert!(!detail.stock[1].in_stock);
    }

    #[tokio::test]
    async fn test_delete_unreferenced_product() {
        let state = state().await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        assert_eq!(
            delete_product(&state, &shirt.id).await.unwrap(),
            ProductRemoval::Deleted
        );
        let mut conn = state.db.acquire().await.unwrap();
        assert!(conn.get::<Product>(shirt.id.as_str()).await.unwrap().is_none());
    }
}
