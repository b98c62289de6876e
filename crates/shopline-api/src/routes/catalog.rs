//! Public catalog and storefront reads.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use shopline_commerce::catalog::{Category, ProductSummary, Subcategory};
use shopline_commerce::ids::{CategoryId, SubcategoryId};
use shopline_commerce::CommerceError;
use shopline_db::PageRequest;

use super::{AppRouter, Paging};
use crate::response::{ok, paged, ApiQuery, ApiResult};
use crate::services::catalog::{self, ProductDetail, ProductQuery};
use crate::services::storefront::{self, StorefrontView};
use crate::state::AppState;

pub fn public() -> AppRouter {
    Router::new()
        .route("/categories", get(list_categories))
        .route("/categories/{id_or_slug}", get(get_category))
        .route("/subcategories", get(list_subcategories))
        .route("/subcategories/{id}", get(get_subcategory))
        .route("/products", get(list_products))
        .route("/products/{id_or_slug}", get(get_product))
        .route("/storefront", get(get_storefront))
}

#[derive(Debug, Deserialize)]
struct SubcategoryQuery {
    category_id: Option<CategoryId>,
    page: Option<i64>,
    limit: Option<i64>,
}

async fn list_categories(
    State(state): State<Arc<AppState>>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<Category>> {
    let mut conn = state.db.acquire().await?;
    paged(catalog::list_categories(&mut conn, Some(true), paging.request()).await?)
}

async fn get_category(
    State(state): State<Arc<AppState>>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<Category> {
    let mut conn = state.db.acquire().await?;
    let category = catalog::get_category(&mut conn, &id_or_slug).await?;
    if !category.active {
        return Err(CommerceError::CategoryNotFound(id_or_slug).into());
    }
    ok(category)
}

async fn list_subcategories(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<SubcategoryQuery>,
) -> ApiResult<Vec<Subcategory>> {
    let mut conn = state.db.acquire().await?;
    paged(
        catalog::list_subcategories(
            &mut conn,
            query.category_id.as_ref(),
            Some(true),
            PageRequest::from_params(query.page, query.limit),
        )
        .await?,
    )
}

async fn get_subcategory(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Subcategory> {
    let id = SubcategoryId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    let subcategory = catalog::get_subcategory(&mut conn, &id).await?;
    if !subcategory.active {
        return Err(CommerceError::SubcategoryNotFound(id.to_string()).into());
    }
    ok(subcategory)
}

async fn list_products(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Vec<ProductSummary>> {
    let mut conn = state.db.acquire().await?;
    paged(catalog::list_products(&mut conn, &query, true).await?)
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Path(id_or_slug): Path<String>,
) -> ApiResult<ProductDetail> {
    let mut conn = state.db.acquire().await?;
    ok(catalog::get_product(&mut conn, &id_or_slug, true).await?)
}

async fn get_storefront(State(state): State<Arc<AppState>>) -> ApiResult<StorefrontView> {
    let mut conn = state.db.acquire().await?;
    ok(storefront::get(&mut conn).await?)
}
