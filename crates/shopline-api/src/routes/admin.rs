//! Back-office routes, mounted under `/api/admin`.
//!
//! Each handler checks a single permission of the caller's role before
//! touching anything.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post, put};
use axum::Router;
use serde::Serialize;
use shopline_auth::{Permission, RoleDoc, UserProfile};
use shopline_commerce::catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, NewSubcategory, Product, ProductPatch,
    ProductSummary, Subcategory, SubcategoryPatch,
};
use shopline_commerce::checkout::Order;
use shopline_commerce::ids::{BannerId, CategoryId, OrderId, PaymentId, ProductId, SubcategoryId, UserId};
use shopline_commerce::payment::Payment;
use shopline_commerce::storefront::{Banner, BannerPatch, NewBanner};

use super::{inventory, AppRouter};
use crate::middleware::Caller;
use crate::response::{created, ok, paged, ApiJson, ApiQuery, ApiResult, Created};
use crate::services::account::{self, NewRole, RoleAssignment, RolePermissions};
use crate::services::catalog::{self, ProductDetail, ProductQuery, ProductRemoval};
use crate::services::order::{self, OrderQuery, StatusUpdate};
use crate::services::{payment, storefront};
use crate::state::AppState;

pub fn routes() -> AppRouter {
    Router::new()
        .route("/categories", post(create_category))
        .route(
            "/categories/{id}",
            patch(update_category).delete(delete_category),
        )
        .route("/subcategories", post(create_subcategory))
        .route(
            "/subcategories/{id}",
            patch(update_subcategory).delete(delete_subcategory),
        )
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/storefront/banners", post(push_banner))
        .route(
            "/storefront/banners/{id}",
            patch(update_banner).delete(pull_banner),
        )
        .route(
            "/storefront/featured/{product_id}",
            post(push_featured).delete(pull_featured),
        )
        .route("/orders", get(list_orders))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route("/payments/{id}/collect", post(collect_payment))
        .route("/roles", get(list_roles).post(create_role))
        .route("/roles/{name}", patch(update_role).delete(delete_role))
        .route("/users/{id}/role", put(assign_role))
        .merge(inventory::routes())
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

async fn create_category(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewCategory>,
) -> Created<Category> {
    user.require(Permission::CatalogWrite)?;
    created(catalog::create_category(&state, body).await?)
}

async fn update_category(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<CategoryPatch>,
) -> ApiResult<Category> {
    user.require(Permission::CatalogWrite)?;
    let id = CategoryId::parse(&id)?;
    ok(catalog::update_category(&state, &id, body).await?)
}

async fn delete_category(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(Permission::CatalogWrite)?;
    let id = CategoryId::parse(&id)?;
    catalog::delete_category(&state, &id).await?;
    ok(())
}

async fn create_subcategory(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewSubcategory>,
) -> Created<Subcategory> {
    user.require(Permission::CatalogWrite)?;
    created(catalog::create_subcategory(&state, body).await?)
}

async fn update_subcategory(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<SubcategoryPatch>,
) -> ApiResult<Subcategory> {
    user.require(Permission::CatalogWrite)?;
    let id = SubcategoryId::parse(&id)?;
    ok(catalog::update_subcategory(&state, &id, body).await?)
}

async fn delete_subcategory(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(Permission::CatalogWrite)?;
    let id = SubcategoryId::parse(&id)?;
    catalog::delete_subcategory(&state, &id).await?;
    ok(())
}

/// Every status, not just active products.
async fn list_products(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<ProductQuery>,
) -> ApiResult<Vec<ProductSummary>> {
    user.require(Permission::CatalogWrite)?;
    let mut conn = state.db.acquire().await?;
    paged(catalog::list_products(&mut conn, &query, false).await?)
}

async fn get_product(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<ProductDetail> {
    user.require(Permission::CatalogWrite)?;
    let mut conn = state.db.acquire().await?;
    ok(catalog::get_product(&mut conn, &id, false).await?)
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewProduct>,
) -> Created<Product> {
    user.require(Permission::CatalogWrite)?;
    created(catalog::create_product(&state, body).await?)
}

async fn update_product(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ProductPatch>,
) -> ApiResult<Product> {
    user.require(Permission::CatalogWrite)?;
    let id = ProductId::parse(&id)?;
    ok(catalog::update_product(&state, &id, body).await?)
}

#[derive(Debug, Serialize)]
struct Removal {
    result: ProductRemoval,
}

async fn delete_product(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Removal> {
    user.require(Permission::CatalogWrite)?;
    let id = ProductId::parse(&id)?;
    ok(Removal {
        result: catalog::delete_product(&state, &id).await?,
    })
}

// ---------------------------------------------------------------------------
// Storefront
// ---------------------------------------------------------------------------

async fn push_banner(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewBanner>,
) -> Created<Banner> {
    user.require(Permission::BannerWrite)?;
    created(storefront::push_banner(&state, body).await?)
}

async fn update_banner(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<BannerPatch>,
) -> ApiResult<Banner> {
    user.require(Permission::BannerWrite)?;
    let id = BannerId::parse(&id)?;
    ok(storefront::update_banner(&state, &id, body).await?)
}

async fn pull_banner(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(Permission::BannerWrite)?;
    let id = BannerId::parse(&id)?;
    storefront::pull_banner(&state, &id).await?;
    ok(())
}

async fn push_featured(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(product_id): Path<String>,
) -> ApiResult<Vec<ProductId>> {
    user.require(Permission::BannerWrite)?;
    let product_id = ProductId::parse(&product_id)?;
    ok(storefront::push_featured(&state, &product_id).await?)
}

async fn pull_featured(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(product_id): Path<String>,
) -> ApiResult<Vec<ProductId>> {
    user.require(Permission::BannerWrite)?;
    let product_id = ProductId::parse(&product_id)?;
    ok(storefront::pull_featured(&state, &product_id).await?)
}

// ---------------------------------------------------------------------------
// Orders and payments
// ---------------------------------------------------------------------------

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<OrderQuery>,
) -> ApiResult<Vec<Order>> {
    user.require(Permission::OrderManage)?;
    let mut conn = state.db.acquire().await?;
    paged(order::list_all(&mut conn, &query).await?)
}

async fn update_order_status(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    user.require(Permission::OrderManage)?;
    let id = OrderId::parse(&id)?;
    ok(order::update_status(&state, &user, &id, body.status).await?)
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    user.require(Permission::OrderManage)?;
    let id = OrderId::parse(&id)?;
    ok(order::cancel(&state, &user, &id).await?)
}

async fn collect_payment(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Payment> {
    user.require(Permission::OrderManage)?;
    let id = PaymentId::parse(&id)?;
    ok(payment::collect(&state, &id).await?)
}

// ---------------------------------------------------------------------------
// Roles and users
// ---------------------------------------------------------------------------

async fn list_roles(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<Vec<RoleDoc>> {
    user.require(Permission::UserManage)?;
    let mut conn = state.db.acquire().await?;
    ok(account::list_roles(&mut conn).await?)
}

async fn create_role(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewRole>,
) -> Created<RoleDoc> {
    user.require(Permission::UserManage)?;
    created(account::create_role(&state, body).await?)
}

async fn update_role(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(name): Path<String>,
    ApiJson(body): ApiJson<RolePermissions>,
) -> ApiResult<RoleDoc> {
    user.require(Permission::UserManage)?;
    ok(account::update_role(&state, &name, body.permissions).await?)
}

async fn delete_role(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(name): Path<String>,
) -> ApiResult<()> {
    user.require(Permission::UserManage)?;
    account::delete_role(&state, &name).await?;
    ok(())
}

async fn assign_role(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<RoleAssignment>,
) -> ApiResult<UserProfile> {
    user.require(Permission::UserManage)?;
    let id = UserId::parse(&id)?;
    ok(account::assign_role(&state, &id, &body.role).await?)
}
