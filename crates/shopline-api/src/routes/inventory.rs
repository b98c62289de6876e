//! Locations, stock, adjustments, purchases and transfers (admin).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use shopline_auth::Permission;
use shopline_commerce::ids::{LocationId, ProductId, PurchaseId, TransferId};
use shopline_commerce::inventory::{
    InventoryAdjustment, Location, LocationPatch, NewAdjustment, NewLocation, StockRecord,
};
use shopline_commerce::purchase::{NewPurchase, Purchase, PurchasePatch};
use shopline_commerce::transfer::{NewTransfer, Transfer};
use shopline_db::PageRequest;

use super::{AppRouter, Paging};
use crate::middleware::Caller;
use crate::response::{created, ok, paged, ApiJson, ApiQuery, ApiResult, Created};
use crate::services::inventory::{self, AdjustmentQuery, ProductStock};
use crate::services::purchase::{self, PurchaseQuery};
use crate::services::transfer::{self, TransferQuery};
use crate::state::AppState;

pub fn routes() -> AppRouter {
    Router::new()
        .route("/locations", get(list_locations).post(create_location))
        .route(
            "/locations/{id}",
            get(get_location)
                .patch(update_location)
                .delete(delete_location),
        )
        .route("/inventory/products/{id}", get(product_stock))
        .route("/inventory/locations/{id}", get(location_stock))
        .route(
            "/inventory/adjustments",
            get(list_adjustments).post(adjust),
        )
        .route("/purchases", get(list_purchases).post(create_purchase))
        .route("/purchases/{id}", get(get_purchase).patch(update_purchase))
        .route("/purchases/{id}/receive", post(receive_purchase))
        .route("/purchases/{id}/cancel", post(cancel_purchase))
        .route("/transfers", get(list_transfers).post(create_transfer))
        .route("/transfers/{id}", get(get_transfer))
}

#[derive(Debug, Deserialize)]
struct LocationQuery {
    active: Option<bool>,
    page: Option<i64>,
    limit: Option<i64>,
}

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

async fn list_locations(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<LocationQuery>,
) -> ApiResult<Vec<Location>> {
    user.require(Permission::InventoryRead)?;
    let mut conn = state.db.acquire().await?;
    let request = PageRequest::from_params(query.page, query.limit);
    paged(inventory::list_locations(&mut conn, query.active, request).await?)
}

async fn get_location(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Location> {
    user.require(Permission::InventoryRead)?;
    let id = LocationId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(inventory::get_location(&mut conn, &id).await?)
}

async fn create_location(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewLocation>,
) -> Created<Location> {
    user.require(Permission::InventoryWrite)?;
    created(inventory::create_location(&state, body).await?)
}

async fn update_location(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<LocationPatch>,
) -> ApiResult<Location> {
    user.require(Permission::InventoryWrite)?;
    let id = LocationId::parse(&id)?;
    ok(inventory::update_location(&state, &id, body).await?)
}

async fn delete_location(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<()> {
    user.require(Permission::InventoryWrite)?;
    let id = LocationId::parse(&id)?;
    inventory::delete_location(&state, &id).await?;
    ok(())
}

// ---------------------------------------------------------------------------
// Stock
// ---------------------------------------------------------------------------

async fn product_stock(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<ProductStock> {
    user.require(Permission::InventoryRead)?;
    let id = ProductId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(inventory::product_stock(&mut conn, &id).await?)
}

async fn location_stock(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<StockRecord>> {
    user.require(Permission::InventoryRead)?;
    let id = LocationId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    paged(inventory::location_stock(&mut conn, &id, paging.request()).await?)
}

async fn adjust(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewAdjustment>,
) -> Created<InventoryAdjustment> {
    user.require(Permission::InventoryWrite)?;
    created(inventory::adjust(&state, body, &user).await?)
}

async fn list_adjustments(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<AdjustmentQuery>,
) -> ApiResult<Vec<InventoryAdjustment>> {
    user.require(Permission::InventoryRead)?;
    let mut conn = state.db.acquire().await?;
    paged(inventory::list_adjustments(&mut conn, &query).await?)
}

// ---------------------------------------------------------------------------
// Purchases
// ---------------------------------------------------------------------------

async fn list_purchases(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<PurchaseQuery>,
) -> ApiResult<Vec<Purchase>> {
    user.require(Permission::PurchaseWrite)?;
    let mut conn = state.db.acquire().await?;
    paged(purchase::list(&mut conn, &query).await?)
}

async fn create_purchase(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewPurchase>,
) -> Created<Purchase> {
    user.require(Permission::PurchaseWrite)?;
    created(purchase::create(&state, body, &user).await?)
}

async fn get_purchase(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Purchase> {
    user.require(Permission::PurchaseWrite)?;
    let id = PurchaseId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(purchase::get(&mut conn, &id).await?)
}

async fn update_purchase(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<PurchasePatch>,
) -> ApiResult<Purchase> {
    user.require(Permission::PurchaseWrite)?;
    let id = PurchaseId::parse(&id)?;
    ok(purchase::update(&state, &id, body).await?)
}

async fn receive_purchase(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Purchase> {
    user.require(Permission::PurchaseWrite)?;
    let id = PurchaseId::parse(&id)?;
    ok(purchase::receive(&state, &id).await?)
}

async fn cancel_purchase(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Purchase> {
    user.require(Permission::PurchaseWrite)?;
    let id = PurchaseId::parse(&id)?;
    ok(purchase::cancel(&state, &id).await?)
}

// ---------------------------------------------------------------------------
// Transfers
// ---------------------------------------------------------------------------

async fn list_transfers(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(query): ApiQuery<TransferQuery>,
) -> ApiResult<Vec<Transfer>> {
    user.require(Permission::TransferWrite)?;
    let mut conn = state.db.acquire().await?;
    paged(transfer::list(&mut conn, &query).await?)
}

async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<NewTransfer>,
) -> Created<Transfer> {
    user.require(Permission::TransferWrite)?;
    created(transfer::create(&state, body, &user).await?)
}

async fn get_transfer(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Transfer> {
    user.require(Permission::TransferWrite)?;
    let id = TransferId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(transfer::get(&mut conn, &id).await?)
}
