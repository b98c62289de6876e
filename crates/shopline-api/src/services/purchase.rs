//! Supplier purchase orders.

use serde::Deserialize;
use shopline_auth::AuthUser;
use shopline_commerce::catalog::Product;
use shopline_commerce::ids::{LocationId, PurchaseId};
use shopline_commerce::inventory::{Location, LotSource, LotSourceKind, StockKey, StockLot};
use shopline_commerce::purchase::{NewPurchase, Purchase, PurchaseLine, PurchasePatch, PurchaseStatus};
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore, Filter, Page, PageRequest, Sort};
use tracing::info;

use super::inventory::receive_lot;
use super::load;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PurchaseQuery {
    pub status: Option<PurchaseStatus>,
    pub location_id: Option<LocationId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Record a draft purchase.
pub async fn create(
    state: &AppState,
    input: NewPurchase,
    user: &AuthUser,
) -> Result<Purchase, AppError> {
    let purchase = Purchase::create(input, user.email.clone(), state.currency)?;
    let mut tx = state.db.begin().await?;
    check_references(&mut tx, &purchase).await?;
    tx.insert(&purchase).await?;
    tx.commit().await?;

    info!(purchase_id = %purchase.id, number = %purchase.number, lines = purchase.lines.len(), "purchase created");
    Ok(purchase)
}

pub async fn get(conn: &mut Connection, id: &PurchaseId) -> Result<Purchase, AppError> {
    load(conn, id.as_str(), CommerceError::PurchaseNotFound).await
}

pub async fn list(conn: &mut Connection, query: &PurchaseQuery) -> Result<Page<Purchase>, AppError> {
    let filter = Filter::new()
        .eq_opt("status", query.status.map(|s| s.as_str()))
        .eq_opt("location_id", query.location_id.as_ref());
    let request = PageRequest::from_params(query.page, query.limit);
    Ok(conn.page(&filter, &Sort::Newest, request).await?)
}

/// Edit a draft purchase.
pub async fn update(
    state: &AppState,
    id: &PurchaseId,
    patch: PurchasePatch,
) -> Result<Purchase, AppError> {
    let mut tx = state.db.begin().await?;
    let mut purchase: Purchase = load(&mut tx, id.as_str(), CommerceError::PurchaseNotFound).await?;
    purchase.apply(patch, state.currency)?;
    check_references(&mut tx, &purchase).await?;
    tx.update(&purchase).await?;
    tx.commit().await?;
    Ok(purchase)
}

/// Receive a draft purchase: one lot per line at the purchase's location.
pub async fn receive(state: &AppState, id: &PurchaseId) -> Result<Purchase, AppError> {
    let mut tx = state.db.begin().await?;
    let mut purchase: Purchase = load(&mut tx, id.as_str(), CommerceError::PurchaseNotFound).await?;
    purchase.receive()?;

    let location: Location =
        load(&mut tx, purchase.location_id.as_str(), CommerceError::LocationNotFound).await?;
    if !location.active {
        return Err(CommerceError::NotAllowed(format!("location {} is inactive", location.code)).into());
    }

    for line in &purchase.lines {
        let key = StockKey::new(
            line.product_id.clone(),
            line.variant_id.clone(),
            purchase.location_id.clone(),
        );
        let source = LotSource::new(LotSourceKind::Purchase, purchase.number.clone());
        let lot = StockLot::receive(&key, line.quantity, line.unit_cost, source)?;
        receive_lot(&mut tx, lot).await?;
    }

    tx.update(&purchase).await?;
    tx.commit().await?;

    info!(purchase_id = %purchase.id, number = %purchase.number, total_cost = %purchase.total_cost, "purchase received");
    Ok(purchase)
}

pub async fn cancel(state: &AppState, id: &PurchaseId) -> Result<Purchase, AppError> {
    let mut tx = state.db.begin().await?;
    let mut purchase: Purchase = load(&mut tx, id.as_str(), CommerceError::PurchaseNotFound).await?;
    purchase.cancel()?;
    tx.update(&purchase).await?;
    tx.commit().await?;

    info!(purchase_id = %purchase.id, "purchase cancelled");
    Ok(purchase)
}

async fn check_references(conn: &mut Connection, purchase: &Purchase) -> Result<(), AppError> {
    load::<Location>(conn, purchase.location_id.as_str(), CommerceError::LocationNotFound).await?;
    for PurchaseLine {
        product_id,
        variant_id,
        ..
    } in &purchase.lines
    {
        let product: Product = load(conn, product_id.as_str(), CommerceError::ProductNotFound).await?;
        product.require_variant(variant_id)?;
    }
    Ok(())
}
