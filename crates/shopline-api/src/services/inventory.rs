//! Locations, stock records, cost lots and adjustments.
//!
//! A key's stock record always equals the sum of `remaining` over its lots.
//! The helpers here are the only code that changes either, and they always
//! change both on the same connection.

use serde::{Deserialize, Serialize};
use shopline_auth::AuthUser;
use shopline_commerce::catalog::Product;
use shopline_commerce::inventory::{
    allocate_fifo, apply_allocations, InventoryAdjustment, Location, LocationPatch, LotAllocation,
    LotSource, NewAdjustment, NewLocation, StockKey, StockLot, StockRecord,
};
use shopline_commerce::ids::{LocationId, ProductId, VariantId};
use shopline_commerce::{CommerceError, Money};
use shopline_db::{Connection, DocumentStore, Filter, Page, PageRequest, Query, Sort};
use tracing::{debug, info};

use super::load;
use crate::error::AppError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Locations
// ---------------------------------------------------------------------------

/// Create a location. The first location becomes the default.
pub async fn create_location(state: &AppState, input: NewLocation) -> Result<Location, AppError> {
    let mut location = Location::create(input)?;
    let mut tx = state.db.begin().await?;
    ensure_unique_code(&mut tx, &location).await?;

    if find_default_location(&mut tx).await?.is_none() {
        location.is_default = true;
    }
    if location.is_default {
        clear_default(&mut tx, &location.id).await?;
    }
    tx.insert(&location).await?;
    tx.commit().await?;

    info!(location_id = %location.id, code = %location.code, is_default = location.is_default, "location created");
    Ok(location)
}

pub async fn get_location(conn: &mut Connection, id: &LocationId) -> Result<Location, AppError> {
    load(conn, id.as_str(), CommerceError::LocationNotFound).await
}

pub async fn list_locations(
    conn: &mut Connection,
    active: Option<bool>,
    request: PageRequest,
) -> Result<Page<Location>, AppError> {
    let filter = Filter::new().eq_opt("active", active);
    Ok(conn.page(&filter, &Sort::asc("code"), request).await?)
}

pub async fn update_location(
    state: &AppState,
    id: &LocationId,
    patch: LocationPatch,
) -> Result<Location, AppError> {
    let mut tx = state.db.begin().await?;
    let mut location: Location = load(&mut tx, id.as_str(), CommerceError::LocationNotFound).await?;
    let was_default = location.is_default;

    if was_default && patch.is_default == Some(false) {
        return Err(CommerceError::NotAllowed(
            "make another location the default instead".to_string(),
        )
        .into());
    }

    location.apply(patch)?;
    ensure_unique_code(&mut tx, &location).await?;
    if location.is_default && !was_default {
        clear_default(&mut tx, &location.id).await?;
    }
    tx.update(&location).await?;
    tx.commit().await?;

    info!(location_id = %location.id, is_default = location.is_default, "location updated");
    Ok(location)
}

/// Delete a location that holds no stock and is not the default.
pub async fn delete_location(state: &AppState, id: &LocationId) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    let location: Location = load(&mut tx, id.as_str(), CommerceError::LocationNotFound).await?;
    if location.is_default {
        return Err(CommerceError::NotAllowed("the default location cannot be deleted".to_string()).into());
    }

    let holding = tx
        .count::<StockRecord>(&Filter::new().eq("location_id", id).gt("quantity", 0))
        .await?;
    if holding > 0 {
        return Err(CommerceError::InUse(format!("location {}", location.code)).into());
    }

    tx.delete::<Location>(id.as_str()).await?;
    tx.commit().await?;
    info!(location_id = %id, "location deleted");
    Ok(())
}

async fn ensure_unique_code(conn: &mut Connection, location: &Location) -> Result<(), AppError> {
    let taken = conn
        .count::<Location>(
            &Filter::new()
                .eq("code", &location.code)
                .ne("id", &location.id),
        )
        .await?;
    if taken > 0 {
        return Err(CommerceError::Duplicate(format!("location code {}", location.code)).into());
    }
    Ok(())
}

/// Unset `is_default` on every location except `keep`.
async fn clear_default(conn: &mut Connection, keep: &LocationId) -> Result<(), AppError> {
    let others: Vec<Location> = conn
        .find(&Query::filter(
            Filter::new().eq("is_default", true).ne("id", keep),
        ))
        .await?;
    for mut other in others {
        other.is_default = false;
        conn.update(&other).await?;
    }
    Ok(())
}

pub async fn find_default_location(conn: &mut Connection) -> Result<Option<Location>, AppError> {
    Ok(conn
        .find_one::<Location>(&Filter::new().eq("is_default", true))
        .await?)
}

/// The location online orders ship from.
pub async fn default_location(conn: &mut Connection) -> Result<Location, AppError> {
    find_default_location(conn)
        .await?
        .ok_or_else(|| CommerceError::NotAllowed("no default location is configured".to_string()).into())
}

// ---------------------------------------------------------------------------
// Stock records and lots
// ---------------------------------------------------------------------------

/// The key's stock record, or an empty one.
pub(crate) async fn stock_record(
    conn: &mut Connection,
    key: &StockKey,
) -> Result<StockRecord, AppError> {
    Ok(conn
        .get::<StockRecord>(&key.record_id())
        .await?
        .unwrap_or_else(|| StockRecord::empty(key)))
}

/// On-hand units for a key.
pub async fn available_quantity(conn: &mut Connection, key: &StockKey) -> Result<i64, AppError> {
    Ok(conn
        .get::<StockRecord>(&key.record_id())
        .await?
        .map(|r| r.quantity)
        .unwrap_or(0))
}

/// Units available for a variant at the default location. Zero when no
/// default location exists.
pub async fn available_at_default(
    conn: &mut Connection,
    product_id: &ProductId,
    variant_id: &VariantId,
) -> Result<i64, AppError> {
    match find_default_location(conn).await? {
        Some(location) => {
            let key = StockKey::new(product_id.clone(), variant_id.clone(), location.id);
            available_quantity(conn, &key).await
        }
        None => Ok(0),
    }
}

/// Lots of a key that still hold units, oldest first.
pub(crate) async fn load_lots(
    conn: &mut Connection,
    key: &StockKey,
) -> Result<Vec<StockLot>, AppError> {
    let query = Query::filter(
        Filter::new()
            .eq("product_id", &key.product_id)
            .eq("variant_id", &key.variant_id)
            .eq("location_id", &key.location_id)
            .gt("remaining", 0),
    )
    .sort(Sort::asc("received_at"));
    let mut lots: Vec<StockLot> = conn.find(&query).await?;
    lots.sort_by_key(|l| (l.received_at, l.seq));
    Ok(lots)
}

/// Take `quantity` units from a key's lots, oldest first, and decrement its
/// stock record. Nothing is written when the lots fall short.
pub(crate) async fn consume_fifo(
    conn: &mut Connection,
    key: &StockKey,
    quantity: i64,
) -> Result<Vec<LotAllocation>, AppError> {
    let mut lots = load_lots(conn, key).await?;
    let plan = allocate_fifo(&lots, &key.variant_id, quantity)?;

    let mut record = stock_record(conn, key).await?;
    record.apply_delta(-quantity)?;

    for lot in apply_allocations(&mut lots, &plan)? {
        conn.save(lot).await?;
    }
    conn.save(&record).await?;

    debug!(record = %record.id, quantity, lots = plan.len(), "stock consumed");
    Ok(plan)
}

/// Store a new lot and increment its key's stock record.
pub(crate) async fn receive_lot(conn: &mut Connection, lot: StockLot) -> Result<StockLot, AppError> {
    let quantity = lot.quantity;
    let mut record = stock_record(conn, &lot.key()).await?;
    record.apply_delta(quantity)?;

    conn.insert(&lot).await?;
    conn.save(&record).await?;

    debug!(record = %record.id, lot_id = %lot.id, quantity, "lot received");
    Ok(lot)
}

/// Return allocated units to the lots they came from.
pub(crate) async fn restore_allocations(
    conn: &mut Connection,
    key: &StockKey,
    allocations: &[LotAllocation],
) -> Result<(), AppError> {
    if allocations.is_empty() {
        return Ok(());
    }

    let mut restored = 0;
    for allocation in allocations {
        let mut lot: StockLot = conn.require(allocation.lot_id.as_str()).await?;
        lot.restore(allocation.quantity)?;
        conn.save(&lot).await?;
        restored += allocation.quantity;
    }

    let mut record = stock_record(conn, key).await?;
    record.apply_delta(restored)?;
    conn.save(&record).await?;

    debug!(record = %record.id, quantity = restored, "stock restored");
    Ok(())
}

// ---------------------------------------------------------------------------
// Stock views
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationQuantity {
    pub location_id: LocationId,
    pub code: String,
    pub name: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VariantStockGrid {
    pub variant_id: VariantId,
    pub sku: String,
    pub total: i64,
    pub locations: Vec<LocationQuantity>,
}

/// Stock of every variant of a product at every location.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductStock {
    pub product_id: ProductId,
    pub name: String,
    pub variants: Vec<VariantStockGrid>,
}

pub async fn product_stock(
    conn: &mut Connection,
    product_id: &ProductId,
) -> Result<ProductStock, AppError> {
    let product: Product = load(conn, product_id.as_str(), CommerceError::ProductNotFound).await?;
    let locations: Vec<Location> = conn
        .find(&Query::filter(Filter::new()).sort(Sort::asc("code")))
        .await?;
    let records: Vec<StockRecord> = conn
        .find(&Query::filter(Filter::new().eq("product_id", product_id)))
        .await?;

    let variants = product
        .variants
        .iter()
        .map(|variant| {
            let locations: Vec<LocationQuantity> = locations
                .iter()
                .map(|location| LocationQuantity {
                    location_id: location.id.clone(),
                    code: location.code.clone(),
                    name: location.name.clone(),
                    quantity: records
                        .iter()
                        .find(|r| r.variant_id == variant.id && r.location_id == location.id)
                        .map(|r| r.quantity)
                        .unwrap_or(0),
                })
                .collect();
            VariantStockGrid {
                variant_id: variant.id.clone(),
                sku: variant.sku.clone(),
                total: locations.iter().map(|l| l.quantity).sum(),
                locations,
            }
        })
        .collect();

    Ok(ProductStock {
        product_id: product.id,
        name: product.name,
        variants,
    })
}

/// Stock records held at a location, most recently changed first.
pub async fn location_stock(
    conn: &mut Connection,
    location_id: &LocationId,
    request: PageRequest,
) -> Result<Page<StockRecord>, AppError> {
    get_location(conn, location_id).await?;
    let filter = Filter::new().eq("location_id", location_id);
    Ok(conn
        .page(&filter, &Sort::desc("updated_at"), request)
        .await?)
}

// ---------------------------------------------------------------------------
// Adjustments
// ---------------------------------------------------------------------------

/// Add or remove stock by hand.
///
/// A positive change receives a lot at `unit_cost` (zero when absent); a
/// negative change consumes lots FIFO.
pub async fn adjust(
    state: &AppState,
    input: NewAdjustment,
    user: &AuthUser,
) -> Result<InventoryAdjustment, AppError> {
    input.validate()?;
    let key = input.key();

    let mut tx = state.db.begin().await?;
    let product: Product = load(&mut tx, key.product_id.as_str(), CommerceError::ProductNotFound).await?;
    product.require_variant(&key.variant_id)?;
    load::<Location>(&mut tx, key.location_id.as_str(), CommerceError::LocationNotFound).await?;

    let mut adjustment = InventoryAdjustment::record(&input, 0).by(user.email.clone());

    if input.change > 0 {
        let unit_cost = input.unit_cost.unwrap_or_else(|| Money::zero(state.currency));
        if unit_cost.currency != state.currency {
            return Err(CommerceError::CurrencyMismatch {
                expected: state.currency.code().to_string(),
                got: unit_cost.currency.code().to_string(),
            }
            .into());
        }
        let source = LotSource::new(
            input.reason.lot_source(),
            input
                .reference
                .clone()
                .unwrap_or_else(|| adjustment.id.to_string()),
        );
        let lot = StockLot::receive(&key, input.change, unit_cost, source)?;
        let lot = receive_lot(&mut tx, lot).await?;
        adjustment = adjustment.with_lot(lot.id);
    } else {
        let allocations = consume_fifo(&mut tx, &key, -input.change).await?;
        adjustment = adjustment.with_allocations(allocations);
    }

    adjustment.quantity_after = available_quantity(&mut tx, &key).await?;
    tx.insert(&adjustment).await?;
    tx.commit().await?;

    info!(
        adjustment_id = %adjustment.id,
        variant_id = %adjustment.variant_id,
        location_id = %adjustment.location_id,
        change = adjustment.change,
        reason = adjustment.reason.as_str(),
        "inventory adjusted"
    );
    Ok(adjustment)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdjustmentQuery {
    pub product_id: Option<ProductId>,
    pub location_id: Option<LocationId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

pub async fn list_adjustments(
    conn: &mut Connection,
    query: &AdjustmentQuery,
) -> Result<Page<InventoryAdjustment>, AppError> {
    let filter = Filter::new()
        .eq_opt("product_id", query.product_id.as_ref())
        .eq_opt("location_id", query.location_id.as_ref());
    let request = PageRequest::from_params(query.page, query.limit);
    Ok(conn.page(&filter, &Sort::Newest, request).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{admin, bdt, location, product, state, stock};
    use shopline_commerce::inventory::{AdjustmentReason, LotSourceKind};

    fn adjustment(product: &Product, location: &Location, change: i64) -> NewAdjustment {
        NewAdjustment {
            product_id: product.id.clone(),
            variant_id: product.variants[0].id.clone(),
            location_id: location.id.clone(),
            change,
            unit_cost: None,
            reason: AdjustmentReason::Correction,
            reference: Some("COUNT-1".to_string()),
            note: None,
        }
    }

    async fn lot_total(conn: &mut Connection, key: &StockKey) -> i64 {
        load_lots(conn, key).await.unwrap().iter().map(|l| l.remaining).sum()
    }

    #[tokio::test]
    async fn test_first_location_becomes_default() {
        let state = state().await;
        let main = location(&state, "main", false).await;
        assert!(main.is_default);
        assert_eq!(main.code, "MAIN");

        let outlet = location(&state, "OUTLET", true).await;
        let mut conn = state.db.acquire().await.unwrap();
        let main = get_location(&mut conn, &main.id).await.unwrap();
        assert!(!main.is_default);
        assert_eq!(default_location(&mut conn).await.unwrap().id, outlet.id);
    }

    #[tokio::test]
    async fn test_location_code_is_unique() {
        let state = state().await;
        location(&state, "MAIN", true).await;
        let err = create_location(
            &state,
            NewLocation {
                name: "Again".to_string(),
                code: "main".to_string(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_switching_default_location() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let outlet = location(&state, "OUTLET", false).await;

        let err = update_location(
            &state,
            &main.id,
            LocationPatch {
                is_default: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        update_location(
            &state,
            &outlet.id,
            LocationPatch {
                is_default: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let defaults = conn
            .count::<Location>(&Filter::new().eq("is_default", true))
            .await
            .unwrap();
        assert_eq!(defaults, 1);
        assert_eq!(default_location(&mut conn).await.unwrap().id, outlet.id);
    }

    #[tokio::test]
    async fn test_location_with_stock_cannot_be_deleted() {
        let state = state().await;
        location(&state, "MAIN", true).await;
        let outlet = location(&state, "OUTLET", false).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &outlet, 2, 100).await;

        let err = delete_location(&state, &outlet.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        adjust(&state, adjustment(&shirt, &outlet, -2), &admin())
            .await
            .unwrap();
        delete_location(&state, &outlet.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_positive_adjustment_creates_lot() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;

        let mut input = adjustment(&shirt, &main, 5);
        input.reason = AdjustmentReason::Return;
        input.unit_cost = Some(bdt(250));
        let adj = adjust(&state, input, &admin()).await.unwrap();
        assert_eq!(adj.quantity_after, 5);
        assert_eq!(adj.created_by.as_deref(), Some("admin@shop.test"));

        let mut conn = state.db.acquire().await.unwrap();
        let lot: StockLot = conn
            .require(adj.lot_id.as_ref().unwrap().as_str())
            .await
            .unwrap();
        assert_eq!(lot.source.kind, LotSourceKind::Return);
        assert_eq!(lot.source.reference, "COUNT-1");
        assert_eq!(lot.unit_cost, bdt(250));
    }

    #[tokio::test]
    async fn test_negative_adjustment_consumes_oldest_lots() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 3, 100).await;
        stock(&state, &shirt, 0, &main, 4, 200).await;

        let adj = adjust(&state, adjustment(&shirt, &main, -5), &admin())
            .await
            .unwrap();
        assert_eq!(adj.quantity_after, 2);
        let taken: Vec<(i64, i64)> = adj
            .allocations
            .iter()
            .map(|a| (a.quantity, a.unit_cost.amount_cents))
            .collect();
        assert_eq!(taken, vec![(3, 100), (2, 200)]);

        let key = adjustment(&shirt, &main, 1).key();
        let mut conn = state.db.acquire().await.unwrap();
        assert_eq!(available_quantity(&mut conn, &key).await.unwrap(), 2);
        assert_eq!(lot_total(&mut conn, &key).await, 2);
    }

    #[tokio::test]
    async fn test_shortfall_changes_nothing() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 3, 100).await;

        let err = adjust(&state, adjustment(&shirt, &main, -4), &admin())
            .await
            .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let key = adjustment(&shirt, &main, 1).key();
        let mut conn = state.db.acquire().await.unwrap();
        assert_eq!(available_quantity(&mut conn, &key).await.unwrap(), 3);
        assert_eq!(lot_total(&mut conn, &key).await, 3);
        let page = list_adjustments(&mut conn, &AdjustmentQuery::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 1);
    }

    #[tokio::test]
    async fn test_restore_returns_units_to_their_lots() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 3, 100).await;
        stock(&state, &shirt, 0, &main, 3, 200).await;
        let key = adjustment(&shirt, &main, 1).key();

        let mut tx = state.db.begin().await.unwrap();
        let plan = consume_fifo(&mut tx, &key, 4).await.unwrap();
        restore_allocations(&mut tx, &key, &plan).await.unwrap();
        tx.commit().await.unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let lots = load_lots(&mut conn, &key).await.unwrap();
        assert!(lots.iter().all(|l| l.remaining == l.quantity));
        assert_eq!(available_quantity(&mut conn, &key).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn test_product_stock_grid() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let outlet = location(&state, "OUTLET", false).await;
        let shirt = product(&state, "Shirt", &["S-1", "S-2"]).await;
        stock(&state, &shirt, 0, &main, 4, 100).await;
        stock(&state, &shirt, 0, &outlet, 1, 100).await;
        stock(&state, &shirt, 1, &outlet, 7, 100).await;

        let mut conn = state.db.acquire().await.unwrap();
        let grid = product_stock(&mut conn, &shirt.id).await.unwrap();
        assert_eq!(grid.variants.len(), 2);
        assert_eq!(grid.variants[0].total, 5);
        assert_eq!(grid.variants[0].locations[0].code, "MAIN");
        assert_eq!(grid.variants[0].locations[0].quantity, 4);
        assert_eq!(grid.variants[1].locations[0].quantity, 0);
        assert_eq!(grid.variants[1].total, 7);

        let page = location_stock(&mut conn, &outlet.id, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.pagination.total, 2);
    }
}
