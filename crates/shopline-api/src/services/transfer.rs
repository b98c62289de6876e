//! Stock transfers between locations.

use serde::Deserialize;
use shopline_auth::AuthUser;
use shopline_commerce::catalog::Product;
use shopline_commerce::ids::{LocationId, TransferId};
use shopline_commerce::inventory::{Location, LotSource, LotSourceKind, StockKey, StockLot};
use shopline_commerce::transfer::{NewTransfer, Transfer, TransferLine};
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore, Filter, Page, PageRequest, Sort};
use tracing::info;

use super::inventory::{consume_fifo, receive_lot};
use super::load;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferQuery {
    /// Matches either the source or the destination.
    pub location_id: Option<LocationId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Move stock between two locations.
///
/// Units leave the source lots FIFO and arrive as one lot per consumed
/// source lot, at the same unit cost and with the same receive time. A shortfall on any line aborts the
/// whole transfer.
pub async fn create(
    state: &AppState,
    input: NewTransfer,
    user: &AuthUser,
) -> Result<Transfer, AppError> {
    let lines = input.normalized_lines()?;

    let mut tx = state.db.begin().await?;
    let from = active_location(&mut tx, &input.from_location).await?;
    let to = active_location(&mut tx, &input.to_location).await?;

    let mut transfer = Transfer::begin(&input, user.email.clone(), state.currency);
    for line in lines {
        let product: Product = load(&mut tx, line.product_id.as_str(), CommerceError::ProductNotFound).await?;
        product.require_variant(&line.variant_id)?;

        let source_key = StockKey::new(
            line.product_id.clone(),
            line.variant_id.clone(),
            from.id.clone(),
        );
        let allocations = consume_fifo(&mut tx, &source_key, line.quantity).await?;

        let destination_key = source_key.at(to.id.clone());
        for allocation in &allocations {
            let source = LotSource::new(LotSourceKind::Transfer, transfer.number.clone());
            let lot = StockLot::transferred(&destination_key, allocation, source)?;
            receive_lot(&mut tx, lot).await?;
        }

        transfer.push_line(TransferLine::new(line, allocations, state.currency)?)?;
    }

    tx.insert(&transfer).await?;
    tx.commit().await?;

    info!(
        transfer_id = %transfer.id,
        number = %transfer.number,
        from = %from.code,
        to = %to.code,
        units = transfer.total_quantity(),
        "transfer completed"
    );
    Ok(transfer)
}

pub async fn get(conn: &mut Connection, id: &TransferId) -> Result<Transfer, AppError> {
    load(conn, id.as_str(), CommerceError::TransferNotFound).await
}

pub async fn list(conn: &mut Connection, query: &TransferQuery) -> Result<Page<Transfer>, AppError> {
    let filter = match &query.location_id {
        Some(location_id) => Filter::new().any_eq(["from_location", "to_location"], location_id),
        None => Filter::new(),
    };
    let request = PageRequest::from_params(query.page, query.limit);
    Ok(conn.page(&filter, &Sort::Newest, request).await?)
}

async fn active_location(conn: &mut Connection, id: &LocationId) -> Result<Location, AppError> {
    let location: Location = load(conn, id.as_str(), CommerceError::LocationNotFound).await?;
    if !location.active {
        return Err(CommerceError::NotAllowed(format!("location {} is inactive", location.code)).into());
    }
    Ok(location)
}
