//! Checkout, order lifecycle and cancellation.

use serde::{Deserialize, Serialize};
use shopline_auth::{AuthUser, Permission};
use shopline_commerce::checkout::{
    CheckoutRequest, FinancialStatus, NewOrder, Order, OrderLine, OrderStatus,
};
use shopline_commerce::ids::{OrderId, UserId};
use shopline_commerce::inventory::StockKey;
use shopline_commerce::payment::{Payment, PaymentStatus};
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore, Filter, Page, PageRequest, Query, Sort};
use tracing::{info, warn};

use super::cart::load_fresh;
use super::catalog::products_by_id;
use super::inventory::{available_quantity, consume_fifo, default_location, restore_allocations};
use super::load;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderQuery {
    pub status: Option<OrderStatus>,
    pub user_id: Option<UserId>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

/// Turn the caller's cart into an order.
///
/// Lines in stock are allocated FIFO from the default location. A line
/// whose stock ran out since it was added becomes a pre-order when the
/// product allows it. The cart is emptied on success.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    request: CheckoutRequest,
) -> Result<Order, AppError> {
    let mut tx = state.db.begin().await?;
    let mut cart = load_fresh(&mut tx, &user.id, state.currency).await?;
    if cart.is_empty() {
        return Err(CommerceError::ValidationError("the cart is empty".to_string()).into());
    }

    let location = default_location(&mut tx).await?;
    let products = products_by_id(&mut tx, &cart.product_ids()).await?;

    let mut lines = Vec::with_capacity(cart.items.len());
    for item in &cart.items {
        let product = products
            .get(&item.product_id)
            .ok_or_else(|| CommerceError::ProductNotFound(item.product_id.to_string()))?;
        product.require_variant(&item.variant_id)?;

        let mut line = OrderLine::from_cart_item(item);
        if !line.preorder {
            let key = StockKey::new(
                item.product_id.clone(),
                item.variant_id.clone(),
                location.id.clone(),
            );
            let available = available_quantity(&mut tx, &key).await?;
            if available >= line.quantity {
                line.allocations = consume_fifo(&mut tx, &key, line.quantity).await?;
            } else if product.allow_preorder {
                line.preorder = true;
            } else {
                return Err(CommerceError::InsufficientInventory {
                    variant_id: item.variant_id.to_string(),
                    requested: line.quantity,
                    available,
                }
                .into());
            }
        }
        lines.push(line);
    }

    let order = Order::place(
        NewOrder {
            user_id: user.id.clone(),
            email: user.email.clone(),
            lines,
            shipping_address: request.shipping_address,
            payment_method: request.payment_method,
            fulfillment_location: location.id,
            note: request.note,
        },
        &state.shipping,
    )?;
    tx.insert(&order).await?;

    cart.clear();
    tx.save(&cart).await?;
    tx.commit().await?;

    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        user_id = %order.user_id,
        grand_total = %order.grand_total,
        preorder = order.has_preorder_lines(),
        "order placed"
    );
    Ok(order)
}

/// Load an order the caller may see: their own, or any with `order:manage`.
pub async fn get(conn: &mut Connection, caller: &AuthUser, id: &OrderId) -> Result<Order, AppError> {
    let order: Order = load(conn, id.as_str(), CommerceError::OrderNotFound).await?;
    ensure_access(caller, &order)?;
    Ok(order)
}

pub async fn list_own(
    conn: &mut Connection,
    user_id: &UserId,
    request: PageRequest,
) -> Result<Page<Order>, AppError> {
    let filter = Filter::new().eq("user_id", user_id);
    Ok(conn.page(&filter, &Sort::Newest, request).await?)
}

pub async fn list_all(conn: &mut Connection, query: &OrderQuery) -> Result<Page<Order>, AppError> {
    let filter = Filter::new()
        .eq_opt("status", query.status.map(|s| s.as_str()))
        .eq_opt("user_id", query.user_id.as_ref());
    let request = PageRequest::from_params(query.page, query.limit);
    Ok(conn.page(&filter, &Sort::Newest, request).await?)
}

/// Move an order along its status machine.
pub async fn update_status(
    state: &AppState,
    caller: &AuthUser,
    id: &OrderId,
    to: OrderStatus,
) -> Result<Order, AppError> {
    if to == OrderStatus::Cancelled {
        return cancel(state, caller, id).await;
    }

    let mut tx = state.db.begin().await?;
    let mut order: Order = load(&mut tx, id.as_str(), CommerceError::OrderNotFound).await?;
    let from = order.status;
    order.transition(to)?;
    tx.update(&order).await?;
    tx.commit().await?;

    info!(order_id = %order.id, from = from.as_str(), to = to.as_str(), "order status changed");
    Ok(order)
}

/// Cancel an order and put its allocated units back.
///
/// Owners may cancel while the order is pending. `order:manage` may cancel
/// any cancellable order. Paid payments are marked refunded.
pub async fn cancel(state: &AppState, caller: &AuthUser, id: &OrderId) -> Result<Order, AppError> {
    let mut tx = state.db.begin().await?;
    let mut order: Order = load(&mut tx, id.as_str(), CommerceError::OrderNotFound).await?;
    ensure_access(caller, &order)?;
    if !caller.has(Permission::OrderManage) && order.status != OrderStatus::Pending {
        return Err(CommerceError::NotAllowed(format!(
            "order {} is already {}",
            order.order_number,
            order.status.as_str()
        ))
        .into());
    }

    order.cancel()?;

    for line in &order.lines {
        let key = StockKey::new(
            line.product_id.clone(),
            line.variant_id.clone(),
            order.fulfillment_location.clone(),
        );
        restore_allocations(&mut tx, &key, &line.allocations).await?;
    }

    if order.financial_status == FinancialStatus::Refunded {
        let payments: Vec<Payment> = tx
            .find(&Query::filter(
                Filter::new()
                    .eq("order_id", &order.id)
                    .eq("status", PaymentStatus::Paid.as_str()),
            ))
            .await?;
        for mut payment in payments {
            payment.refund();
            tx.update(&payment).await?;
            warn!(payment_id = %payment.id, amount = %payment.amount, "payment needs a refund");
        }
    }

    tx.update(&order).await?;
    tx.commit().await?;

    info!(order_id = %order.id, by = %caller.email, "order cancelled");
    Ok(order)
}

pub(crate) fn ensure_access(caller: &AuthUser, order: &Order) -> Result<(), AppError> {
    if order.user_id == caller.id || caller.has(Permission::OrderManage) {
        Ok(())
    } else {
        Err(AppError::Forbidden("You cannot access this order".to_string()))
    }
}
