//! Payments: gateway sessions, callbacks and cash collection.

use serde::{Deserialize, Serialize};
use shopline_auth::AuthUser;
use shopline_commerce::checkout::{Order, OrderStatus};
use shopline_commerce::ids::{OrderId, PaymentId};
use shopline_commerce::payment::{GatewayVerdict, Payment, PaymentMethod, PaymentStatus};
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore, Filter, Query, Sort};
use tracing::{info, warn};

use super::load;
use super::order::ensure_access;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayCallback {
    pub transaction_id: String,
}

/// Start paying for an order.
///
/// Cash on delivery records a pending payment. Online orders open a
/// gateway session whose redirect URL the shopper follows. A pending
/// payment already open for the order is returned as is.
pub async fn initiate(
    state: &AppState,
    caller: &AuthUser,
    order_id: &OrderId,
) -> Result<Payment, AppError> {
    let mut tx = state.db.begin().await?;
    let order: Order = load(&mut tx, order_id.as_str(), CommerceError::OrderNotFound).await?;
    if order.user_id != caller.id {
        return Err(AppError::Forbidden("You cannot pay for this order".to_string()));
    }

    let mut payment = Payment::for_order(&order)?;
    let open = tx
        .find_one::<Payment>(
            &Filter::new()
                .eq("order_id", &order.id)
                .eq("status", PaymentStatus::Pending.as_str()),
        )
        .await?;
    if let Some(open) = open {
        return Ok(open);
    }

    if payment.method == PaymentMethod::Online {
        let session = state.gateway.initiate(&payment).await?;
        payment.attach_session(session);
    }
    tx.insert(&payment).await?;
    tx.commit().await?;

    info!(
        payment_id = %payment.id,
        order_id = %order.id,
        method = payment.method.as_str(),
        amount = %payment.amount,
        "payment initiated"
    );
    Ok(payment)
}

/// Settle a payment from a gateway callback. Repeated callbacks change
/// nothing.
pub async fn callback(state: &AppState, input: GatewayCallback) -> Result<Payment, AppError> {
    let mut tx = state.db.begin().await?;
    let mut payment = tx
        .find_one::<Payment>(&Filter::new().eq("transaction_id", &input.transaction_id))
        .await?
        .ok_or_else(|| CommerceError::PaymentNotFound(input.transaction_id.clone()))?;

    let verdict = state.gateway.verify(&input.transaction_id).await?;
    if !payment.settle(verdict) {
        return Ok(payment);
    }

    if verdict == GatewayVerdict::Paid {
        record_paid(&mut tx, &mut payment).await?;
    } else {
        warn!(payment_id = %payment.id, transaction_id = %input.transaction_id, "payment failed");
    }
    tx.update(&payment).await?;
    tx.commit().await?;

    info!(payment_id = %payment.id, status = payment.status.as_str(), "payment settled");
    Ok(payment)
}

/// Record cash collected for a COD payment.
pub async fn collect(state: &AppState, id: &PaymentId) -> Result<Payment, AppError> {
    let mut tx = state.db.begin().await?;
    let mut payment: Payment = load(&mut tx, id.as_str(), CommerceError::PaymentNotFound).await?;
    payment.collect_cash()?;
    record_paid(&mut tx, &mut payment).await?;
    tx.update(&payment).await?;
    tx.commit().await?;

    info!(payment_id = %payment.id, amount = %payment.amount, "cash collected");
    Ok(payment)
}

pub async fn list_for_order(
    conn: &mut Connection,
    caller: &AuthUser,
    order_id: &OrderId,
) -> Result<Vec<Payment>, AppError> {
    let order: Order = load(conn, order_id.as_str(), CommerceError::OrderNotFound).await?;
    ensure_access(caller, &order)?;
    Ok(conn
        .find(&Query::filter(Filter::new().eq("order_id", order_id)).sort(Sort::Oldest))
        .await?)
}

/// Mark the payment's order paid. Money arriving for a cancelled order is
/// flagged for refund instead.
async fn record_paid(conn: &mut Connection, payment: &mut Payment) -> Result<(), AppError> {
    let mut order: Order =
        load(conn, payment.order_id.as_str(), CommerceError::OrderNotFound).await?;
    if order.status == OrderStatus::Cancelled {
        payment.refund();
        warn!(payment_id = %payment.id, order_id = %order.id, "payment received for a cancelled order");
        return Ok(());
    }
    order.mark_paid();
    conn.update(&order).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::SandboxGateway;
    use crate::services::cart::{self, AddItem};
    use crate::services::order::{self, checkout};
    use crate::services::testing::{admin, customer, location, product, state, stock};
    use shopline_commerce::checkout::{Address, CheckoutRequest, FinancialStatus};

    async fn place(state: &AppState, buyer: &AuthUser, method: PaymentMethod) -> Order {
        let main = location(state, "MAIN", true).await;
        let shirt = product(state, "Shirt", &["S-1"]).await;
        stock(state, &shirt, 0, &main, 5, 100).await;
        cart::add(
            state,
            &buyer.id,
            AddItem {
                product_id: shirt.id.clone(),
                variant_id: None,
                quantity: 1,
            },
        )
        .await
        .unwrap();
        checkout(
            state,
            buyer,
            CheckoutRequest {
                shipping_address: Address {
                    name: "Buyer".to_string(),
                    phone: "01700000000".to_string(),
                    line1: "Road 1".to_string(),
                    city: "Chittagong".to_string(),
                    country: "Bangladesh".to_string(),
                    ..Default::default()
                },
                payment_method: method,
                note: None,
            },
        )
        .await
        .unwrap()
    }

    async fn order_of(state: &AppState, id: &OrderId) -> Order {
        let mut conn = state.db.acquire().await.unwrap();
        order::get(&mut conn, &admin(), id).await.unwrap()
    }

    #[tokio::test]
    async fn test_online_payment_flow() {
        let state = state().await;
        let buyer = customer();
        let order = place(&state, &buyer, PaymentMethod::Online).await;

        let payment = initiate(&state, &buyer, &order.id).await.unwrap();
        let transaction_id = payment.transaction_id.clone().unwrap();
        assert!(payment.redirect_url.as_deref().unwrap().ends_with(&transaction_id));
        assert_eq!(payment.amount, order.grand_total);

        let again = initiate(&state, &buyer, &order.id).await.unwrap();
        assert_eq!(again.id, payment.id);

        let settled = callback(
            &state,
            GatewayCallback {
                transaction_id: transaction_id.clone(),
            },
        )
        .await
        .unwrap();
        assert_eq!(settled.status, PaymentStatus::Paid);

        let paid = order_of(&state, &order.id).await;
        assert_eq!(paid.financial_status, FinancialStatus::Paid);
        assert_eq!(paid.status, OrderStatus::Confirmed);

        let repeat = callback(&state, GatewayCallback { transaction_id })
            .await
            .unwrap();
        assert_eq!(repeat.status, PaymentStatus::Paid);
        assert_eq!(repeat.updated_at, settled.updated_at);

        let err = initiate(&state, &buyer, &order.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_failed_payment() {
        let db = shopline_db::Db::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let gateway = std::sync::Arc::new(SandboxGateway::new("https://pay.test"));
        let mut config = crate::config::Config::default();
        config.auth.jwt_secret = "test-secret".to_string();
        let state = AppState::with_gateway(config, db, gateway.clone()).unwrap();

        let buyer = customer();
        let order = place(&state, &buyer, PaymentMethod::Online).await;
        let payment = initiate(&state, &buyer, &order.id).await.unwrap();
        let transaction_id = payment.transaction_id.unwrap();
        gateway.set_verdict(&transaction_id, GatewayVerdict::Failed);

        let failed = callback(&state, GatewayCallback { transaction_id })
            .await
            .unwrap();
        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(
            order_of(&state, &order.id).await.financial_status,
            FinancialStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_transaction() {
        let state = state().await;
        let err = callback(
            &state,
            GatewayCallback {
                transaction_id: "sbx_missing".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cod_collection() {
        let state = state().await;
        let buyer = customer();
        let order = place(&state, &buyer, PaymentMethod::Cod).await;

        let payment = initiate(&state, &buyer, &order.id).await.unwrap();
        assert!(payment.transaction_id.is_none());
        assert_eq!(payment.status, PaymentStatus::Pending);

        let err = initiate(&state, &customer(), &order.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::FORBIDDEN);

        let collected = collect(&state, &payment.id).await.unwrap();
        assert_eq!(collected.status, PaymentStatus::Paid);
        assert!(order_of(&state, &order.id).await.is_paid());

        let err = collect(&state, &payment.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let mut conn = state.db.acquire().await.unwrap();
        let payments = list_for_order(&mut conn, &buyer, &order.id).await.unwrap();
        assert_eq!(payments.len(), 1);
    }

    #[tokio::test]
    async fn test_cancel_paid_order_refunds() {
        let state = state().await;
        let buyer = customer();
        let order = place(&state, &buyer, PaymentMethod::Cod).await;
        let payment = initiate(&state, &buyer, &order.id).await.unwrap();
        collect(&state, &payment.id).await.unwrap();

        let cancelled = order::cancel(&state, &admin(), &order.id).await.unwrap();
        assert_eq!(cancelled.financial_status, FinancialStatus::Refunded);

        let mut conn = state.db.acquire().await.unwrap();
        let payments = list_for_order(&mut conn, &admin(), &order.id).await.unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Refunded);
    }
}
