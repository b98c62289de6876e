//! Checkout, the caller's orders and their payments.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use shopline_commerce::checkout::{CheckoutRequest, Order};
use shopline_commerce::ids::OrderId;
use shopline_commerce::payment::Payment;

use super::{AppRouter, Paging};
use crate::middleware::Caller;
use crate::response::{created, ok, paged, ApiJson, ApiQuery, ApiResult, Created};
use crate::services::order;
use crate::services::payment::{self, GatewayCallback};
use crate::state::AppState;

/// Gateway callbacks carry no user token.
pub fn public() -> AppRouter {
    Router::new().route("/payments/callback", post(payment_callback))
}

pub fn routes() -> AppRouter {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/checkout", post(checkout))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/cancel", post(cancel_order))
        .route(
            "/orders/{id}/payments",
            post(initiate_payment).get(list_payments),
        )
}

async fn checkout(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<CheckoutRequest>,
) -> Created<Order> {
    created(order::checkout(&state, &user, body).await?)
}

async fn list_orders(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiQuery(paging): ApiQuery<Paging>,
) -> ApiResult<Vec<Order>> {
    let mut conn = state.db.acquire().await?;
    paged(order::list_own(&mut conn, &user.id, paging.request()).await?)
}

async fn get_order(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let id = OrderId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(order::get(&mut conn, &user, &id).await?)
}

async fn cancel_order(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let id = OrderId::parse(&id)?;
    ok(order::cancel(&state, &user, &id).await?)
}

async fn initiate_payment(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> Created<Payment> {
    let id = OrderId::parse(&id)?;
    created(payment::initiate(&state, &user, &id).await?)
}

async fn list_payments(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(id): Path<String>,
) -> ApiResult<Vec<Payment>> {
    let id = OrderId::parse(&id)?;
    let mut conn = state.db.acquire().await?;
    ok(payment::list_for_order(&mut conn, &user, &id).await?)
}

async fn payment_callback(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<GatewayCallback>,
) -> ApiResult<Payment> {
    ok(payment::callback(&state, body).await?)
}
