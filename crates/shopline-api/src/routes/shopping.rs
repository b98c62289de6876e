//! Cart and wishlist of the calling user.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Router;
use shopline_commerce::cart::Cart;
use shopline_commerce::ids::{LineItemId, ProductId};

use super::AppRouter;
use crate::middleware::Caller;
use crate::response::{ok, ApiJson, ApiResult};
use crate::services::cart::{self, AddItem, SetQuantity};
use crate::services::wishlist::{self, WishlistView};
use crate::state::AppState;

pub fn routes() -> AppRouter {
    Router::new()
        .route("/cart", get(get_cart).delete(clear_cart))
        .route("/cart/items", post(add_item))
        .route("/cart/items/{line_id}", patch(set_quantity).delete(remove_item))
        .route("/wishlist", get(get_wishlist))
        .route(
            "/wishlist/{product_id}",
            post(add_to_wishlist).delete(remove_from_wishlist),
        )
        .route("/wishlist/{product_id}/move-to-cart", post(move_to_cart))
}

async fn get_cart(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Cart> {
    ok(cart::get(&state, &user.id).await?)
}

async fn clear_cart(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<Cart> {
    ok(cart::clear(&state, &user.id).await?)
}

async fn add_item(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    ApiJson(body): ApiJson<AddItem>,
) -> ApiResult<Cart> {
    ok(cart::add(&state, &user.id, body).await?)
}

async fn set_quantity(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(line_id): Path<String>,
    ApiJson(body): ApiJson<SetQuantity>,
) -> ApiResult<Cart> {
    let line_id = LineItemId::parse(&line_id)?;
    ok(cart::set_quantity(&state, &user.id, &line_id, body.quantity).await?)
}

async fn remove_item(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(line_id): Path<String>,
) -> ApiResult<Cart> {
    let line_id = LineItemId::parse(&line_id)?;
    ok(cart::remove(&state, &user.id, &line_id).await?)
}

async fn get_wishlist(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
) -> ApiResult<WishlistView> {
    let mut conn = state.db.acquire().await?;
    ok(wishlist::get(&mut conn, &user.id).await?)
}

async fn add_to_wishlist(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(product_id): Path<String>,
) -> ApiResult<WishlistView> {
    let product_id = ProductId::parse(&product_id)?;
    ok(wishlist::add(&state, &user.id, &product_id).await?)
}

async fn remove_from_wishlist(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(product_id): Path<String>,
) -> ApiResult<WishlistView> {
    let product_id = ProductId::parse(&product_id)?;
    ok(wishlist::remove(&state, &user.id, &product_id).await?)
}

async fn move_to_cart(
    State(state): State<Arc<AppState>>,
    Caller(user): Caller,
    Path(product_id): Path<String>,
) -> ApiResult<Cart> {
    let product_id = ProductId::parse(&product_id)?;
    ok(wishlist::move_to_cart(&state, &user.id, &product_id).await?)
}
