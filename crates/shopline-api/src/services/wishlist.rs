//! Per-user wishlists.

use serde::Serialize;
use shopline_commerce::cart::Cart;
use shopline_commerce::catalog::{Product, ProductSummary};
use shopline_commerce::ids::{ProductId, UserId};
use shopline_commerce::wishlist::Wishlist;
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore};
use tracing::info;

use super::cart::{add_to_cart, AddItem};
use super::catalog::active_summaries;
use super::load;
use crate::error::AppError;
use crate::state::AppState;

/// Wishlist as returned to its owner.
#[derive(Debug, Clone, Serialize)]
pub struct WishlistView {
    pub product_ids: Vec<ProductId>,
    /// Active products only, in insertion order.
    pub products: Vec<ProductSummary>,
}

pub async fn get(conn: &mut Connection, user_id: &UserId) -> Result<WishlistView, AppError> {
    let wishlist = load_wishlist(conn, user_id).await?;
    view(conn, wishlist).await
}

/// Save a product. Saving it twice is a no-op.
pub async fn add(
    state: &AppState,
    user_id: &UserId,
    product_id: &ProductId,
) -> Result<WishlistView, AppError> {
    let mut tx = state.db.begin().await?;
    load::<Product>(&mut tx, product_id.as_str(), CommerceError::ProductNotFound).await?;
    let mut wishlist = load_wishlist(&mut tx, user_id).await?;
    if wishlist.add(product_id.clone()) {
        tx.save(&wishlist).await?;
    }
    let view = view(&mut tx, wishlist).await?;
    tx.commit().await?;
    Ok(view)
}

pub async fn remove(
    state: &AppState,
    user_id: &UserId,
    product_id: &ProductId,
) -> Result<WishlistView, AppError> {
    let mut tx = state.db.begin().await?;
    let mut wishlist = load_wishlist(&mut tx, user_id).await?;
    if wishlist.remove(product_id) {
        tx.save(&wishlist).await?;
    }
    let view = view(&mut tx, wishlist).await?;
    tx.commit().await?;
    Ok(view)
}

/// Put one unit of the product's first variant in the cart and drop the
/// product from the wishlist.
pub async fn move_to_cart(
    state: &AppState,
    user_id: &UserId,
    product_id: &ProductId,
) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let mut wishlist = load_wishlist(&mut tx, user_id).await?;
    if !wishlist.remove(product_id) {
        return Err(AppError::NotFound(format!(
            "Product {} is not in the wishlist",
            product_id
        )));
    }

    let cart = add_to_cart(
        &mut tx,
        user_id,
        state.currency,
        AddItem {
            product_id: product_id.clone(),
            variant_id: None,
            quantity: 1,
        },
    )
    .await?;
    tx.save(&wishlist).await?;
    tx.commit().await?;

    info!(user_id = %user_id, product_id = %product_id, "wishlist item moved to cart");
    Ok(cart)
}

async fn load_wishlist(conn: &mut Connection, user_id: &UserId) -> Result<Wishlist, AppError> {
    Ok(conn
        .get::<Wishlist>(user_id.as_str())
        .await?
        .unwrap_or_else(|| Wishlist::new(user_id.clone())))
}

async fn view(conn: &mut Connection, wishlist: Wishlist) -> Result<WishlistView, AppError> {
    let products = active_summaries(conn, &wishlist.product_ids).await?;
    Ok(WishlistView {
        product_ids: wishlist.product_ids,
        products,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::update_product;
    use crate::services::testing::{location, product, state, stock};
    use shopline_commerce::catalog::{ProductPatch, ProductStatus};

    #[tokio::test]
    async fn test_add_is_idempotent_and_ordered() {
        let state = state().await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        let hat = product(&state, "Hat", &["H-1"]).await;
        let user = UserId::generate();

        add(&state, &user, &hat.id).await.unwrap();
        add(&state, &user, &shirt.id).await.unwrap();
        let view = add(&state, &user, &hat.id).await.unwrap();
        assert_eq!(view.product_ids, vec![hat.id.clone(), shirt.id.clone()]);
        assert_eq!(view.products[0].name, "Hat");
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let state = state().await;
        let err = add(&state, &UserId::generate(), &ProductId::generate())
            .await
            .unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inactive_products_hidden() {
        let state = state().await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        let user = UserId::generate();
        add(&state, &user, &shirt.id).await.unwrap();
        update_product(
            &state,
            &shirt.id,
            ProductPatch {
                status: Some(ProductStatus::Archived),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let view = get(&mut conn, &user).await.unwrap();
        assert_eq!(view.product_ids.len(), 1);
        assert!(view.products.is_empty());
    }

    #[tokio::test]
    async fn test_move_to_cart() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1", "S-2"]).await;
        stock(&state, &shirt, 0, &main, 3, 100).await;
        let user = UserId::generate();
        add(&state, &user, &shirt.id).await.unwrap();

        let cart = move_to_cart(&state, &user, &shirt.id).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].variant_id, shirt.variants[0].id);
        assert_eq!(cart.items[0].quantity, 1);

        let mut conn = state.db.acquire().await.unwrap();
        assert!(get(&mut conn, &user).await.unwrap().product_ids.is_empty());
        drop(conn);

        let err = move_to_cart(&state, &user, &shirt.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_move_to_cart_out_of_stock_keeps_wishlist() {
        let state = state().await;
        location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        let user = UserId::generate();
        add(&state, &user, &shirt.id).await.unwrap();

        let err = move_to_cart(&state, &user, &shirt.id).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let mut conn = state.db.acquire().await.unwrap();
        assert_eq!(get(&mut conn, &user).await.unwrap().product_ids, vec![shirt.id]);
    }
}
