//! Per-user carts.
//!
//! Every operation reloads the products in the cart, reprices the lines and
//! recomputes the totals before saving, all inside one transaction.

use serde::{Deserialize, Serialize};
use shopline_commerce::cart::Cart;
use shopline_commerce::catalog::{Product, ProductVariant};
use shopline_commerce::ids::{LineItemId, ProductId, UserId, VariantId};
use shopline_commerce::{CommerceError, Currency};
use shopline_db::{Connection, DocumentStore};
use tracing::{debug, info};

use super::catalog::products_by_id;
use super::inventory::available_at_default;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddItem {
    pub product_id: ProductId,
    /// Defaults to the product's first variant.
    #[serde(default)]
    pub variant_id: Option<VariantId>,
    #[serde(default = "one")]
    pub quantity: i64,
}

fn one() -> i64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetQuantity {
    pub quantity: i64,
}

/// The caller's cart, repriced against the current catalog.
pub async fn get(state: &AppState, user_id: &UserId) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let cart = load_fresh(&mut tx, user_id, state.currency).await?;
    tx.save(&cart).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn add(state: &AppState, user_id: &UserId, input: AddItem) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let cart = add_to_cart(&mut tx, user_id, state.currency, input).await?;
    tx.commit().await?;
    Ok(cart)
}

/// Set a line's quantity. Zero removes the line.
pub async fn set_quantity(
    state: &AppState,
    user_id: &UserId,
    line_id: &LineItemId,
    quantity: i64,
) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let mut cart = load_fresh(&mut tx, user_id, state.currency).await?;

    let line = cart
        .get_item(line_id)
        .ok_or_else(|| CommerceError::ItemNotInCart(line_id.to_string()))?;
    let (product_id, variant_id) = (line.product_id.clone(), line.variant_id.clone());

    if quantity == 0 {
        cart.remove_item(line_id)?;
    } else {
        let product = active_product(&mut tx, &product_id).await?;
        let variant = product.require_variant(&variant_id)?;
        let preorder = stock_mode(&mut tx, &product, variant, quantity).await?;
        cart.set_quantity(line_id, quantity, preorder)?;
    }

    tx.save(&cart).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn remove(state: &AppState, user_id: &UserId, line_id: &LineItemId) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let mut cart = load_fresh(&mut tx, user_id, state.currency).await?;
    cart.remove_item(line_id)?;
    tx.save(&cart).await?;
    tx.commit().await?;
    Ok(cart)
}

pub async fn clear(state: &AppState, user_id: &UserId) -> Result<Cart, AppError> {
    let mut tx = state.db.begin().await?;
    let mut cart = load_cart(&mut tx, user_id, state.currency).await?;
    cart.clear();
    tx.save(&cart).await?;
    tx.commit().await?;
    Ok(cart)
}

/// Add a product to a cart on an open connection.
pub(crate) async fn add_to_cart(
    conn: &mut Connection,
    user_id: &UserId,
    currency: Currency,
    input: AddItem,
) -> Result<Cart, AppError> {
    let mut cart = load_fresh(conn, user_id, currency).await?;
    let product = active_product(conn, &input.product_id).await?;
    let variant = match &input.variant_id {
        Some(variant_id) => product.require_variant(variant_id)?,
        None => product.first_variant().ok_or_else(|| {
            CommerceError::VariantNotFound(format!("{} has no variants", product.id))
        })?,
    };

    let total = cart.quantity_after_add(&variant.id, input.quantity)?;
    let preorder = stock_mode(conn, &product, variant, total).await?;
    let line_id = cart.add_item(&product, variant, input.quantity, preorder)?;
    conn.save(&cart).await?;

    info!(user_id = %user_id, line_id = %line_id, sku = %variant.sku, quantity = input.quantity, preorder, "cart item added");
    Ok(cart)
}

/// Load a cart, or an empty one.
pub(crate) async fn load_cart(
    conn: &mut Connection,
    user_id: &UserId,
    currency: Currency,
) -> Result<Cart, AppError> {
    Ok(conn
        .get::<Cart>(user_id.as_str())
        .await?
        .unwrap_or_else(|| Cart::new(user_id.clone(), currency)))
}

/// Load a cart and reprice it, dropping lines whose product or variant is
/// gone or no longer active.
pub(crate) async fn load_fresh(
    conn: &mut Connection,
    user_id: &UserId,
    currency: Currency,
) -> Result<Cart, AppError> {
    let mut cart = load_cart(conn, user_id, currency).await?;
    let products = products_by_id(conn, &cart.product_ids()).await?;
    let dropped = cart.reprice(&products)?;
    if !dropped.is_empty() {
        debug!(user_id = %user_id, dropped = dropped.len(), "stale cart lines dropped");
    }
    Ok(cart)
}

/// Whether `quantity` units of a variant must be a pre-order.
///
/// In stock at the default location: a normal line. Short but the product
/// takes pre-orders: a pre-order line. Otherwise an inventory error.
pub(crate) async fn stock_mode(
    conn: &mut Connection,
    product: &Product,
    variant: &ProductVariant,
    quantity: i64,
) -> Result<bool, AppError> {
    let available = available_at_default(conn, &product.id, &variant.id).await?;
    if quantity <= available {
        Ok(false)
    } else if product.allow_preorder {
        Ok(true)
    } else {
        Err(CommerceError::InsufficientInventory {
            variant_id: variant.id.to_string(),
            requested: quantity,
            available,
        }
        .into())
    }
}

async fn active_product(conn: &mut Connection, id: &ProductId) -> Result<Product, AppError> {
    match conn.get::<Product>(id.as_str()).await? {
        Some(product) if product.is_available() => Ok(product),
        _ => Err(CommerceError::ProductNotFound(id.to_string()).into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::update_product;
    use crate::services::testing::{location, product, state, stock};
    use shopline_commerce::catalog::{ProductPatch, ProductStatus};

    fn user() -> UserId {
        UserId::generate()
    }

    fn item(product: &Product, variant: usize, quantity: i64) -> AddItem {
        AddItem {
            product_id: product.id.clone(),
            variant_id: Some(product.variants[variant].id.clone()),
            quantity,
        }
    }

    #[tokio::test]
    async fn test_add_merges_same_variant() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 10, 100).await;
        let user = user();

        add(&state, &user, item(&shirt, 0, 2)).await.unwrap();
        let cart = add(&state, &user, item(&shirt, 0, 3)).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
        assert_eq!(cart.total_quantity, 5);
        assert_eq!(cart.subtotal.amount_cents, 500_000);
        assert!(!cart.items[0].preorder);
    }

    #[tokio::test]
    async fn test_out_of_stock_without_preorder_is_rejected() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 1, 100).await;

        let err = add(&state, &user(), item(&shirt, 0, 2)).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_preorder_when_short() {
        let state = state().await;
        location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        update_product(
            &state,
            &shirt.id,
            ProductPatch {
                allow_preorder: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let cart = add(&state, &user(), item(&shirt, 0, 1)).await.unwrap();
        assert!(cart.items[0].preorder);
    }

    #[tokio::test]
    async fn test_set_quantity_and_remove() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1", "S-2"]).await;
        stock(&state, &shirt, 0, &main, 5, 100).await;
        stock(&state, &shirt, 1, &main, 5, 100).await;
        let user = user();

        add(&state, &user, item(&shirt, 0, 1)).await.unwrap();
        let cart = add(&state, &user, item(&shirt, 1, 1)).await.unwrap();
        let first = cart.items[0].id.clone();
        let second = cart.items[1].id.clone();

        let cart = set_quantity(&state, &user, &first, 4).await.unwrap();
        assert_eq!(cart.get_item(&first).unwrap().quantity, 4);

        let err = set_quantity(&state, &user, &first, 6).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::CONFLICT);

        let cart = set_quantity(&state, &user, &first, 0).await.unwrap();
        assert!(cart.get_item(&first).is_none());

        let cart = remove(&state, &user, &second).await.unwrap();
        assert!(cart.is_empty());

        let err = remove(&state, &user, &second).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_reprices_and_drops_inactive() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        let hat = product(&state, "Hat", &["H-1"]).await;
        stock(&state, &shirt, 0, &main, 5, 100).await;
        stock(&state, &hat, 0, &main, 5, 100).await;
        let user = user();
        add(&state, &user, item(&shirt, 0, 2)).await.unwrap();
        add(&state, &user, item(&hat, 0, 1)).await.unwrap();

        let mut variants: Vec<shopline_commerce::catalog::VariantInput> = Vec::new();
        for v in &shirt.variants {
            variants.push(shopline_commerce::catalog::VariantInput {
                id: Some(v.id.clone()),
                sku: v.sku.clone(),
                options: v.options.clone(),
                price: shopline_commerce::Money::new(80_000, state.currency),
                compare_at_price: None,
            });
        }
        update_product(
            &state,
            &shirt.id,
            ProductPatch {
                variants: Some(variants),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        update_product(
            &state,
            &hat.id,
            ProductPatch {
                status: Some(ProductStatus::Draft),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let cart = get(&state, &user).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].unit_price.amount_cents, 80_000);
        assert_eq!(cart.subtotal.amount_cents, 160_000);
    }

    #[tokio::test]
    async fn test_clear() {
        let state = state().await;
        let main = location(&state, "MAIN", true).await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        stock(&state, &shirt, 0, &main, 5, 100).await;
        let user = user();
        add(&state, &user, item(&shirt, 0, 2)).await.unwrap();

        let cart = clear(&state, &user).await.unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal.amount_cents, 0);
    }
}
