//! Banners and featured products on the storefront document.

use serde::Serialize;
use shopline_commerce::catalog::{Product, ProductSummary};
use shopline_commerce::ids::{BannerId, ProductId};
use shopline_commerce::storefront::{Banner, BannerPatch, NewBanner, Storefront, STOREFRONT_ID};
use shopline_commerce::CommerceError;
use shopline_db::{Connection, DocumentStore};
use tracing::info;

use super::catalog::active_summaries;
use super::load;
use crate::error::AppError;
use crate::state::AppState;

/// What shoppers see.
#[derive(Debug, Clone, Serialize)]
pub struct StorefrontView {
    pub banners: Vec<Banner>,
    pub featured_products: Vec<ProductSummary>,
}

/// Active banners by position, and featured products that are still active.
pub async fn get(conn: &mut Connection) -> Result<StorefrontView, AppError> {
    let storefront = load_storefront(conn).await?;
    let featured_products = active_summaries(conn, &storefront.featured_products).await?;
    Ok(StorefrontView {
        banners: storefront.active_banners().into_iter().cloned().collect(),
        featured_products,
    })
}

pub async fn push_banner(state: &AppState, input: NewBanner) -> Result<Banner, AppError> {
    let mut tx = state.db.begin().await?;
    let mut storefront = load_storefront(&mut tx).await?;
    let banner = storefront.push_banner(input)?.clone();
    tx.save(&storefront).await?;
    tx.commit().await?;

    info!(banner_id = %banner.id, "banner added");
    Ok(banner)
}

pub async fn update_banner(
    state: &AppState,
    id: &BannerId,
    patch: BannerPatch,
) -> Result<Banner, AppError> {
    let mut tx = state.db.begin().await?;
    let mut storefront = load_storefront(&mut tx).await?;
    let banner = storefront.update_banner(id, patch)?.clone();
    tx.save(&storefront).await?;
    tx.commit().await?;
    Ok(banner)
}

pub async fn pull_banner(state: &AppState, id: &BannerId) -> Result<(), AppError> {
    let mut tx = state.db.begin().await?;
    let mut storefront = load_storefront(&mut tx).await?;
    storefront.pull_banner(id)?;
    tx.save(&storefront).await?;
    tx.commit().await?;

    info!(banner_id = %id, "banner removed");
    Ok(())
}

/// Feature a product. Featuring it again is a no-op.
pub async fn push_featured(
    state: &AppState,
    product_id: &ProductId,
) -> Result<Vec<ProductId>, AppError> {
    let mut tx = state.db.begin().await?;
    load::<Product>(&mut tx, product_id.as_str(), CommerceError::ProductNotFound).await?;
    let mut storefront = load_storefront(&mut tx).await?;
    if storefront.push_featured(product_id.clone()) {
        tx.save(&storefront).await?;
    }
    tx.commit().await?;
    Ok(storefront.featured_products)
}

pub async fn pull_featured(
    state: &AppState,
    product_id: &ProductId,
) -> Result<Vec<ProductId>, AppError> {
    let mut tx = state.db.begin().await?;
    let mut storefront = load_storefront(&mut tx).await?;
    if storefront.pull_featured(product_id) {
        tx.save(&storefront).await?;
    }
    tx.commit().await?;
    Ok(storefront.featured_products)
}

async fn load_storefront(conn: &mut Connection) -> Result<Storefront, AppError> {
    Ok(conn
        .get::<Storefront>(STOREFRONT_ID)
        .await?
        .unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::catalog::update_product;
    use crate::services::testing::{product, state};
    use shopline_commerce::catalog::{ProductPatch, ProductStatus};

    fn banner(title: &str, position: Option<i32>) -> NewBanner {
        NewBanner {
            title: title.to_string(),
            image_url: format!("https://cdn.test/{}.jpg", title),
            position,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_banners_sorted_and_filtered() {
        let state = state().await;
        push_banner(&state, banner("Eid", Some(2))).await.unwrap();
        let hidden = push_banner(&state, banner("Winter", Some(0))).await.unwrap();
        push_banner(&state, banner("Sale", Some(1))).await.unwrap();
        update_banner(
            &state,
            &hidden.id,
            BannerPatch {
                active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let mut conn = state.db.acquire().await.unwrap();
        let view = get(&mut conn).await.unwrap();
        let titles: Vec<&str> = view.banners.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Sale", "Eid"]);
    }

    #[tokio::test]
    async fn test_pull_missing_banner() {
        let state = state().await;
        let err = pull_banner(&state, &BannerId::generate()).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_featured_products() {
        let state = state().await;
        let shirt = product(&state, "Shirt", &["S-1"]).await;
        let hat = product(&state, "Hat", &["H-1"]).await;

        push_featured(&state, &hat.id).await.unwrap();
        push_featured(&state, &shirt.id).await.unwrap();
        let ids = push_featured(&state, &hat.id).await.unwrap();
        assert_eq!(ids, vec![hat.id.clone(), shirt.id.clone()]);

        let err = push_featured(&state, &ProductId::generate()).await.unwrap_err();
        assert_eq!(err.status(), http::StatusCode::NOT_FOUND);

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
        {
            let mut conn = state.db.acquire().await.unwrap();
            let view = get(&mut conn).await.unwrap();
            assert_eq!(view.featured_products.len(), 1);
            assert_eq!(view.featured_products[0].id, shirt.id);
        }

        let ids = pull_featured(&state, &shirt.id).await.unwrap();
        assert_eq!(ids, vec![hat.id]);
    }
}
