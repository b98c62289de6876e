//! HTTP routes.
//!
//! Public routes need no token. Everything else goes through
//! [`authenticate`](crate::middleware::authenticate); admin routes then
//! check one permission of the caller's role in the handler.

mod admin;
mod auth;
mod catalog;
mod inventory;
mod orders;
mod shopping;

use std::sync::Arc;

use axum::middleware::from_fn_with_state;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use shopline_db::PageRequest;

use crate::middleware::authenticate;
use crate::state::AppState;

/// Router state.
pub type AppRouter = Router<Arc<AppState>>;

/// `?page=&limit=`.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Paging {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl Paging {
    pub fn request(self) -> PageRequest {
        PageRequest::from_params(self.page, self.limit)
    }
}

/// Every route, with state applied.
pub fn routes(state: Arc<AppState>) -> Router {
    let public = Router::new()
        .merge(auth::public())
        .merge(catalog::public())
        .merge(orders::public());

    let protected = Router::new()
        .merge(auth::protected())
        .merge(shopping::routes())
        .merge(orders::routes())
        .nest("/admin", admin::routes())
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/health", get(health))
        .nest("/api", public.merge(protected))
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
