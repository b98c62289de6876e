//! HTTP API for the Shopline store.
//!
//! [`router`] builds the full axum application from an [`AppState`]. The
//! `shopline` binary wraps it with configuration, logging and startup
//! seeding.

pub mod config;
pub mod error;
pub mod gateway;
pub mod middleware;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use std::sync::Arc;

use axum::http::Method;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use error::AppError;
pub use state::AppState;

/// The application with request tracing and CORS applied.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers(Any)
        .expose_headers([middleware::ACCESS_TOKEN_HEADER]);

    routes::routes(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
