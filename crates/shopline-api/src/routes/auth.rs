use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::Router;
use shopline_auth::{LoginRequest, RegisterRequest, TokenPair, UserProfile};

use super::AppRouter;
use crate::middleware::Caller;
use crate::response::{created, ok, ApiJson, ApiResult, Created};
use crate::services::account::{self, RefreshRequest, Session};
use crate::state::AppState;

pub fn public() -> AppRouter {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn protected() -> AppRouter {
    Router::new()
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RegisterRequest>,
) -> Created<Session> {
    created(account::register(&state, body).await?)
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<LoginRequest>,
) -> ApiResult<Session> {
    ok(account::login(&state, body).await?)
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<RefreshRequest>,
) -> ApiResult<TokenPair> {
    ok(account::refresh(&state, &body.refresh_token).await?)
}

async fn me(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<UserProfile> {
    let mut conn = state.db.acquire().await?;
    ok(account::me(&mut conn, &user.id).await?)
}

async fn logout(State(state): State<Arc<AppState>>, Caller(user): Caller) -> ApiResult<()> {
    account::logout(&state, &user.id).await?;
    ok(())
}
