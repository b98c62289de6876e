//! Bearer-token authentication with transparent access-token renewal.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use shopline_auth::{AuthError, AuthUser, Claims, TokenKind};
use tracing::debug;

use crate::error::AppError;
use crate::services::account;
use crate::state::AppState;

/// Request header carrying a refresh token alongside an expired access token.
pub const REFRESH_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-refresh-token");

/// Response header carrying a renewed access token.
pub const ACCESS_TOKEN_HEADER: HeaderName = HeaderName::from_static("x-access-token");

/// Authenticate the request and put its [`AuthUser`] in the extensions.
///
/// An expired access token is accepted when `x-refresh-token` holds a
/// current refresh token for the same user. The response then carries a
/// fresh access token in `x-access-token`.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (claims, renew) = resolve_claims(&state, request.headers())?;

    let mut conn = state.db.acquire().await?;
    let account = account::account_for_claims(&mut conn, &claims).await?;
    let user = account::principal(&mut conn, &account).await?;
    drop(conn);

    let renewed = if renew {
        debug!(user_id = %account.id, "access token renewed");
        Some(state.tokens.issue(&account, TokenKind::Access)?)
    } else {
        None
    };

    request.extensions_mut().insert(user);
    let mut response = next.run(request).await;

    if let Some(token) = renewed {
        let value = HeaderValue::from_str(&token)
            .map_err(|e| AppError::Internal(format!("invalid token header: {}", e)))?;
        response.headers_mut().insert(ACCESS_TOKEN_HEADER, value);
    }
    Ok(response)
}

/// Claims to authenticate with, and whether the access token needs renewing.
fn resolve_claims(state: &AppState, headers: &HeaderMap) -> Result<(Claims, bool), AuthError> {
    let access = bearer_token(headers).ok_or(AuthError::MissingCredentials)?;
    match state.tokens.verify(access, TokenKind::Access) {
        Ok(claims) => Ok((claims, false)),
        Err(AuthError::TokenExpired) => {
            let refresh = headers
                .get(&REFRESH_TOKEN_HEADER)
                .and_then(|v| v.to_str().ok())
                .ok_or(AuthError::TokenExpired)?;
            let expired = state
                .tokens
                .verify_ignoring_expiry(access, TokenKind::Access)?;
            let claims = state.tokens.verify(refresh, TokenKind::Refresh)?;
            if claims.sub != expired.sub {
                return Err(AuthError::InvalidToken);
            }
            Ok((claims, true))
        }
        Err(e) => Err(e),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// The authenticated caller, as placed by [`authenticate`].
#[derive(Debug, Clone)]
pub struct Caller(pub AuthUser);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(Caller)
            .ok_or_else(|| AuthError::MissingCredentials.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn test_bearer_token() {
        assert_eq!(
            bearer_token(&headers(&[("authorization", "Bearer abc.def")])),
            Some("abc.def")
        );
        assert_eq!(bearer_token(&headers(&[("authorization", "Basic xyz")])), None);
        assert_eq!(bearer_token(&headers(&[("authorization", "Bearer ")])), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }
}
