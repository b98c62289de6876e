//! API error type and its HTTP mapping.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use shopline_auth::AuthError;
use shopline_commerce::CommerceError;
use shopline_db::DbError;
use thiserror::Error;
use tracing::error;

use crate::gateway::GatewayError;

/// Error returned by handlers and services.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Commerce(#[from] CommerceError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Commerce(e) => commerce_status(e),
            AppError::Auth(e) => auth_status(e),
            AppError::Db(e) => db_status(e),
            AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn commerce_status(e: &CommerceError) -> StatusCode {
    if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if e.is_conflict() {
        StatusCode::CONFLICT
    } else if e.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if let CommerceError::Database(db) = e {
        db_status(db)
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn auth_status(e: &AuthError) -> StatusCode {
    if e.is_auth_failure() {
        StatusCode::UNAUTHORIZED
    } else if e.is_permission_error() {
        StatusCode::FORBIDDEN
    } else if e.is_not_found() {
        StatusCode::NOT_FOUND
    } else if e.is_conflict() {
        StatusCode::CONFLICT
    } else if e.is_invalid_input() {
        StatusCode::BAD_REQUEST
    } else if let AuthError::Database(db) = e {
        db_status(db)
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn db_status(e: &DbError) -> StatusCode {
    match e {
        DbError::NotFound { .. } => StatusCode::NOT_FOUND,
        DbError::Duplicate { .. } => StatusCode::CONFLICT,
        DbError::InvalidQuery(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!(error = %self, "request failed");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "success": false, "message": message }))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Db(DbError::from(e))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}
