//! Success envelope and request extractors.

use axum::extract::{FromRequest, FromRequestParts};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use shopline_db::{Page, Pagination};

use crate::error::AppError;

/// `{"success": true, "data": ..., "pagination"?: ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Handler result.
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, AppError>;

/// Handler result for creations (201).
pub type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), AppError>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data,
        pagination: None,
    }))
}

pub fn created<T: Serialize>(data: T) -> Created<T> {
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            success: true,
            data,
            pagination: None,
        }),
    ))
}

/// A page of items with its pagination block.
pub fn paged<T: Serialize>(page: Page<T>) -> ApiResult<Vec<T>> {
    Ok(Json(ApiResponse {
        success: true,
        data: page.items,
        pagination: Some(page.pagination),
    }))
}

/// JSON body extractor whose rejections use the error envelope.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query-string extractor whose rejections use the error envelope.
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
