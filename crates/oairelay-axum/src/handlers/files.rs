//! Files API handlers (metadata only; uploads and content are not proxied).

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::response::Response;
use oairelay_core::UpstreamRequest;

use crate::dto::{ListQuery, validate_id};
use crate::error::HttpError;
use crate::state::AppState;

use super::{forward, query};

/// `GET /v1/files`
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let params = query(params)?;
    params.validate()?;
    forward(&state, UpstreamRequest::get("/files").with_query_pairs(params.to_pairs())).await
}

/// `GET /v1/files/{id}`
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("file_id", &id)?;
    forward(&state, UpstreamRequest::get(format!("/files/{id}"))).await
}

/// `DELETE /v1/files/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("file_id", &id)?;
    forward(&state, UpstreamRequest::delete(format!("/files/{id}"))).await
}
