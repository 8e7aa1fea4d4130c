//! Videos API handlers (JSON requests only).

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use oairelay_core::UpstreamRequest;
use serde_json::Value;

use crate::dto::{ListQuery, validate_id, validate_object_body};
use crate::error::HttpError;
use crate::state::AppState;

use super::{forward, json_body, query};

/// `POST /v1/videos`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, HttpError> {
    let body = validate_object_body(json_body(body)?)?;
    if !body.get("prompt").is_some_and(Value::is_string) {
        return Err(HttpError::invalid_param("prompt", "Missing required parameter: 'prompt'"));
    }
    forward(&state, UpstreamRequest::post("/videos", body)).await
}

/// `GET /v1/videos`
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let params = query(params)?;
    params.validate()?;
    forward(&state, UpstreamRequest::get("/videos").with_query_pairs(params.to_pairs())).await
}

/// `GET /v1/videos/{id}`
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("video_id", &id)?;
    forward(&state, UpstreamRequest::get(format!("/videos/{id}"))).await
}

/// `DELETE /v1/videos/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("video_id", &id)?;
    forward(&state, UpstreamRequest::delete(format!("/videos/{id}"))).await
}

/// `POST /v1/videos/{id}/remix`
pub async fn remix(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, HttpError> {
    let id = validate_id("video_id", &id)?;
    let body = validate_object_body(json_body(body)?)?;
    forward(&state, UpstreamRequest::post(format!("/videos/{id}/remix"), body)).await
}
