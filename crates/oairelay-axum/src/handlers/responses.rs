//! Responses API handlers.

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::response::Response;
use oairelay_core::UpstreamRequest;
use serde_json::Value;
use tracing::debug;

use crate::dto::{CreateResponseRequest, ListQuery, RetrieveQuery, validate_id};
use crate::error::HttpError;
use crate::state::AppState;

use super::{forward, json_body, query, relay_stream, resume_stream};

/// `POST /v1/responses`
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, HttpError> {
    let request = CreateResponseRequest::try_from(json_body(body)?)?;
    let upstream = UpstreamRequest::post("/responses", request.body);
    if request.stream {
        debug!("Relaying streamed response");
        return Ok(relay_stream(state, upstream).await);
    }
    forward(&state, upstream).await
}

/// `GET /v1/responses/{id}`, or a resumed stream with `?stream=true`.
pub async fn retrieve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<RetrieveQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let id = validate_id("response_id", &id)?.to_owned();
    let params = query(params)?;
    params.validate()?;

    if params.stream {
        debug!(response_id = %id, starting_after = ?params.starting_after, "Resuming stream");
        return Ok(resume_stream(state, id, params.starting_after).await);
    }
    forward(&state, UpstreamRequest::get(format!("/responses/{id}"))).await
}

/// `DELETE /v1/responses/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("response_id", &id)?;
    forward(&state, UpstreamRequest::delete(format!("/responses/{id}"))).await
}

/// `POST /v1/responses/{id}/cancel`
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, HttpError> {
    let id = validate_id("response_id", &id)?;
    forward(
        &state,
        UpstreamRequest::post(format!("/responses/{id}/cancel"), Value::Object(Default::default())),
    )
    .await
}

/// `GET /v1/responses/{id}/input_items`
pub async fn input_items(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Response, HttpError> {
    let id = validate_id("response_id", &id)?;
    let params = query(params)?;
    params.validate()?;
    forward(
        &state,
        UpstreamRequest::get(format!("/responses/{id}/input_items")).with_query_pairs(params.to_pairs()),
    )
    .await
}
