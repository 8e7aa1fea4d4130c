//! HTTP request handlers for the Axum web server.
//!
//! Each submodule covers one upstream endpoint family. Handlers validate,
//! build an [`UpstreamRequest`] and hand it to the relay service.

pub mod files;
pub mod health;
pub mod responses;
pub mod videos;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{OriginalUri, Query};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use oairelay_core::UpstreamRequest;
use serde_json::Value;

use crate::error::HttpError;
use crate::sse::channel_connection;
use crate::state::AppState;

/// Run a non-streaming call and mirror the upstream status and body.
pub(crate) async fn forward(state: &AppState, request: UpstreamRequest) -> Result<Response, HttpError> {
    let response = state.relay.call(request).await?;
    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::OK);
    if response.body.is_null() {
        return Ok(status.into_response());
    }
    Ok((status, Json(response.body)).into_response())
}

/// Relay a streamed call. The relay runs in its own task so it can drain the
/// upstream even after the client disconnects.
pub(crate) async fn relay_stream(state: AppState, request: UpstreamRequest) -> Response {
    let (conn, pending) = channel_connection();
    tokio::spawn(async move {
        state.relay.stream(request, conn).await;
    });
    pending.into_response().await
}

/// Resume a stored response stream after `starting_after`.
pub(crate) async fn resume_stream(
    state: AppState,
    response_id: String,
    starting_after: Option<u64>,
) -> Response {
    let (conn, pending) = channel_connection();
    tokio::spawn(async move {
        state.relay.resume(&response_id, starting_after, conn).await;
    });
    pending.into_response().await
}

/// Unwrap a JSON body, reporting malformed JSON in the error envelope.
pub(crate) fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, HttpError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| HttpError::bad_request(rejection.body_text()))
}

/// Unwrap a query string, reporting bad parameters in the error envelope.
pub(crate) fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, HttpError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| HttpError::bad_request(rejection.body_text()))
}

/// Fallback for unknown routes.
pub async fn not_found(OriginalUri(uri): OriginalUri) -> HttpError {
    HttpError::NotFound(uri.path().to_owned())
}
