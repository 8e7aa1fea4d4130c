//! Integration tests for the proxy routes.
//!
//! The router runs against a scripted upstream so retry, validation and
//! streaming behavior can be checked end to end.

mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use common::{ScriptedUpstream, router};
use oairelay_core::{HttpMethod, StreamEvent, UpstreamError, UpstreamResponse};

async fn send(app: axum::Router, request: Request<Body>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, headers, body.to_vec())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn parse(body: &[u8]) -> Value {
    serde_json::from_slice(body).unwrap()
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let (app, _) = router(ScriptedUpstream::default());
    let (status, _, body) = send(app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["status"], "ok");
}

#[tokio::test]
async fn create_response_forwards_body() {
    let upstream = ScriptedUpstream::replying(vec![Ok(UpstreamResponse::ok(json!({
        "id": "resp_1",
        "object": "response",
        "status": "completed"
    })))]);
    let (app, upstream) = router(upstream);

    let (status, _, body) = send(
        app,
        json_request("POST", "/v1/responses", &json!({"model": "gpt-4o", "input": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["id"], "resp_1");
    let requests = upstream.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "/responses");
    assert_eq!(requests[0].body.as_ref().unwrap()["input"], "hi");
}

#[tokio::test]
async fn create_response_validates_model() {
    let (app, upstream) = router(ScriptedUpstream::default());
    let (status, _, body) = send(app, json_request("POST", "/v1/responses", &json!({"input": "hi"}))).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let body = parse(&body);
    assert_eq!(body["error"]["type"], "invalid_request_error");
    assert_eq!(body["error"]["param"], "model");
    assert_eq!(body["error"]["status"], 400);
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn malformed_json_is_rejected_with_envelope() {
    let (app, _) = router(ScriptedUpstream::default());
    let request = Request::builder()
        .method("POST")
        .uri("/v1/responses")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn transient_failures_are_retried_then_succeed() {
    let upstream = ScriptedUpstream::replying(vec![
        Err(UpstreamError::api(502, "bad gateway")),
        Err(UpstreamError::network(Some("ECONNRESET"), "socket hang up")),
        Ok(UpstreamResponse::ok(json!({"id": "file_1", "object": "file"}))),
    ]);
    let (app, upstream) = router(upstream);

    let (status, _, body) = send(app, get("/v1/files/file_1")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["id"], "file_1");
    assert_eq!(upstream.requests().len(), 3);
}

#[tokio::test]
async fn exhausted_rate_limit_surfaces_retry_after() {
    let failure = UpstreamError::Api {
        status: 429,
        message: "Rate limit reached".into(),
        error_type: Some("requests".into()),
        code: Some("rate_limit_exceeded".into()),
        retry_after: Some(std::time::Duration::from_secs(7)),
    };
    let upstream = ScriptedUpstream::replying(vec![Err(failure); 4]);
    let (app, upstream) = router(upstream);

    let (status, headers, body) = send(
        app,
        json_request("POST", "/v1/responses", &json!({"model": "gpt-4o", "input": "hi"})),
    )
    .await;

    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(headers[header::RETRY_AFTER], "7");
    let body = parse(&body);
    assert_eq!(body["error"]["type"], "rate_limit_error");
    assert_eq!(body["error"]["message"], "Rate limit reached");
    assert_eq!(body["error"]["code"], "rate_limit_exceeded");
    assert_eq!(body["error"]["retry_after"], 7);
    assert_eq!(upstream.requests().len(), 4);
}

#[tokio::test]
async fn exhausted_server_error_is_bad_gateway() {
    let upstream = ScriptedUpstream::replying(vec![Err(UpstreamError::api(500, "boom")); 4]);
    let (app, upstream) = router(upstream);

    let (status, _, body) = send(app, get("/v1/videos/video_1")).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(parse(&body)["error"]["type"], "upstream_error");
    assert_eq!(upstream.requests().len(), 4);
}

#[tokio::test]
async fn permanent_failure_is_not_retried() {
    let failure = UpstreamError::Api {
        status: 404,
        message: "No response found with id 'resp_missing'.".into(),
        error_type: Some("invalid_request_error".into()),
        code: None,
        retry_after: None,
    };
    let (app, upstream) = router(ScriptedUpstream::replying(vec![Err(failure)]));

    let (status, _, body) = send(app, get("/v1/responses/resp_missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        parse(&body)["error"]["message"],
        "No response found with id 'resp_missing'."
    );
    assert_eq!(upstream.requests().len(), 1);
}

#[tokio::test]
async fn streaming_response_is_relayed_as_sse() {
    let upstream = ScriptedUpstream::streaming(Ok(vec![
        Ok(StreamEvent::new("text_delta", json!({"delta": "Hi"}), 1)),
        Ok(StreamEvent::new("done", json!({"ok": true}), 2)),
    ]));
    let (app, upstream) = router(upstream);

    let (status, headers, body) = send(
        app,
        json_request(
            "POST",
            "/v1/responses",
            &json!({"model": "gpt-4o", "input": "hi", "stream": true}),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
    assert_eq!(headers["x-accel-buffering"], "no");
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "event: text_delta\ndata: {\"delta\":\"Hi\"}\n\nevent: done\ndata: {\"ok\":true}\n\n"
    );
    // Streams are opened once, never through the retry path.
    assert_eq!(upstream.requests().len(), 1);
}

#[tokio::test]
async fn mid_stream_failure_ends_with_error_event() {
    let upstream = ScriptedUpstream::streaming(Ok(vec![
        Ok(StreamEvent::new("response.created", json!({"id": "resp_1"}), 0)),
        Err(UpstreamError::network(Some("ECONNRESET"), "socket hang up")),
    ]));
    let (app, _) = router(upstream);

    let (status, _, body) = send(
        app,
        json_request("POST", "/v1/responses", &json!({"model": "gpt-4o", "stream": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "event: response.created\ndata: {\"id\":\"resp_1\"}\n\n\
         event: error\ndata: {\"message\":\"socket hang up\"}\n\n"
    );
}

#[tokio::test]
async fn stream_open_failure_is_a_single_error_event() {
    let upstream = ScriptedUpstream::streaming(Err(UpstreamError::api(503, "overloaded")));
    let (app, upstream) = router(upstream);

    let (status, headers, body) = send(
        app,
        json_request("POST", "/v1/responses", &json!({"model": "gpt-4o", "stream": true})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "event: error\ndata: {\"message\":\"overloaded\"}\n\n"
    );
    assert_eq!(upstream.requests().len(), 1);
}

#[tokio::test]
async fn resume_replays_after_sequence() {
    let upstream = ScriptedUpstream::streaming(Ok(vec![Ok(StreamEvent::new(
        "response.output_text.delta",
        json!({"delta": "!"}),
        5,
    ))]));
    let (app, upstream) = router(upstream);

    let (status, _, body) = send(app, get("/v1/responses/resp_1?stream=true&starting_after=4")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        String::from_utf8(body).unwrap(),
        "event: response.output_text.delta\ndata: {\"delta\":\"!\"}\n\n"
    );
    let requests = upstream.requests();
    assert_eq!(requests[0].path, "/responses/resp_1");
    assert_eq!(requests[0].query_value("stream"), Some("true"));
    assert_eq!(requests[0].query_value("starting_after"), Some("4"));
}

#[tokio::test]
async fn starting_after_without_stream_is_rejected() {
    let (app, upstream) = router(ScriptedUpstream::default());
    let (status, _, body) = send(app, get("/v1/responses/resp_1?starting_after=4")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"]["param"], "starting_after");
    assert!(upstream.requests().is_empty());
}

#[tokio::test]
async fn list_query_is_validated_and_forwarded() {
    let (app, upstream) = router(ScriptedUpstream::replying(vec![Ok(UpstreamResponse::ok(
        json!({"object": "list", "data": []}),
    ))]));

    let (status, _, _) = send(app.clone(), get("/v1/files?limit=500")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(upstream.requests().is_empty());

    let (status, _, _) = send(app, get("/v1/files?limit=10&order=asc&purpose=batch")).await;
    assert_eq!(status, StatusCode::OK);
    let requests = upstream.requests();
    assert_eq!(requests[0].query_value("limit"), Some("10"));
    assert_eq!(requests[0].query_value("order"), Some("asc"));
    assert_eq!(requests[0].query_value("purpose"), Some("batch"));
}

#[tokio::test]
async fn input_items_forward_pagination() {
    let (app, upstream) = router(ScriptedUpstream::replying(vec![Ok(UpstreamResponse::ok(
        json!({"object": "list", "data": []}),
    ))]));

    let (status, _, _) = send(app, get("/v1/responses/resp_1/input_items?after=item_3&order=desc")).await;

    assert_eq!(status, StatusCode::OK);
    let requests = upstream.requests();
    assert_eq!(requests[0].path, "/responses/resp_1/input_items");
    assert_eq!(requests[0].query_value("after"), Some("item_3"));
}

#[tokio::test]
async fn response_lifecycle_routes() {
    let (app, upstream) = router(ScriptedUpstream::replying(vec![
        Ok(UpstreamResponse::ok(json!({"id": "resp_1", "status": "cancelled"}))),
        Ok(UpstreamResponse::ok(json!({"id": "resp_1", "deleted": true}))),
    ]));

    let (status, _, _) = send(app.clone(), json_request("POST", "/v1/responses/resp_1/cancel", &json!({}))).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/responses/resp_1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse(&body)["deleted"], true);

    let requests = upstream.requests();
    assert_eq!(requests[0].method, HttpMethod::Post);
    assert_eq!(requests[0].path, "/responses/resp_1/cancel");
    assert_eq!(requests[1].method, HttpMethod::Delete);
}

#[tokio::test]
async fn video_routes() {
    let (app, upstream) = router(ScriptedUpstream::replying(vec![
        Ok(UpstreamResponse::ok(json!({"id": "video_1", "status": "queued"}))),
        Ok(UpstreamResponse::ok(json!({"id": "video_2", "status": "queued"}))),
        Ok(UpstreamResponse {
            status: 204,
            body: Value::Null,
        }),
    ]));

    let (status, _, _) = send(
        app.clone(),
        json_request("POST", "/v1/videos", &json!({"model": "sora-2", "prompt": "a cat"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _, _) = send(
        app.clone(),
        json_request("POST", "/v1/videos/video_1/remix", &json!({"prompt": "a dog"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder()
        .method("DELETE")
        .uri("/v1/videos/video_1")
        .body(Body::empty())
        .unwrap();
    let (status, _, body) = send(app.clone(), request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _, body) = send(app, json_request("POST", "/v1/videos", &json!({"model": "sora-2"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(parse(&body)["error"]["param"], "prompt");

    let paths: Vec<_> = upstream.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/videos", "/videos/video_1/remix", "/videos/video_1"]);
}

#[tokio::test]
async fn unknown_route_returns_envelope() {
    let (app, _) = router(ScriptedUpstream::default());
    let (status, _, body) = send(app, get("/v1/audio/speech")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(parse(&body)["error"]["message"], "Unknown route: /v1/audio/speech");
}
