//! The HTTP helpers against a real in-process server.

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use passvote_types::ClientError;
use passvote_utils::http::{
    build_client, ensure_success, join_url, read_json, send, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_TIMEOUT,
};
use serde::Deserialize;

#[derive(Debug, Deserialize, PartialEq)]
struct Pong {
    pong: bool,
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/ok", get(|| async { Json(serde_json::json!({ "pong": true })) }))
        .route(
            "/json-error",
            get(|| async {
                (
                    StatusCode::CONFLICT,
                    Json(serde_json::json!({ "error": "username taken" })),
                )
            }),
        )
        .route(
            "/text-error",
            get(|| async {
                (
                    StatusCode::NOT_FOUND,
                    [(header::CONTENT_TYPE, "text/plain")],
                    "Poll not found",
                )
                    .into_response()
            }),
        )
        .route("/empty-error", get(|| async { StatusCode::BAD_GATEWAY }))
        .route(
            "/wrong-shape",
            get(|| async { Json(serde_json::json!({ "ping": 1 })) }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn success_body_is_decoded() {
    let base = spawn_server().await;
    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();
    let response = send(http.get(join_url(&base, "/ok"))).await.unwrap();
    let response = ensure_success(response, None).await.unwrap();
    let pong: Pong = read_json(response).await.unwrap();
    assert_eq!(pong, Pong { pong: true });
}

#[tokio::test]
async fn json_error_message_is_extracted() {
    let base = spawn_server().await;
    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();
    let response = send(http.get(join_url(&base, "/json-error"))).await.unwrap();
    let err = ensure_success(response, None).await.unwrap_err();
    assert_eq!(err, ClientError::service(409, "username taken"));
}

#[tokio::test]
async fn text_error_is_used_verbatim() {
    let base = spawn_server().await;
    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();
    let response = send(http.get(join_url(&base, "/text-error"))).await.unwrap();
    let err = ensure_success(response, Some("Failed to fetch poll")).await.unwrap_err();
    assert_eq!(err.to_string(), "Poll not found");
}

#[tokio::test]
async fn empty_error_uses_fallback_or_status() {
    let base = spawn_server().await;
    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();

    let response = send(http.get(join_url(&base, "/empty-error"))).await.unwrap();
    let err = ensure_success(response, None).await.unwrap_err();
    assert_eq!(err.to_string(), "Request failed with status 502");

    let response = send(http.get(join_url(&base, "/empty-error"))).await.unwrap();
    let err = ensure_success(response, Some("Failed to cast vote")).await.unwrap_err();
    assert_eq!(err.to_string(), "Failed to cast vote");
}

#[tokio::test]
async fn wrong_shape_is_protocol_violation() {
    let base = spawn_server().await;
    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();
    let response = send(http.get(join_url(&base, "/wrong-shape"))).await.unwrap();
    let err = read_json::<Pong>(response).await.unwrap_err();
    assert!(matches!(err, ClientError::ProtocolViolation(_)));
}

#[tokio::test]
async fn refused_connection_is_transport_error() {
    // Bind then drop to get a port nobody listens on.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let http = build_client(DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT).unwrap();
    let err = send(http.get(format!("http://{addr}/ok"))).await.unwrap_err();
    assert!(err.is_transport());
    assert_eq!(err.to_string(), passvote_types::UNREACHABLE_MESSAGE);
}
