//! Request helpers shared by the identity and poll service clients.
//!
//! Every outgoing call goes through [`send`] so that connection-level
//! failures map to [`ClientError::Transport`] and non-2xx responses map to
//! [`ClientError::Service`] with the message extracted from the body.

use std::time::Duration;

use passvote_types::{response_message, ClientError};
use reqwest::header::CONTENT_TYPE;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Default timeout for a whole request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default connection timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Build a `reqwest::Client` with the given timeouts.
pub fn build_client(
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<reqwest::Client, ClientError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .build()
        .map_err(|e| ClientError::transport(format!("failed to create HTTP client: {e}")))
}

/// Join a base URL and a path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Classify a `reqwest` failure.
///
/// Undecodable bodies are protocol violations; everything else (refused
/// connection, DNS, timeout, reset) is a transport failure.
pub fn classify(e: reqwest::Error) -> ClientError {
    if e.is_decode() {
        ClientError::ProtocolViolation(format!("invalid response body: {e}"))
    } else {
        ClientError::transport(e.to_string())
    }
}

/// Send a request, mapping connection failures to [`ClientError::Transport`].
pub async fn send(request: RequestBuilder) -> Result<Response, ClientError> {
    request.send().await.map_err(|e| {
        warn!("request failed before a response arrived: {e}");
        classify(e)
    })
}

/// Turn a non-2xx response into a [`ClientError::Service`].
///
/// `fallback` replaces the generic `Request failed with status <code>`
/// message when the body carries nothing usable.
pub async fn error_from_response(response: Response, fallback: Option<&str>) -> ClientError {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.unwrap_or_default();

    let message = response_message(content_type.as_deref(), &body)
        .or_else(|| fallback.map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {status}"));
    ClientError::service(status, message)
}

/// Pass 2xx responses through; convert anything else with [`error_from_response`].
pub async fn ensure_success(
    response: Response,
    fallback: Option<&str>,
) -> Result<Response, ClientError> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response, fallback).await)
    }
}

/// Decode a JSON body, reporting shape mismatches as protocol violations.
pub async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ClientError> {
    response.json::<T>().await.map_err(|e| {
        if e.is_decode() {
            ClientError::ProtocolViolation(format!("unexpected response shape: {e}"))
        } else {
            classify(e)
        }
    })
}
