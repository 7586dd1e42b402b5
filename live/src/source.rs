//! Push-stream transports.
//!
//! A [`StreamSource`] turns a URL into a stream of [`StreamEvent`]s. The
//! HTTP implementation reconnects on its own with exponential backoff, the
//! way a browser `EventSource` does, so callers never retry.

use std::collections::VecDeque;
use std::time::Duration;

use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use tracing::{debug, info};

use crate::error::LiveError;
use crate::sse::SseDecoder;

/// What a push connection reports.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    /// A connection (or reconnection) was established.
    Open,
    /// The `data` of one `message` event.
    Message(String),
    /// A transport problem; the source may reconnect afterwards.
    Error(String),
}

/// Opens push connections.
///
/// Dropping the returned stream closes its connection.
pub trait StreamSource: Send + Sync + 'static {
    fn open(&self, url: &str) -> BoxStream<'static, StreamEvent>;
}

/// Delays between reconnection attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub initial: Duration,
    pub max: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(3_000),
            max: Duration::from_millis(30_000),
        }
    }
}

impl ReconnectPolicy {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
        }
    }

    /// The delay after `current`: doubled, capped at `max`.
    pub fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.max)
    }
}

/// `text/event-stream` over HTTP with automatic reconnection.
#[derive(Clone, Debug)]
pub struct HttpEventSource {
    http: reqwest::Client,
    policy: ReconnectPolicy,
}

impl HttpEventSource {
    /// The stream is long-lived, so only the connect phase has a timeout.
    pub fn new(connect_timeout: Duration, policy: ReconnectPolicy) -> Result<Self, LiveError> {
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| LiveError::Client(e.to_string()))?;
        Ok(Self { http, policy })
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }
}

impl StreamSource for HttpEventSource {
    fn open(&self, url: &str) -> BoxStream<'static, StreamEvent> {
        let connection = Connection {
            http: self.http.clone(),
            url: url.to_string(),
            policy: self.policy,
            base_delay: self.policy.initial,
            delay: self.policy.initial,
            decoder: SseDecoder::new(),
            response: None,
            queue: VecDeque::new(),
            reconnecting: false,
            finished: false,
        };
        stream::unfold(connection, |mut connection| async move {
            let event = connection.next_event().await?;
            Some((event, connection))
        })
        .boxed()
    }
}

struct Connection {
    http: reqwest::Client,
    url: String,
    policy: ReconnectPolicy,
    /// Delay after a healthy connection drops; the server may override it.
    base_delay: Duration,
    /// Delay before the next attempt; grows while attempts keep failing.
    delay: Duration,
    decoder: SseDecoder,
    response: Option<Response>,
    queue: VecDeque<StreamEvent>,
    reconnecting: bool,
    finished: bool,
}

impl Connection {
    async fn next_event(&mut self) -> Option<StreamEvent> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(event);
            }
            if self.finished {
                return None;
            }

            let Some(response) = self.response.as_mut() else {
                if self.reconnecting {
                    debug!(url = %self.url, delay_ms = self.delay.as_millis() as u64, "reconnecting");
                    tokio::time::sleep(self.delay).await;
                    self.delay = self.policy.next_delay(self.delay);
                }
                self.connect().await;
                continue;
            };

            match response.chunk().await {
                Ok(Some(chunk)) => {
                    for event in self.decoder.feed(&chunk) {
                        if event.is_message() {
                            self.queue.push_back(StreamEvent::Message(event.data));
                        }
                    }
                    if let Some(retry) = self.decoder.take_retry() {
                        self.base_delay = retry;
                        self.delay = retry;
                    }
                }
                Ok(None) => self.lost("stream closed by server".into()),
                Err(e) => self.lost(e.to_string()),
            }
        }
    }

    async fn connect(&mut self) {
        let mut request = self
            .http
            .get(&self.url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache");
        if let Some(id) = self.decoder.last_event_id() {
            request = request.header("Last-Event-ID", id);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                self.reconnecting = true;
                self.queue.push_back(StreamEvent::Error(e.to_string()));
                return;
            }
        };

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            info!(url = %self.url, "event stream ended by server (204)");
            self.finished = true;
            return;
        }
        if !status.is_success() {
            self.fail(format!("event stream returned status {status}"));
            return;
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !content_type.starts_with("text/event-stream") {
            self.fail(format!("unexpected content type '{content_type}'"));
            return;
        }

        self.decoder.reset_connection();
        self.response = Some(response);
        self.reconnecting = false;
        self.delay = self.base_delay;
        self.queue.push_back(StreamEvent::Open);
    }

    /// The connection dropped; schedule a reconnect.
    fn lost(&mut self, reason: String) {
        self.response = None;
        self.reconnecting = true;
        self.queue.push_back(StreamEvent::Error(reason));
    }

    /// The server refused the stream; do not reconnect.
    fn fail(&mut self, reason: String) {
        self.response = None;
        self.finished = true;
        self.queue.push_back(StreamEvent::Error(reason));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_up_to_max() {
        let policy = ReconnectPolicy::default();
        let mut delay = policy.initial;
        let mut seen = Vec::new();
        for _ in 0..5 {
            delay = policy.next_delay(delay);
            seen.push(delay.as_millis());
        }
        assert_eq!(seen, vec![6_000, 12_000, 24_000, 30_000, 30_000]);
    }

    #[test]
    fn max_never_below_initial() {
        let policy = ReconnectPolicy::new(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(policy.max, Duration::from_secs(5));
    }
}
