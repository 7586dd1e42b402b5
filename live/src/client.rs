//! One live connection per (poll, live mode) pair.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use passvote_types::{LiveSnapshot, PollId};
use passvote_utils::http::join_url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::message::parse_live_message;
use crate::source::{StreamEvent, StreamSource};

/// Receives what a live connection delivers.
pub trait LiveObserver: Send + 'static {
    fn on_open(&mut self) {}

    fn on_snapshot(&mut self, snapshot: LiveSnapshot);

    /// Transport trouble. The source reconnects by itself; this is
    /// informational.
    fn on_error(&mut self, _message: &str) {}
}

/// Observer callbacks as values, for forwarding over a channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LiveEvent {
    Open,
    Snapshot(LiveSnapshot),
    Error(String),
}

impl LiveObserver for mpsc::UnboundedSender<LiveEvent> {
    fn on_open(&mut self) {
        let _ = self.send(LiveEvent::Open);
    }

    fn on_snapshot(&mut self, snapshot: LiveSnapshot) {
        let _ = self.send(LiveEvent::Snapshot(snapshot));
    }

    fn on_error(&mut self, message: &str) {
        let _ = self.send(LiveEvent::Error(message.to_string()));
    }
}

struct ActiveStream {
    poll_id: PollId,
    task: JoinHandle<()>,
}

/// Opens and closes the results stream of a poll.
///
/// Must be used inside a tokio runtime. Dropping the client closes any open
/// connection.
pub struct LiveStreamClient<S> {
    source: Arc<S>,
    base_url: String,
    active: Option<ActiveStream>,
}

impl<S: StreamSource> LiveStreamClient<S> {
    pub fn new(source: Arc<S>, base_url: impl Into<String>) -> Self {
        Self {
            source,
            base_url: base_url.into(),
            active: None,
        }
    }

    pub fn results_url(&self, poll_id: &PollId) -> String {
        join_url(&self.base_url, &format!("/polls/{poll_id}/results"))
    }

    /// Connect to `poll_id`'s results stream.
    ///
    /// A no-op returning `false` when that poll is already connected. A
    /// connection to another poll is closed first.
    pub fn start<O: LiveObserver>(&mut self, poll_id: &PollId, observer: O) -> bool {
        if self.active_poll() == Some(poll_id) {
            return false;
        }
        self.stop();

        let url = self.results_url(poll_id);
        info!(%poll_id, %url, "opening live updates");
        let stream = self.source.open(&url);
        let task = tokio::spawn(pump(stream, observer, poll_id.clone()));
        self.active = Some(ActiveStream {
            poll_id: poll_id.clone(),
            task,
        });
        true
    }

    /// Close the connection, if any. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
            info!(poll_id = %active.poll_id, "live updates closed");
        }
    }

    /// The poll whose stream is open. `None` once the stream has ended by
    /// itself, e.g. after a 204 or a rejected response.
    pub fn active_poll(&self) -> Option<&PollId> {
        self.active
            .as_ref()
            .filter(|a| !a.task.is_finished())
            .map(|a| &a.poll_id)
    }

    pub fn is_active(&self) -> bool {
        self.active_poll().is_some()
    }
}

impl<S> Drop for LiveStreamClient<S> {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

async fn pump<O: LiveObserver>(
    mut stream: BoxStream<'static, StreamEvent>,
    mut observer: O,
    poll_id: PollId,
) {
    while let Some(event) = stream.next().await {
        match event {
            StreamEvent::Open => {
                info!(%poll_id, "live updates connected");
                observer.on_open();
            }
            StreamEvent::Message(data) => match parse_live_message(&data) {
                Ok(snapshot) => observer.on_snapshot(snapshot),
                Err(e) => warn!(%poll_id, "dropping live message: {e}"),
            },
            StreamEvent::Error(message) => {
                debug!(%poll_id, "live stream error: {message}");
                observer.on_error(&message);
            }
        }
    }
    debug!(%poll_id, "live stream ended");
}
