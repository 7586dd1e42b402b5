//! Nullable push-stream source.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream::{self, BoxStream, StreamExt};
use passvote_live::{StreamEvent, StreamSource};
use passvote_types::LiveSnapshot;
use tokio::sync::mpsc;

/// Decrements the open-connection count when its stream is dropped.
struct OpenGuard(Arc<AtomicUsize>);

impl Drop for OpenGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// A stream source whose events are pushed by the test.
///
/// Events go to the most recently opened connection.
#[derive(Default)]
pub struct NullStreamSource {
    senders: Mutex<Vec<mpsc::UnboundedSender<StreamEvent>>>,
    urls: Mutex<Vec<String>>,
    open: Arc<AtomicUsize>,
}

impl NullStreamSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to the latest connection. `false` if it is closed.
    pub fn push(&self, event: StreamEvent) -> bool {
        match self.senders.lock().unwrap().last() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn emit_open(&self) -> bool {
        self.push(StreamEvent::Open)
    }

    pub fn emit_snapshot(&self, snapshot: &LiveSnapshot) -> bool {
        let data = serde_json::to_string(snapshot).unwrap();
        self.push(StreamEvent::Message(data))
    }

    pub fn emit_raw(&self, data: impl Into<String>) -> bool {
        self.push(StreamEvent::Message(data.into()))
    }

    pub fn emit_error(&self, message: impl Into<String>) -> bool {
        self.push(StreamEvent::Error(message.into()))
    }

    /// End the latest connection from the server side.
    pub fn close_latest(&self) {
        self.senders.lock().unwrap().pop();
    }

    /// Connections opened and not yet dropped.
    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// URLs of every connection ever opened, oldest first.
    pub fn opened_urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }
}

impl StreamSource for NullStreamSource {
    fn open(&self, url: &str) -> BoxStream<'static, StreamEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().push(tx);
        self.urls.lock().unwrap().push(url.to_string());
        self.open.fetch_add(1, Ordering::SeqCst);
        let guard = OpenGuard(Arc::clone(&self.open));

        stream::unfold((rx, guard), |(mut rx, guard)| async move {
            let event = rx.recv().await?;
            Some((event, (rx, guard)))
        })
        .boxed()
    }
}
