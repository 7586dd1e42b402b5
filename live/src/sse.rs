//! Incremental `text/event-stream` decoder.
//!
//! Bytes are fed in arbitrary chunks; complete events come out. Handles
//! `CR`, `LF` and `CRLF` line endings, a leading byte-order mark, comments,
//! and the `data`, `event`, `id` and `retry` fields.

use std::time::Duration;

/// Event type used when the stream does not name one.
pub const DEFAULT_EVENT_TYPE: &str = "message";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SseEvent {
    pub event: String,
    pub data: String,
    /// The last event id in effect when this event was dispatched.
    pub id: Option<String>,
}

impl SseEvent {
    pub fn is_message(&self) -> bool {
        self.event == DEFAULT_EVENT_TYPE
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    after_cr: bool,
    seen_first_line: bool,
    data: String,
    event_type: Option<String>,
    last_event_id: String,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one chunk, returning every event it completes.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        let mut events = Vec::new();
        for &byte in chunk {
            if self.after_cr {
                self.after_cr = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\r' => {
                    self.after_cr = true;
                    self.end_line(&mut events);
                }
                b'\n' => self.end_line(&mut events),
                _ => self.line.push(byte),
            }
        }
        events
    }

    /// Drop any half-received event before a new connection starts. The
    /// last event id and server retry survive.
    pub fn reset_connection(&mut self) {
        self.line.clear();
        self.after_cr = false;
        self.seen_first_line = false;
        self.data.clear();
        self.event_type = None;
    }

    /// Value for the `Last-Event-ID` request header, if any.
    pub fn last_event_id(&self) -> Option<&str> {
        if self.last_event_id.is_empty() {
            None
        } else {
            Some(&self.last_event_id)
        }
    }

    /// Reconnection delay requested by the server since the last call.
    pub fn take_retry(&mut self) -> Option<Duration> {
        self.retry.take()
    }

    fn end_line(&mut self, events: &mut Vec<SseEvent>) {
        let raw = std::mem::take(&mut self.line);
        let mut line = String::from_utf8_lossy(&raw).into_owned();
        if !self.seen_first_line {
            self.seen_first_line = true;
            if let Some(rest) = line.strip_prefix('\u{feff}') {
                line = rest.to_string();
            }
        }

        if line.is_empty() {
            self.dispatch(events);
            return;
        }
        if line.starts_with(':') {
            return;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line.as_str(), ""),
        };

        match field {
            "data" => {
                self.data.push_str(value);
                self.data.push('\n');
            }
            "event" => self.event_type = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_event_id = value.to_string(),
            "retry" if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            _ => {}
        }
    }

    fn dispatch(&mut self, events: &mut Vec<SseEvent>) {
        let event_type = self.event_type.take();
        if self.data.is_empty() {
            return;
        }
        let mut data = std::mem::take(&mut self.data);
        if data.ends_with('\n') {
            data.pop();
        }
        events.push(SseEvent {
            event: event_type
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_EVENT_TYPE.to_string()),
            data,
            id: self.last_event_id().map(str::to_string),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_event() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: {\"total_votes\":1}\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "{\"total_votes\":1}");
        assert!(events[0].is_message());
        assert_eq!(events[0].id, None);
    }

    #[test]
    fn events_split_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"da").is_empty());
        assert!(decoder.feed(b"ta: hel").is_empty());
        assert!(decoder.feed(b"lo\r").is_empty());
        let events = decoder.feed(b"\n\r\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "hello");
    }

    #[test]
    fn line_endings_mix() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"data: a\rdata: b\r\ndata: c\n\r");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "a\nb\nc");
    }

    #[test]
    fn comments_and_unknown_fields_are_ignored() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b": keep-alive\nfoo: bar\ndata:x\n\n");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, "x");
    }

    #[test]
    fn named_events_and_ids() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed(b"event: ping\nid: 7\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(events[0].event, "ping");
        assert!(!events[0].is_message());
        assert_eq!(events[0].id.as_deref(), Some("7"));
        assert!(events[1].is_message());
        assert_eq!(events[1].id.as_deref(), Some("7"));
        assert_eq!(decoder.last_event_id(), Some("7"));
    }

    #[test]
    fn retry_field() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"retry: 2500\n\nretry: soon\n\n");
        assert_eq!(decoder.take_retry(), Some(Duration::from_millis(2500)));
        assert_eq!(decoder.take_retry(), None);
    }

    #[test]
    fn leading_bom_is_stripped() {
        let mut decoder = SseDecoder::new();
        let events = decoder.feed("\u{feff}data: ok\n\n".as_bytes());
        assert_eq!(events[0].data, "ok");
    }

    #[test]
    fn empty_data_block_dispatches_nothing() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.feed(b"event: x\n\n").is_empty());
        // the event type does not leak into the next event
        let events = decoder.feed(b"data: y\n\n");
        assert!(events[0].is_message());
    }

    #[test]
    fn reset_connection_discards_partial_event() {
        let mut decoder = SseDecoder::new();
        decoder.feed(b"id: 3\n\ndata: half");
        decoder.reset_connection();
        let events = decoder.feed(b"data: whole\n\n");
        assert_eq!(events[0].data, "whole");
        assert_eq!(decoder.last_event_id(), Some("3"));
    }
}
